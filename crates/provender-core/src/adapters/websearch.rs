use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use crate::adapters::{fake_seed, health_from_circuit};
use crate::circuit_breaker::CircuitBreaker;
use crate::config::WebSearchConfig;
use crate::data_source::{
    BarcodeRequest, CapabilitySet, Endpoint, HealthStatus, ImageSearchRequest, ProductSource,
    SearchRequest, SourceError, SynthesisRequest, WebHit, WebSearchRequest,
};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::normalize::slug;
use crate::{CanonicalProduct, ProviderId};

/// Web meta-search adapter serving ranked hits and image candidates.
///
/// The engine is treated as fully opaque: ranking is whatever the upstream
/// returns, truncated to the requested limit.
#[derive(Clone)]
pub struct WebSearchAdapter {
    config: WebSearchConfig,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: Arc<CircuitBreaker>,
    use_real_api: bool,
}

impl Default for WebSearchAdapter {
    fn default() -> Self {
        Self {
            config: WebSearchConfig::default(),
            http_client: Arc::new(NoopHttpClient),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            use_real_api: false,
        }
    }
}

impl WebSearchAdapter {
    pub fn with_transport(http_client: Arc<dyn HttpClient>, config: WebSearchConfig) -> Self {
        let is_real = !http_client.is_mock();
        Self {
            config,
            http_client,
            use_real_api: is_real,
            ..Self::default()
        }
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    fn is_real_client(&self) -> bool {
        self.use_real_api
    }

    async fn fetch_results(
        &self,
        query: &str,
        categories: &str,
    ) -> Result<Vec<RawWebResult>, SourceError> {
        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::unavailable(
                "websearch circuit breaker is open",
            ));
        }

        let endpoint = format!(
            "{}/search?q={}&categories={}&format=json",
            self.config.base_url,
            urlencoding::encode(query),
            urlencoding::encode(categories)
        );
        let request = HttpRequest::get(&endpoint).with_timeout_ms(self.config.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|e| {
            self.circuit_breaker.record_failure();
            SourceError::unavailable(format!("websearch transport error: {}", e.message()))
        })?;

        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(SourceError::unavailable(format!(
                "websearch returned status {}",
                response.status
            )));
        }

        self.circuit_breaker.record_success();

        let parsed: WebSearchResponse = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::internal(format!("failed to parse websearch response: {e}"))
        })?;

        Ok(parsed.results)
    }
}

impl ProductSource for WebSearchAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Websearch
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(false, false, true, true, false)
    }

    fn search<'a>(
        &'a self,
        _req: SearchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CanonicalProduct>, SourceError>> + Send + 'a>> {
        Box::pin(async move { Err(SourceError::unsupported_endpoint(Endpoint::Search)) })
    }

    fn barcode<'a>(
        &'a self,
        _req: BarcodeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CanonicalProduct>, SourceError>> + Send + 'a>>
    {
        Box::pin(async move { Err(SourceError::unsupported_endpoint(Endpoint::Barcode)) })
    }

    fn web_search<'a>(
        &'a self,
        req: WebSearchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<WebHit>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.is_real_client() {
                let results = self.fetch_results(&req.query, &req.category).await?;
                Ok(results
                    .into_iter()
                    .filter(|result| !result.title.trim().is_empty())
                    .map(RawWebResult::into_hit)
                    .take(req.limit)
                    .collect())
            } else {
                Ok(fake_hits(&req.query, req.limit))
            }
        })
    }

    fn image_search<'a>(
        &'a self,
        req: ImageSearchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.is_real_client() {
                let results = self.fetch_results(&req.query, "images").await?;
                Ok(results
                    .into_iter()
                    .map(|result| {
                        if result.img_src.is_empty() {
                            result.thumbnail
                        } else {
                            result.img_src
                        }
                    })
                    .filter(|url| !url.is_empty())
                    .take(req.max_results)
                    .collect())
            } else {
                Ok(fake_images(&req.query, req.max_results))
            }
        })
    }

    fn synthesize<'a>(
        &'a self,
        _req: SynthesisRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CanonicalProduct>, SourceError>> + Send + 'a>>
    {
        Box::pin(async move { Err(SourceError::unsupported_endpoint(Endpoint::Synthesis)) })
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move { health_from_circuit(self.circuit_breaker.state()) })
    }
}

/// Raw result entry from the meta-search engine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawWebResult {
    title: String,
    content: String,
    url: String,
    img_src: String,
    thumbnail: String,
}

impl RawWebResult {
    fn into_hit(self) -> WebHit {
        WebHit {
            title: self.title,
            snippet: self.content,
            url: self.url,
            image: self.img_src,
            thumbnail: self.thumbnail,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebSearchResponse {
    #[serde(default)]
    results: Vec<RawWebResult>,
}

fn fake_hits(query: &str, limit: usize) -> Vec<WebHit> {
    let key = slug(query);
    let hit = WebHit {
        title: format!("Atlas Foods - {}", query.trim()),
        snippet: format!("Product page for {} with ingredients and reviews.", query.trim()),
        url: format!("https://shop.example.org/products/{key}"),
        image: format!("https://shop.example.org/media/{key}/front.jpg"),
        thumbnail: format!("https://shop.example.org/media/{key}/front.200.jpg"),
    };
    vec![hit].into_iter().take(limit).collect()
}

fn fake_images(query: &str, max_results: usize) -> Vec<String> {
    let key = slug(query);
    let seed = fake_seed(query);
    (0..max_results.min(3))
        .map(|index| format!("https://img.example.org/{key}/photo-{}.jpg", seed % 7 + index as u64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_web_search_yields_splittable_title() {
        let adapter = WebSearchAdapter::default();
        let request = WebSearchRequest::new("oat milk", "food", 5).expect("valid request");

        let hits = adapter.web_search(request).await.expect("must succeed");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].title.contains(" - "));
        assert!(!hits[0].snippet.is_empty());
    }

    #[tokio::test]
    async fn fake_image_search_respects_max_results() {
        let adapter = WebSearchAdapter::default();
        let request = ImageSearchRequest::new("oat milk", 1).expect("valid request");

        let urls = adapter.image_search(request).await.expect("must succeed");
        assert_eq!(urls.len(), 1);
        assert!(!crate::enrich::is_suspicious_image_url(&urls[0]));
    }

    #[tokio::test]
    async fn structured_endpoints_are_unsupported() {
        let adapter = WebSearchAdapter::default();
        let request = SearchRequest::new("oat milk").expect("valid request");

        let error = adapter.search(request).await.expect_err("must fail");
        assert_eq!(
            error.kind(),
            crate::data_source::SourceErrorKind::UnsupportedEndpoint
        );
    }
}
