use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use crate::adapters::{fake_seed, health_from_circuit};
use crate::circuit_breaker::CircuitBreaker;
use crate::config::CatalogConfig;
use crate::data_source::{
    BarcodeRequest, CapabilitySet, Endpoint, HealthStatus, ImageSearchRequest, ProductSource,
    SearchRequest, SourceError, SynthesisRequest, WebHit, WebSearchRequest,
};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::normalize::{normalize_catalog, CatalogItem};
use crate::{CanonicalProduct, ProviderId};

/// Structured product catalog adapter (search and exact barcode lookup).
///
/// Constructed over a mock transport it serves deterministic offline data;
/// over a real transport it speaks the catalog's JSON search and product
/// endpoints.
#[derive(Clone)]
pub struct CatalogAdapter {
    config: CatalogConfig,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: Arc<CircuitBreaker>,
    use_real_api: bool,
}

impl Default for CatalogAdapter {
    fn default() -> Self {
        Self {
            config: CatalogConfig::default(),
            http_client: Arc::new(NoopHttpClient),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            use_real_api: false,
        }
    }
}

impl CatalogAdapter {
    pub fn with_transport(http_client: Arc<dyn HttpClient>, config: CatalogConfig) -> Self {
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
}

// Real API implementation methods
impl CatalogAdapter {
    async fn fetch_real_search(
        &self,
        req: &SearchRequest,
    ) -> Result<Vec<CanonicalProduct>, SourceError> {
        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::unavailable("catalog circuit breaker is open"));
        }

        let endpoint = format!(
            "{}/cgi/search.pl?search_terms={}&search_simple=1&action=process&json=1&page_size={}",
            self.config.base_url,
            urlencoding::encode(&req.query),
            self.config.page_size
        );
        let request = HttpRequest::get(&endpoint).with_timeout_ms(self.config.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|e| {
            self.circuit_breaker.record_failure();
            SourceError::unavailable(format!("catalog transport error: {}", e.message()))
        })?;

        if response.status == 429 {
            self.circuit_breaker.record_failure();
            return Err(SourceError::rate_limited("catalog returned status 429"));
        }
        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(SourceError::unavailable(format!(
                "catalog returned status {}",
                response.status
            )));
        }

        self.circuit_breaker.record_success();

        let parsed: CatalogSearchResponse = serde_json::from_str(&response.body)
            .map_err(|e| SourceError::internal(format!("failed to parse catalog response: {e}")))?;

        Ok(parsed
            .products
            .iter()
            .filter_map(normalize_catalog)
            .collect())
    }

    async fn fetch_real_barcode(
        &self,
        req: &BarcodeRequest,
    ) -> Result<Option<CanonicalProduct>, SourceError> {
        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::unavailable("catalog circuit breaker is open"));
        }

        let endpoint = format!(
            "{}/api/v2/product/{}.json",
            self.config.base_url,
            urlencoding::encode(req.barcode.as_str())
        );
        let request = HttpRequest::get(&endpoint).with_timeout_ms(self.config.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|e| {
            self.circuit_breaker.record_failure();
            SourceError::unavailable(format!("catalog transport error: {}", e.message()))
        })?;

        // An unknown barcode is a legitimate empty answer, not an outage.
        if response.status == 404 {
            self.circuit_breaker.record_success();
            return Ok(None);
        }
        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(SourceError::unavailable(format!(
                "catalog returned status {}",
                response.status
            )));
        }

        self.circuit_breaker.record_success();

        let parsed: CatalogProductResponse = serde_json::from_str(&response.body)
            .map_err(|e| SourceError::internal(format!("failed to parse catalog product: {e}")))?;

        if parsed.status == 0 {
            return Ok(None);
        }

        Ok(parsed.product.as_ref().and_then(normalize_catalog))
    }
}

// Deterministic offline data
impl CatalogAdapter {
    async fn fetch_fake_search(
        &self,
        req: &SearchRequest,
    ) -> Result<Vec<CanonicalProduct>, SourceError> {
        let seed = fake_seed(&req.query);
        let items = [
            fake_item(&req.query, seed, "Classic"),
            fake_item(&req.query, seed.rotate_left(8), "Family Pack"),
        ];

        Ok(items.iter().filter_map(normalize_catalog).collect())
    }

    async fn fetch_fake_barcode(
        &self,
        req: &BarcodeRequest,
    ) -> Result<Option<CanonicalProduct>, SourceError> {
        let seed = fake_seed(req.barcode.as_str());
        let mut item = fake_item(FAKE_NAMES[(seed % FAKE_NAMES.len() as u64) as usize], seed, "");
        item.code = req.barcode.as_str().to_owned();

        Ok(normalize_catalog(&item))
    }
}

impl ProductSource for CatalogAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Catalog
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::structured()
    }

    fn search<'a>(
        &'a self,
        req: SearchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CanonicalProduct>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.is_real_client() {
                self.fetch_real_search(&req).await
            } else {
                self.fetch_fake_search(&req).await
            }
        })
    }

    fn barcode<'a>(
        &'a self,
        req: BarcodeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CanonicalProduct>, SourceError>> + Send + 'a>>
    {
        Box::pin(async move {
            if self.is_real_client() {
                self.fetch_real_barcode(&req).await
            } else {
                self.fetch_fake_barcode(&req).await
            }
        })
    }

    fn web_search<'a>(
        &'a self,
        _req: WebSearchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<WebHit>, SourceError>> + Send + 'a>> {
        Box::pin(async move { Err(SourceError::unsupported_endpoint(Endpoint::WebSearch)) })
    }

    fn image_search<'a>(
        &'a self,
        _req: ImageSearchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, SourceError>> + Send + 'a>> {
        Box::pin(async move { Err(SourceError::unsupported_endpoint(Endpoint::ImageSearch)) })
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

#[derive(Debug, Deserialize)]
struct CatalogSearchResponse {
    #[serde(default)]
    products: Vec<CatalogItem>,
}

#[derive(Debug, Deserialize)]
struct CatalogProductResponse {
    #[serde(default)]
    status: u8,
    #[serde(default)]
    product: Option<CatalogItem>,
}

const FAKE_NAMES: [&str; 4] = [
    "Rolled Oats",
    "Sparkling Lemonade",
    "Dark Chocolate 70%",
    "Peanut Butter Crunch",
];

const FAKE_BRANDS: [&str; 4] = ["Arden Farms", "Bolt Foods", "Hearthside", "Meadow & Co"];

fn fake_item(name: &str, seed: u64, variant: &str) -> CatalogItem {
    let brand = FAKE_BRANDS[(seed % FAKE_BRANDS.len() as u64) as usize];
    let full_name = if variant.is_empty() {
        name.trim().to_owned()
    } else {
        format!("{} {}", name.trim(), variant)
    };
    let key = crate::normalize::slug(&full_name);
    let grade = char::from(b'a' + (seed % 5) as u8);

    CatalogItem {
        code: format!("20{:011}", seed % 100_000_000_000),
        product_name: full_name,
        brands: brand.to_owned(),
        categories: String::from("Snacks, Pantry"),
        image_front_url: format!("https://images.example.org/{key}/front.jpg"),
        image_front_small_url: format!("https://images.example.org/{key}/front.200.jpg"),
        nutriscore_grade: grade.to_string(),
        ecoscore_grade: grade.to_string(),
        nova_group: Some((seed % 4) as u8 + 1),
        ingredients_text: String::from("water, oats, sugar"),
        ..CatalogItem::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_search_is_deterministic() {
        let adapter = CatalogAdapter::default();
        let request = SearchRequest::new("granola bar").expect("valid request");

        let first = adapter.search(request.clone()).await.expect("must succeed");
        let second = adapter.search(request).await.expect("must succeed");

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|p| !p.identity.name.is_empty()));
    }

    #[tokio::test]
    async fn fake_barcode_lookup_echoes_barcode() {
        let adapter = CatalogAdapter::default();
        let barcode = crate::Barcode::parse("3017620422003").expect("valid barcode");

        let product = adapter
            .barcode(BarcodeRequest::new(barcode.clone()))
            .await
            .expect("must succeed")
            .expect("fake catalog always resolves");

        assert_eq!(product.id, barcode.as_str());
        assert_eq!(product.identity.barcode, barcode.as_str());
    }

    #[tokio::test]
    async fn unsupported_endpoints_are_signalled() {
        let adapter = CatalogAdapter::default();
        let request = WebSearchRequest::new("granola", "food", 3).expect("valid request");

        let error = adapter.web_search(request).await.expect_err("must fail");
        assert_eq!(
            error.kind(),
            crate::data_source::SourceErrorKind::UnsupportedEndpoint
        );
    }
}
