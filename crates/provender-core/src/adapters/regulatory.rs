use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use crate::adapters::{fake_seed, health_from_circuit};
use crate::circuit_breaker::CircuitBreaker;
use crate::config::RegulatoryConfig;
use crate::data_source::{
    BarcodeRequest, CapabilitySet, Endpoint, HealthStatus, ImageSearchRequest, ProductSource,
    SearchRequest, SourceError, SynthesisRequest, WebHit, WebSearchRequest,
};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::normalize::{normalize_regulatory, RegulatoryItem, RegulatoryNutrient};
use crate::{CanonicalProduct, ProviderId};

/// Regulatory food-database adapter.
///
/// The upstream has no dedicated barcode endpoint; barcode lookup reuses the
/// search endpoint with the barcode as the query and filters on the returned
/// GTIN/UPC field.
#[derive(Clone)]
pub struct RegulatoryAdapter {
    config: RegulatoryConfig,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: Arc<CircuitBreaker>,
    use_real_api: bool,
}

impl Default for RegulatoryAdapter {
    fn default() -> Self {
        Self {
            config: RegulatoryConfig::default(),
            http_client: Arc::new(NoopHttpClient),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            use_real_api: false,
        }
    }
}

impl RegulatoryAdapter {
    pub fn with_transport(http_client: Arc<dyn HttpClient>, config: RegulatoryConfig) -> Self {
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

    async fn fetch_foods(&self, query: &str) -> Result<Vec<RegulatoryItem>, SourceError> {
        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::unavailable(
                "regulatory circuit breaker is open",
            ));
        }

        let endpoint = format!(
            "{}/foods/search?query={}&pageSize={}&api_key={}",
            self.config.base_url,
            urlencoding::encode(query),
            self.config.page_size,
            urlencoding::encode(&self.config.api_key)
        );
        let request = HttpRequest::get(&endpoint).with_timeout_ms(self.config.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|e| {
            self.circuit_breaker.record_failure();
            SourceError::unavailable(format!("regulatory transport error: {}", e.message()))
        })?;

        if response.status == 429 {
            self.circuit_breaker.record_failure();
            return Err(SourceError::rate_limited("regulatory returned status 429"));
        }
        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(SourceError::unavailable(format!(
                "regulatory returned status {}",
                response.status
            )));
        }

        self.circuit_breaker.record_success();

        let parsed: RegulatorySearchResponse = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::internal(format!("failed to parse regulatory response: {e}"))
        })?;

        Ok(parsed.foods)
    }
}

// Deterministic offline data
impl RegulatoryAdapter {
    fn fake_item(query: &str, gtin: &str) -> RegulatoryItem {
        let seed = fake_seed(query);
        RegulatoryItem {
            fdc_id: Some((seed % 900_000) as i64 + 100_000),
            description: format!("{} (registered)", query.trim()),
            brand_owner: String::from("Federal Provisions LLC"),
            gtin_upc: gtin.to_owned(),
            food_category: String::from("Packaged Foods"),
            ingredients: String::from("OATS, SUGAR, SALT"),
            food_nutrients: vec![RegulatoryNutrient {
                nutrient_name: String::from("Protein"),
                value: Some((seed % 30) as f64),
                unit_name: String::from("G"),
            }],
        }
    }
}

impl ProductSource for RegulatoryAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Regulatory
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
                let foods = self.fetch_foods(&req.query).await?;
                Ok(foods.iter().filter_map(normalize_regulatory).collect())
            } else {
                let item = Self::fake_item(&req.query, "");
                Ok(normalize_regulatory(&item).into_iter().collect())
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
                let foods = self.fetch_foods(req.barcode.as_str()).await?;
                Ok(foods
                    .iter()
                    .find(|item| item.gtin_upc.trim() == req.barcode.as_str())
                    .and_then(normalize_regulatory))
            } else {
                let item = Self::fake_item("Registered Pantry Item", req.barcode.as_str());
                Ok(normalize_regulatory(&item))
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
struct RegulatorySearchResponse {
    #[serde(default)]
    foods: Vec<RegulatoryItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_search_returns_one_registered_item() {
        let adapter = RegulatoryAdapter::default();
        let request = SearchRequest::new("granola bar").expect("valid request");

        let products = adapter.search(request).await.expect("must succeed");
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].identity.name, "granola bar (registered)");
        assert!(!products[0].grades.nutri_score.is_known());
    }

    #[tokio::test]
    async fn fake_barcode_lookup_carries_gtin() {
        let adapter = RegulatoryAdapter::default();
        let barcode = crate::Barcode::parse("00012345678905").expect("valid barcode");

        let product = adapter
            .barcode(BarcodeRequest::new(barcode.clone()))
            .await
            .expect("must succeed")
            .expect("fake regulatory always resolves");

        assert_eq!(product.identity.barcode, barcode.as_str());
    }
}
