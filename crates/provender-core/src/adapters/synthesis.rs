use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::adapters::health_from_circuit;
use crate::circuit_breaker::CircuitBreaker;
use crate::config::SynthesisConfig;
use crate::data_source::{
    BarcodeRequest, CapabilitySet, Endpoint, HealthStatus, ImageSearchRequest, ProductSource,
    SearchRequest, SourceError, SynthesisRequest, WebHit, WebSearchRequest,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, NoopHttpClient};
use crate::normalize::{normalize_synthesized, split_web_title, SynthesizedItem};
use crate::retry::RetryConfig;
use crate::{CanonicalProduct, ProviderId};

const SYSTEM_PROMPT: &str = "You identify consumer food products. Reply with a single JSON \
object and nothing else, using exactly these keys: name, brand, category, description, image, \
flavors (array of strings), ingredients (array of strings), nutrition (object of number \
values), nutri_score, eco_score, processing_score (single letters, or \"?\" when you cannot \
tell). Leave unknown string fields empty. Never invent an image URL.";

/// Generative synthesis adapter speaking an OpenAI-compatible
/// chat-completions endpoint through the shared transport.
///
/// The only retried upstream in the crate: it is the last rung of every
/// fallback chain, so transient transport errors get `retry` attempts with
/// backoff before the failure is surfaced.
#[derive(Clone)]
pub struct SynthesisAdapter {
    config: SynthesisConfig,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: Arc<CircuitBreaker>,
    retry: RetryConfig,
    use_real_api: bool,
}

impl Default for SynthesisAdapter {
    fn default() -> Self {
        Self {
            config: SynthesisConfig::default(),
            http_client: Arc::new(NoopHttpClient),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            retry: RetryConfig::default(),
            use_real_api: false,
        }
    }
}

impl SynthesisAdapter {
    pub fn with_transport(http_client: Arc<dyn HttpClient>, config: SynthesisConfig) -> Self {
        let is_real = !http_client.is_mock();
        Self {
            config,
            http_client,
            use_real_api: is_real,
            ..Self::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    fn is_real_client(&self) -> bool {
        self.use_real_api
    }

    async fn synthesize_real(
        &self,
        req: &SynthesisRequest,
    ) -> Result<Option<CanonicalProduct>, SourceError> {
        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::unavailable(
                "synthesis circuit breaker is open",
            ));
        }

        let body = json!({
            "model": self.config.model,
            "temperature": 0.2,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt(req) },
            ],
        });

        let mut request = HttpRequest::post(format!("{}/chat/completions", self.config.base_url))
            .with_json_body(body.to_string())
            .with_timeout_ms(self.config.timeout_ms);
        if !self.config.api_key.is_empty() {
            request = request.with_auth(&HttpAuth::BearerToken(self.config.api_key.clone()));
        }

        let mut attempt = 0;
        let response = loop {
            match self.http_client.execute(request.clone()).await {
                Ok(response) => break response,
                Err(error) if error.retryable() && attempt < self.retry.max_retries => {
                    tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
                    attempt += 1;
                }
                Err(error) => {
                    self.circuit_breaker.record_failure();
                    return Err(SourceError::unavailable(format!(
                        "synthesis transport error: {}",
                        error.message()
                    )));
                }
            }
        };

        if response.status == 429 {
            self.circuit_breaker.record_failure();
            return Err(SourceError::rate_limited("synthesis returned status 429"));
        }
        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(SourceError::unavailable(format!(
                "synthesis returned status {}",
                response.status
            )));
        }

        self.circuit_breaker.record_success();

        let parsed: ChatCompletionResponse = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::internal(format!("failed to parse synthesis response: {e}"))
        })?;

        let Some(content) = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
        else {
            return Ok(None);
        };

        let item: SynthesizedItem =
            serde_json::from_str(strip_code_fences(&content)).map_err(|e| {
                SourceError::internal(format!("synthesis reply was not a product object: {e}"))
            })?;

        Ok(normalize_synthesized(&item, req.context.as_ref()))
    }

    fn synthesize_fake(&self, req: &SynthesisRequest) -> Option<CanonicalProduct> {
        let (brand, name) = match &req.context {
            Some(context) => split_web_title(&context.title),
            None => (String::new(), req.query.trim().to_owned()),
        };

        let item = SynthesizedItem {
            name,
            brand,
            category: String::from("Packaged Foods"),
            description: format!("Best-effort identification for '{}'.", req.query.trim()),
            flavors: vec![String::from("mild")],
            ingredients: vec![String::from("unspecified")],
            nutri_score: String::from("?"),
            eco_score: String::from("?"),
            processing_score: String::from("?"),
            ..SynthesizedItem::default()
        };

        normalize_synthesized(&item, req.context.as_ref())
    }
}

impl ProductSource for SynthesisAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Synthesis
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(false, false, false, false, true)
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
        req: SynthesisRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CanonicalProduct>, SourceError>> + Send + 'a>>
    {
        Box::pin(async move {
            if self.is_real_client() {
                self.synthesize_real(&req).await
            } else {
                Ok(self.synthesize_fake(&req))
            }
        })
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move { health_from_circuit(self.circuit_breaker.state()) })
    }
}

fn user_prompt(req: &SynthesisRequest) -> String {
    let mut prompt = format!("Identify this product: {}", req.query.trim());

    if let Some(context) = &req.context {
        prompt.push_str("\n\nWeb context:");
        push_context_line(&mut prompt, "title", &context.title);
        push_context_line(&mut prompt, "snippet", &context.snippet);
        push_context_line(&mut prompt, "image", &context.image);
        push_context_line(&mut prompt, "source", &context.source_url);
    }

    prompt
}

fn push_context_line(prompt: &mut String, label: &str, value: &str) {
    if !value.trim().is_empty() {
        prompt.push_str(&format!("\n{label}: {}", value.trim()));
    }
}

/// Models often wrap JSON in markdown fences despite instructions.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::WebContext;

    #[tokio::test]
    async fn fake_synthesis_uses_context_title_split() {
        let adapter = SynthesisAdapter::default();
        let context = WebContext {
            title: String::from("Acme - Widget Deluxe"),
            snippet: String::from("A deluxe widget."),
            image: String::from("https://images.example.org/widget.jpg"),
            source_url: String::from("https://shop.example.org/widget"),
        };
        let request =
            SynthesisRequest::new("widget deluxe", Some(context)).expect("valid request");

        let product = adapter
            .synthesize(request)
            .await
            .expect("must succeed")
            .expect("fake synthesis always yields");

        assert_eq!(product.identity.brand, "Acme");
        assert_eq!(product.identity.name, "Widget Deluxe");
        assert_eq!(
            product.media.front_image,
            "https://images.example.org/widget.jpg"
        );
        assert!(product.id.starts_with("synth:"));
    }

    #[tokio::test]
    async fn fake_synthesis_without_context_uses_query() {
        let adapter = SynthesisAdapter::default();
        let request = SynthesisRequest::new("mystery snack", None).expect("valid request");

        let product = adapter
            .synthesize(request)
            .await
            .expect("must succeed")
            .expect("fake synthesis always yields");

        assert_eq!(product.identity.name, "mystery snack");
        assert!(product.identity.brand.is_empty());
        assert!(product.media.front_image.is_empty());
    }

    #[test]
    fn strips_markdown_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }
}
