//! Product source trait and request/response types.
//!
//! This module defines the adapter contract ([`ProductSource`]) every
//! provider implementation follows, along with the request and response
//! types for each endpoint.
//!
//! # Endpoints
//!
//! | Endpoint | Request | Response | Description |
//! |----------|---------|----------|-------------|
//! | Search | [`SearchRequest`] | `Vec<CanonicalProduct>` | Free-text product search |
//! | Barcode | [`BarcodeRequest`] | `Option<CanonicalProduct>` | Exact barcode lookup |
//! | WebSearch | [`WebSearchRequest`] | `Vec<WebHit>` | Web meta-search hits |
//! | ImageSearch | [`ImageSearchRequest`] | `Vec<String>` | Candidate image URLs |
//! | Synthesis | [`SynthesisRequest`] | `Option<CanonicalProduct>` | Generative fallback |
//!
//! Adapters never raise past this boundary: timeouts, transport failures,
//! and malformed payloads all surface as [`SourceError`] values, and a
//! legitimately empty answer is `Ok` with an empty payload, never an error.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{Barcode, CanonicalProduct, ProviderId};

/// Endpoint type used for capability checks and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Search,
    Barcode,
    WebSearch,
    ImageSearch,
    Synthesis,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Barcode => "barcode",
            Self::WebSearch => "web_search",
            Self::ImageSearch => "image_search",
            Self::Synthesis => "synthesis",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported endpoint matrix for a product source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub search: bool,
    pub barcode: bool,
    pub web_search: bool,
    pub image_search: bool,
    pub synthesis: bool,
}

impl CapabilitySet {
    pub const fn new(
        search: bool,
        barcode: bool,
        web_search: bool,
        image_search: bool,
        synthesis: bool,
    ) -> Self {
        Self {
            search,
            barcode,
            web_search,
            image_search,
            synthesis,
        }
    }

    /// Structured lookup sources: free-text search plus barcode lookup.
    pub const fn structured() -> Self {
        Self::new(true, true, false, false, false)
    }

    pub const fn supports(self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Search => self.search,
            Endpoint::Barcode => self.barcode,
            Endpoint::WebSearch => self.web_search,
            Endpoint::ImageSearch => self.image_search,
            Endpoint::Synthesis => self.synthesis,
        }
    }

    pub fn supported_endpoints(self) -> Vec<&'static str> {
        let all = [
            (self.search, Endpoint::Search),
            (self.barcode, Endpoint::Barcode),
            (self.web_search, Endpoint::WebSearch),
            (self.image_search, Endpoint::ImageSearch),
            (self.synthesis, Endpoint::Synthesis),
        ];
        all.into_iter()
            .filter_map(|(supported, endpoint)| supported.then(|| endpoint.as_str()))
            .collect()
    }
}

/// Health state reported by the `sources` inventory; observability only,
/// the fallback tiers never reorder on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Runtime source health snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
}

impl HealthStatus {
    pub const fn new(state: HealthState) -> Self {
        Self { state }
    }

    pub const fn healthy() -> Self {
        Self::new(HealthState::Healthy)
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    UnsupportedEndpoint,
    Unavailable,
    RateLimited,
    InvalidRequest,
    AdapterNotRegistered,
    Internal,
}

/// Structured source error captured at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unsupported_endpoint(endpoint: Endpoint) -> Self {
        Self {
            kind: SourceErrorKind::UnsupportedEndpoint,
            message: format!("endpoint '{endpoint}' is not supported by this source"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn adapter_not_registered(provider: ProviderId) -> Self {
        Self {
            kind: SourceErrorKind::AdapterNotRegistered,
            message: format!("source adapter '{provider}' is not registered"),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::UnsupportedEndpoint => "source.unsupported_endpoint",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::AdapterNotRegistered => "source.adapter_not_registered",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for free-text product search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Result<Self, SourceError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(SourceError::invalid_request(
                "search query must not be empty",
            ));
        }
        Ok(Self { query })
    }
}

/// Request payload for exact barcode lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeRequest {
    pub barcode: Barcode,
}

impl BarcodeRequest {
    pub fn new(barcode: Barcode) -> Self {
        Self { barcode }
    }
}

/// Request payload for web meta-search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSearchRequest {
    pub query: String,
    pub category: String,
    pub limit: usize,
}

impl WebSearchRequest {
    pub fn new(
        query: impl Into<String>,
        category: impl Into<String>,
        limit: usize,
    ) -> Result<Self, SourceError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(SourceError::invalid_request(
                "web search query must not be empty",
            ));
        }
        if limit == 0 {
            return Err(SourceError::invalid_request(
                "web search limit must be greater than zero",
            ));
        }
        Ok(Self {
            query,
            category: category.into(),
            limit,
        })
    }
}

/// Request payload for image search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSearchRequest {
    pub query: String,
    pub max_results: usize,
}

impl ImageSearchRequest {
    pub fn new(query: impl Into<String>, max_results: usize) -> Result<Self, SourceError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(SourceError::invalid_request(
                "image search query must not be empty",
            ));
        }
        if max_results == 0 {
            return Err(SourceError::invalid_request(
                "image search max_results must be greater than zero",
            ));
        }
        Ok(Self { query, max_results })
    }
}

/// One ranked hit from the web meta-search engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebHit {
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub thumbnail: String,
}

/// Grounding context handed to the synthesis source; assembled from the top
/// web hit, with its image already vetted by the suspicious-URL heuristic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebContext {
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub source_url: String,
}

/// Request payload for generative synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub query: String,
    pub context: Option<WebContext>,
}

impl SynthesisRequest {
    pub fn new(
        query: impl Into<String>,
        context: Option<WebContext>,
    ) -> Result<Self, SourceError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(SourceError::invalid_request(
                "synthesis query must not be empty",
            ));
        }
        Ok(Self { query, context })
    }
}

/// Source adapter contract.
///
/// Every upstream provider implements this trait to be registered with the
/// resolution pipeline. Methods return boxed futures so adapters stay
/// object-safe behind `Arc<dyn ProductSource>`.
///
/// Implementations must be `Send + Sync`; they may be shared across tasks.
/// They must also uphold the no-raise rule: any panic escaping an adapter is
/// a contract violation the pipeline treats as a crisis.
pub trait ProductSource: Send + Sync {
    /// Unique provider identifier.
    fn id(&self) -> ProviderId;

    /// The set of supported endpoints.
    fn capabilities(&self) -> CapabilitySet;

    /// Free-text search returning normalized canonical records.
    ///
    /// An empty vector is a legitimate "no matches" answer; `Err` means the
    /// source was unreachable or returned garbage.
    fn search<'a>(
        &'a self,
        req: SearchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CanonicalProduct>, SourceError>> + Send + 'a>>;

    /// Exact barcode lookup; `Ok(None)` when the source does not know the
    /// barcode.
    fn barcode<'a>(
        &'a self,
        req: BarcodeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CanonicalProduct>, SourceError>> + Send + 'a>>;

    /// Ranked web meta-search hits for fallback grounding.
    fn web_search<'a>(
        &'a self,
        req: WebSearchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<WebHit>, SourceError>> + Send + 'a>>;

    /// Candidate product-photo URLs, best first.
    fn image_search<'a>(
        &'a self,
        req: ImageSearchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, SourceError>> + Send + 'a>>;

    /// Generative synthesis of a product record, optionally grounded in web
    /// context; `Ok(None)` when the generator declines to answer.
    fn synthesize<'a>(
        &'a self,
        req: SynthesisRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CanonicalProduct>, SourceError>> + Send + 'a>>;

    /// Current health of this source, for the inventory listing.
    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_search_query() {
        let error = SearchRequest::new("   ").expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    }

    #[test]
    fn rejects_zero_image_results() {
        let error = ImageSearchRequest::new("granola", 0).expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    }

    #[test]
    fn capability_set_lists_supported_endpoints() {
        let capabilities = CapabilitySet::structured();
        assert_eq!(capabilities.supported_endpoints(), vec!["search", "barcode"]);
        assert!(!capabilities.supports(Endpoint::Synthesis));
    }
}
