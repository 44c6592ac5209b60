//! The fallback orchestrator: fan-out, tier escalation, and the three
//! public resolution operations.
//!
//! Control flow is an explicit tier state machine. Escalation is strictly
//! sequential: a tier runs only after the previous tier's combined,
//! deduplicated output is known to be empty. Within a tier, sibling adapter
//! calls are joined with all-complete, isolate-failures semantics; one
//! branch failing or timing out never cancels the other.
//!
//! No operation ever surfaces an error to its caller: every failure mode
//! degrades to fewer results or an empty result, with per-source
//! diagnostics accumulated in the returned [`Resolution`].
//!
//! There is no caller-side cancellation token: once an operation starts,
//! its scheduled adapter calls run to completion even if the answer is no
//! longer wanted. Accepted limitation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::adapters::{CatalogAdapter, RegulatoryAdapter, SynthesisAdapter, WebSearchAdapter};
use crate::config::PipelineConfig;
use crate::data_source::{
    BarcodeRequest, CapabilitySet, Endpoint, HealthStatus, ImageSearchRequest, ProductSource,
    SearchRequest, SourceError, SynthesisRequest, WebContext, WebSearchRequest,
};
use crate::dedup::dedup;
use crate::enrich::{backfill_images, is_suspicious_image_url, needs_image_backfill};
use crate::envelope::EnvelopeError;
use crate::http_client::{HttpClient, NoopHttpClient, ReqwestHttpClient};
use crate::normalize::product_from_web_hit;
use crate::{Barcode, CanonicalProduct, ProviderId};

/// Ordered tiers of the free-text search operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTier {
    StructuredFanout,
    WebAugmentedSynthesis,
    CrisisFallback,
}

impl SearchTier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StructuredFanout => "structured_fanout",
            Self::WebAugmentedSynthesis => "web_augmented_synthesis",
            Self::CrisisFallback => "crisis_fallback",
        }
    }
}

/// Ordered tiers of the barcode lookup operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeTier {
    Catalog,
    Regulatory,
    WebSearch,
}

impl BarcodeTier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Regulatory => "regulatory",
            Self::WebSearch => "web_search",
        }
    }
}

/// Outcome of one resolution operation.
///
/// `terminal_tier` names the tier that produced the payload, or `None` when
/// every tier was exhausted empty. `errors` records unreachable sources
/// (distinguishable in diagnostics from legitimately empty ones, which
/// appear only in the source chain).
#[derive(Debug, Clone)]
pub struct Resolution<T, S> {
    pub data: T,
    pub terminal_tier: Option<S>,
    pub source_chain: Vec<ProviderId>,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
}

/// Capability/health snapshot of one registered source.
#[derive(Debug, Clone, Copy)]
pub struct SourceSnapshot {
    pub id: ProviderId,
    pub capabilities: CapabilitySet,
    pub health: HealthStatus,
}

#[derive(Debug, Default)]
struct Diagnostics {
    chain: Vec<ProviderId>,
    warnings: Vec<String>,
    errors: Vec<EnvelopeError>,
}

impl Diagnostics {
    fn visit(&mut self, provider: ProviderId) {
        if !self.chain.contains(&provider) {
            self.chain.push(provider);
        }
    }

    fn warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    fn error(&mut self, provider: ProviderId, error: SourceError) {
        self.errors.push(to_envelope_error(provider, error));
    }

    fn finish<T, S>(self, data: T, terminal_tier: Option<S>, started: Instant) -> Resolution<T, S> {
        Resolution {
            data,
            terminal_tier,
            source_chain: self.chain,
            warnings: self.warnings,
            errors: self.errors,
            latency_ms: elapsed_ms(started),
        }
    }
}

/// Adapter registry plus the tier state machines.
pub struct ResolutionPipeline {
    adapters: HashMap<ProviderId, Arc<dyn ProductSource>>,
    config: PipelineConfig,
}

impl Default for ResolutionPipeline {
    fn default() -> Self {
        PipelineBuilder::new().with_mock_mode().build()
    }
}

impl ResolutionPipeline {
    pub fn new(adapters: Vec<Arc<dyn ProductSource>>, config: PipelineConfig) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.id(), adapter))
            .collect();
        Self { adapters, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registered_sources(&self) -> Vec<ProviderId> {
        let mut providers = self.adapters.keys().copied().collect::<Vec<_>>();
        providers.sort_by_key(|provider| provider.as_str());
        providers
    }

    pub async fn snapshot(&self, provider: ProviderId) -> Option<SourceSnapshot> {
        let adapter = self.adapters.get(&provider)?;
        Some(SourceSnapshot {
            id: provider,
            capabilities: adapter.capabilities(),
            health: adapter.health().await,
        })
    }

    fn adapter(&self, provider: ProviderId) -> Option<&Arc<dyn ProductSource>> {
        self.adapters.get(&provider)
    }

    /// Resolve a free-text query into a deduplicated, enriched product list.
    ///
    /// Tier order: structured fan-out (catalog + regulatory concurrently),
    /// then web-augmented synthesis, then, only if an adapter breaks its
    /// no-raise contract, one unconditional crisis synthesis call. The
    /// returned list may be empty; it is never an error.
    pub async fn search_products(
        &self,
        query: &str,
    ) -> Resolution<Vec<CanonicalProduct>, SearchTier> {
        let started = Instant::now();
        let mut diag = Diagnostics::default();

        let request = match SearchRequest::new(query) {
            Ok(request) => request,
            Err(error) => {
                diag.warning(error.message());
                return diag.finish(Vec::new(), None, started);
            }
        };

        match self.search_tiers(&request, &mut diag).await {
            Ok((products, tier)) => diag.finish(products, tier, started),
            Err(error) => {
                warn!(error = %error, "search tiers aborted; invoking crisis synthesis");
                diag.error(ProviderId::Synthesis, error);
                let products = self.crisis_synthesize(&request, &mut diag).await;
                let tier = (!products.is_empty()).then_some(SearchTier::CrisisFallback);
                diag.finish(products, tier, started)
            }
        }
    }

    /// Resolve a barcode into at most one product.
    ///
    /// Strictly sequential tiers; each runs only when the previous produced
    /// nothing. The shared image enricher does not run on this path; the web
    /// tier selects imagery inline.
    pub async fn product_by_barcode(
        &self,
        barcode: &Barcode,
    ) -> Resolution<Option<CanonicalProduct>, BarcodeTier> {
        let started = Instant::now();
        let mut diag = Diagnostics::default();

        let structured = [
            (BarcodeTier::Catalog, ProviderId::Catalog),
            (BarcodeTier::Regulatory, ProviderId::Regulatory),
        ];
        for (tier, provider) in structured {
            debug!(tier = tier.as_str(), "entering barcode tier");
            let Some(adapter) = self.adapter(provider) else {
                diag.error(provider, SourceError::adapter_not_registered(provider));
                continue;
            };
            if !adapter.capabilities().supports(Endpoint::Barcode) {
                diag.error(provider, SourceError::unsupported_endpoint(Endpoint::Barcode));
                continue;
            }

            diag.visit(provider);
            match adapter.barcode(BarcodeRequest::new(barcode.clone())).await {
                Ok(Some(product)) => return diag.finish(Some(product), Some(tier), started),
                Ok(None) => debug!(provider = provider.as_str(), "barcode not known"),
                Err(error) => {
                    warn!(provider = provider.as_str(), error = %error, "barcode tier failed");
                    diag.error(provider, error);
                }
            }
        }

        debug!(tier = BarcodeTier::WebSearch.as_str(), "entering barcode tier");
        if let Some(web) = self.adapter(ProviderId::Websearch) {
            diag.visit(ProviderId::Websearch);
            let request = WebSearchRequest::new(
                barcode.as_str(),
                &self.config.websearch.category,
                self.config.websearch.result_limit,
            );
            match request {
                Ok(request) => match web.web_search(request).await {
                    Ok(hits) => {
                        let product = hits
                            .first()
                            .and_then(|hit| product_from_web_hit(barcode, hit));
                        if let Some(product) = product {
                            return diag.finish(
                                Some(product),
                                Some(BarcodeTier::WebSearch),
                                started,
                            );
                        }
                    }
                    Err(error) => {
                        warn!(error = %error, "barcode web tier failed");
                        diag.error(ProviderId::Websearch, error);
                    }
                },
                Err(error) => diag.error(ProviderId::Websearch, error),
            }
        } else {
            diag.error(
                ProviderId::Websearch,
                SourceError::adapter_not_registered(ProviderId::Websearch),
            );
        }

        diag.finish(None, None, started)
    }

    /// Skip the structured tiers entirely and synthesize one product from
    /// web context; for callers that already know structured data is absent.
    pub async fn regenerate_product(
        &self,
        query: &str,
    ) -> Resolution<Option<CanonicalProduct>, SearchTier> {
        let started = Instant::now();
        let mut diag = Diagnostics::default();

        let request = match SearchRequest::new(query) {
            Ok(request) => request,
            Err(error) => {
                diag.warning(error.message());
                return diag.finish(None, None, started);
            }
        };

        let context = self.web_context(&request.query, &mut diag).await;
        let product = match self.synthesize(&request.query, context, &mut diag).await {
            Ok(product) => product,
            Err(error) => {
                warn!(error = %error, "regeneration synthesis failed");
                diag.error(ProviderId::Synthesis, error);
                None
            }
        };

        let tier = product
            .is_some()
            .then_some(SearchTier::WebAugmentedSynthesis);
        diag.finish(product, tier, started)
    }

    async fn search_tiers(
        &self,
        request: &SearchRequest,
        diag: &mut Diagnostics,
    ) -> Result<(Vec<CanonicalProduct>, Option<SearchTier>), SourceError> {
        debug!(tier = SearchTier::StructuredFanout.as_str(), "entering search tier");

        let (catalog_result, regulatory_result) = tokio::join!(
            self.structured_search(ProviderId::Catalog, request),
            self.structured_search(ProviderId::Regulatory, request),
        );

        let mut candidates = Vec::new();
        let outcomes = [
            (ProviderId::Catalog, catalog_result),
            (ProviderId::Regulatory, regulatory_result),
        ];
        for (provider, outcome) in outcomes {
            diag.visit(provider);
            match outcome {
                Ok(products) => {
                    if products.is_empty() {
                        debug!(provider = provider.as_str(), "source returned no matches");
                    }
                    candidates.extend(products);
                }
                Err(error) => {
                    warn!(provider = provider.as_str(), error = %error, "structured source failed");
                    diag.error(provider, error);
                }
            }
        }

        let merged = dedup(candidates);
        if !merged.is_empty() {
            let enriched = self.enrich_media(merged, diag).await;
            return Ok((enriched, Some(SearchTier::StructuredFanout)));
        }

        debug!(
            tier = SearchTier::WebAugmentedSynthesis.as_str(),
            "entering search tier"
        );
        let context = self.web_context(&request.query, diag).await;

        // A failing synthesis source is the one error allowed to escape the
        // tier walk; search_products catches it in the crisis fallback.
        match self.synthesize(&request.query, context, diag).await? {
            Some(product) => Ok((vec![product], Some(SearchTier::WebAugmentedSynthesis))),
            None => Ok((Vec::new(), None)),
        }
    }

    async fn structured_search(
        &self,
        provider: ProviderId,
        request: &SearchRequest,
    ) -> Result<Vec<CanonicalProduct>, SourceError> {
        let Some(adapter) = self.adapter(provider) else {
            return Err(SourceError::adapter_not_registered(provider));
        };
        if !adapter.capabilities().supports(Endpoint::Search) {
            return Err(SourceError::unsupported_endpoint(Endpoint::Search));
        }
        adapter.search(request.clone()).await
    }

    async fn synthesize(
        &self,
        query: &str,
        context: Option<WebContext>,
        diag: &mut Diagnostics,
    ) -> Result<Option<CanonicalProduct>, SourceError> {
        let Some(adapter) = self.adapter(ProviderId::Synthesis) else {
            return Err(SourceError::adapter_not_registered(ProviderId::Synthesis));
        };
        diag.visit(ProviderId::Synthesis);
        let request = SynthesisRequest::new(query, context)?;
        adapter.synthesize(request).await
    }

    /// Gather grounding context for synthesis: web search and image search
    /// run concurrently against the raw query, the top hit becomes the
    /// context, and the context image is the first candidate that survives
    /// the suspicious-URL check (image-search results first, then the hit's
    /// own image). No hit, no context.
    async fn web_context(&self, query: &str, diag: &mut Diagnostics) -> Option<WebContext> {
        let Some(web) = self.adapter(ProviderId::Websearch) else {
            diag.error(
                ProviderId::Websearch,
                SourceError::adapter_not_registered(ProviderId::Websearch),
            );
            return None;
        };
        diag.visit(ProviderId::Websearch);

        let web_request = WebSearchRequest::new(
            query,
            &self.config.websearch.category,
            self.config.websearch.result_limit,
        );
        let image_request =
            ImageSearchRequest::new(query, self.config.websearch.context_image_results);
        let (web_request, image_request) = match (web_request, image_request) {
            (Ok(web_request), Ok(image_request)) => (web_request, image_request),
            (Err(error), _) | (_, Err(error)) => {
                diag.error(ProviderId::Websearch, error);
                return None;
            }
        };

        let (hits, images) = tokio::join!(
            web.web_search(web_request),
            web.image_search(image_request),
        );

        let hits = match hits {
            Ok(hits) => hits,
            Err(error) => {
                warn!(error = %error, "web search for context failed");
                diag.error(ProviderId::Websearch, error);
                Vec::new()
            }
        };
        let images = match images {
            Ok(images) => images,
            Err(error) => {
                warn!(error = %error, "image search for context failed");
                diag.error(ProviderId::Websearch, error);
                Vec::new()
            }
        };

        let top = hits.into_iter().next()?;
        let image = images
            .into_iter()
            .chain(std::iter::once(top.image.clone()))
            .find(|url| !url.is_empty() && !is_suspicious_image_url(url))
            .unwrap_or_default();

        Some(WebContext {
            title: top.title,
            snippet: top.snippet,
            image,
            source_url: top.url,
        })
    }

    async fn enrich_media(
        &self,
        products: Vec<CanonicalProduct>,
        diag: &mut Diagnostics,
    ) -> Vec<CanonicalProduct> {
        let Some(web) = self.adapter(ProviderId::Websearch) else {
            return products;
        };
        if !web.capabilities().supports(Endpoint::ImageSearch) {
            return products;
        }
        if products.iter().any(needs_image_backfill) {
            diag.visit(ProviderId::Websearch);
        }
        backfill_images(web.as_ref(), products).await
    }

    /// Last-resort unconditional synthesis with no context. Reached only
    /// when an unexpected error escapes the normal tiers; never a normal
    /// path.
    async fn crisis_synthesize(
        &self,
        request: &SearchRequest,
        diag: &mut Diagnostics,
    ) -> Vec<CanonicalProduct> {
        let Some(adapter) = self.adapter(ProviderId::Synthesis) else {
            diag.error(
                ProviderId::Synthesis,
                SourceError::adapter_not_registered(ProviderId::Synthesis),
            );
            return Vec::new();
        };
        diag.visit(ProviderId::Synthesis);

        let Ok(synth_request) = SynthesisRequest::new(request.query.clone(), None) else {
            return Vec::new();
        };

        match adapter.synthesize(synth_request).await {
            Ok(Some(product)) => vec![product],
            Ok(None) => Vec::new(),
            Err(error) => {
                warn!(error = %error, "crisis synthesis failed");
                diag.error(ProviderId::Synthesis, error);
                Vec::new()
            }
        }
    }
}

/// Builder for a [`ResolutionPipeline`] over real or mock transports.
///
/// # Environment variables (applied by [`PipelineBuilder::with_env_config`])
///
/// | Variable | Overrides |
/// |----------|-----------|
/// | `PROVENDER_CATALOG_URL` | catalog base URL |
/// | `PROVENDER_REGULATORY_URL` | regulatory base URL |
/// | `PROVENDER_REGULATORY_API_KEY` | regulatory API key |
/// | `PROVENDER_WEBSEARCH_URL` | meta-search base URL |
/// | `PROVENDER_SYNTHESIS_URL` | synthesis base URL |
/// | `PROVENDER_SYNTHESIS_API_KEY` | synthesis API key |
/// | `PROVENDER_SYNTHESIS_MODEL` | synthesis model name |
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    use_mock: bool,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All adapters serve deterministic offline data.
    pub fn with_mock_mode(mut self) -> Self {
        self.use_mock = true;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from defaults plus `PROVENDER_*` overrides.
    pub fn with_env_config(mut self) -> Self {
        self.config = Some(PipelineConfig::from_env());
        self
    }

    pub fn build(self) -> ResolutionPipeline {
        let config = self.config.unwrap_or_default();
        let transport: Arc<dyn HttpClient> = if self.use_mock {
            Arc::new(NoopHttpClient)
        } else {
            Arc::new(ReqwestHttpClient::new())
        };

        let adapters: Vec<Arc<dyn ProductSource>> = vec![
            Arc::new(CatalogAdapter::with_transport(
                transport.clone(),
                config.catalog.clone(),
            )),
            Arc::new(RegulatoryAdapter::with_transport(
                transport.clone(),
                config.regulatory.clone(),
            )),
            Arc::new(WebSearchAdapter::with_transport(
                transport.clone(),
                config.websearch.clone(),
            )),
            Arc::new(SynthesisAdapter::with_transport(
                transport,
                config.synthesis.clone(),
            )),
        ];

        ResolutionPipeline::new(adapters, config)
    }
}

fn to_envelope_error(provider: ProviderId, error: SourceError) -> EnvelopeError {
    EnvelopeError::new(error.code(), error.message())
        .expect("code/message are non-empty")
        .with_source(provider)
        .with_retryable(error.retryable())
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_search_resolves_in_structured_tier() {
        let pipeline = ResolutionPipeline::default();

        let resolution = pipeline.search_products("granola bar").await;

        assert_eq!(resolution.terminal_tier, Some(SearchTier::StructuredFanout));
        assert!(!resolution.data.is_empty());
        assert!(resolution.source_chain.contains(&ProviderId::Catalog));
        assert!(resolution.source_chain.contains(&ProviderId::Regulatory));
        assert!(resolution.errors.is_empty());
    }

    #[tokio::test]
    async fn mock_barcode_resolves_in_catalog_tier() {
        let pipeline = ResolutionPipeline::default();
        let barcode = Barcode::parse("3017620422003").expect("valid barcode");

        let resolution = pipeline.product_by_barcode(&barcode).await;

        assert_eq!(resolution.terminal_tier, Some(BarcodeTier::Catalog));
        let product = resolution.data.expect("mock catalog always resolves");
        assert_eq!(product.identity.barcode, barcode.as_str());
        assert_eq!(resolution.source_chain, vec![ProviderId::Catalog]);
    }

    #[tokio::test]
    async fn mock_regeneration_synthesizes_with_web_context() {
        let pipeline = ResolutionPipeline::default();

        let resolution = pipeline.regenerate_product("oat milk").await;

        assert_eq!(
            resolution.terminal_tier,
            Some(SearchTier::WebAugmentedSynthesis)
        );
        let product = resolution.data.expect("mock synthesis always yields");
        assert!(product.id.starts_with("synth:"));
        assert_eq!(
            resolution.source_chain,
            vec![ProviderId::Websearch, ProviderId::Synthesis]
        );
    }

    #[tokio::test]
    async fn blank_query_degrades_to_empty_resolution() {
        let pipeline = ResolutionPipeline::default();

        let resolution = pipeline.search_products("   ").await;

        assert!(resolution.data.is_empty());
        assert_eq!(resolution.terminal_tier, None);
        assert!(!resolution.warnings.is_empty());
        assert!(resolution.source_chain.is_empty());
    }

    #[tokio::test]
    async fn snapshot_reports_capabilities() {
        let pipeline = ResolutionPipeline::default();

        let snapshot = pipeline
            .snapshot(ProviderId::Websearch)
            .await
            .expect("websearch is registered");

        assert!(snapshot.capabilities.supports(Endpoint::WebSearch));
        assert!(snapshot.capabilities.supports(Endpoint::ImageSearch));
        assert!(!snapshot.capabilities.supports(Endpoint::Search));
    }
}
