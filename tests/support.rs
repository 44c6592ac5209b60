//! Scripted stub sources for pipeline behavior tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use provender_core::data_source::{
    BarcodeRequest, CapabilitySet, HealthStatus, ImageSearchRequest, ProductSource, SearchRequest,
    SourceError, SynthesisRequest, WebContext, WebHit, WebSearchRequest,
};
use provender_core::normalize::{normalize_synthesized, split_web_title, SynthesizedItem};
use provender_core::{
    CanonicalProduct, PipelineConfig, ProductIdentity, ProviderId, ResolutionPipeline,
};

/// How the stub answers `synthesize` calls.
pub enum SynthesisScript {
    /// Pop scripted outcomes in order; the last one repeats.
    Sequence(Mutex<Vec<Result<Option<CanonicalProduct>, SourceError>>>),
    /// Build the product from the request's web context (title split,
    /// snippet as description, context image as media), like a well-behaved
    /// generator grounded in the context it was given.
    EchoContext,
}

/// Fully scripted [`ProductSource`] with per-endpoint invocation counters.
pub struct StubSource {
    pub id: ProviderId,
    pub capabilities: CapabilitySet,
    pub search_result: Result<Vec<CanonicalProduct>, SourceError>,
    pub barcode_result: Result<Option<CanonicalProduct>, SourceError>,
    pub web_hits: Result<Vec<WebHit>, SourceError>,
    pub images: Result<Vec<String>, SourceError>,
    pub synthesis: SynthesisScript,
    pub search_calls: AtomicUsize,
    pub barcode_calls: AtomicUsize,
    pub web_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    pub synthesis_calls: AtomicUsize,
    pub seen_context: Mutex<Option<Option<WebContext>>>,
}

impl StubSource {
    pub fn structured(id: ProviderId) -> Self {
        Self::new(id, CapabilitySet::structured())
    }

    pub fn web() -> Self {
        Self::new(
            ProviderId::Websearch,
            CapabilitySet::new(false, false, true, true, false),
        )
    }

    pub fn synthesis() -> Self {
        Self::new(
            ProviderId::Synthesis,
            CapabilitySet::new(false, false, false, false, true),
        )
    }

    fn new(id: ProviderId, capabilities: CapabilitySet) -> Self {
        Self {
            id,
            capabilities,
            search_result: Ok(Vec::new()),
            barcode_result: Ok(None),
            web_hits: Ok(Vec::new()),
            images: Ok(Vec::new()),
            synthesis: SynthesisScript::EchoContext,
            search_calls: AtomicUsize::new(0),
            barcode_calls: AtomicUsize::new(0),
            web_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            synthesis_calls: AtomicUsize::new(0),
            seen_context: Mutex::new(None),
        }
    }

    pub fn with_search(mut self, result: Result<Vec<CanonicalProduct>, SourceError>) -> Self {
        self.search_result = result;
        self
    }

    pub fn with_barcode(mut self, result: Result<Option<CanonicalProduct>, SourceError>) -> Self {
        self.barcode_result = result;
        self
    }

    pub fn with_web_hits(mut self, result: Result<Vec<WebHit>, SourceError>) -> Self {
        self.web_hits = result;
        self
    }

    pub fn with_images(mut self, result: Result<Vec<String>, SourceError>) -> Self {
        self.images = result;
        self
    }

    pub fn with_synthesis_sequence(
        mut self,
        outcomes: Vec<Result<Option<CanonicalProduct>, SourceError>>,
    ) -> Self {
        self.synthesis = SynthesisScript::Sequence(Mutex::new(outcomes));
        self
    }
}

impl ProductSource for StubSource {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    fn search<'a>(
        &'a self,
        _req: SearchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CanonicalProduct>, SourceError>> + Send + 'a>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.search_result.clone();
        Box::pin(async move { result })
    }

    fn barcode<'a>(
        &'a self,
        _req: BarcodeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CanonicalProduct>, SourceError>> + Send + 'a>>
    {
        self.barcode_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.barcode_result.clone();
        Box::pin(async move { result })
    }

    fn web_search<'a>(
        &'a self,
        _req: WebSearchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<WebHit>, SourceError>> + Send + 'a>> {
        self.web_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.web_hits.clone();
        Box::pin(async move { result })
    }

    fn image_search<'a>(
        &'a self,
        _req: ImageSearchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, SourceError>> + Send + 'a>> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.images.clone();
        Box::pin(async move { result })
    }

    fn synthesize<'a>(
        &'a self,
        req: SynthesisRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CanonicalProduct>, SourceError>> + Send + 'a>>
    {
        self.synthesis_calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_context.lock().expect("context lock") = Some(req.context.clone());

        let outcome = match &self.synthesis {
            SynthesisScript::Sequence(outcomes) => {
                let mut outcomes = outcomes.lock().expect("script lock");
                if outcomes.len() > 1 {
                    outcomes.remove(0)
                } else {
                    outcomes.first().cloned().unwrap_or(Ok(None))
                }
            }
            SynthesisScript::EchoContext => {
                let (brand, name) = match &req.context {
                    Some(context) => split_web_title(&context.title),
                    None => (String::new(), req.query.clone()),
                };
                let item = SynthesizedItem {
                    name,
                    brand,
                    description: req
                        .context
                        .as_ref()
                        .map(|context| context.snippet.clone())
                        .unwrap_or_default(),
                    ..SynthesizedItem::default()
                };
                Ok(normalize_synthesized(&item, req.context.as_ref()))
            }
        };

        Box::pin(async move { outcome })
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move { HealthStatus::healthy() })
    }
}

pub fn product(id: &str, name: &str, brand: &str) -> CanonicalProduct {
    CanonicalProduct::new(
        id,
        ProductIdentity {
            name: name.to_owned(),
            brand: brand.to_owned(),
            ..ProductIdentity::default()
        },
    )
    .expect("valid test product")
}

pub fn pipeline_with(sources: Vec<Arc<dyn ProductSource>>) -> ResolutionPipeline {
    ResolutionPipeline::new(sources, PipelineConfig::default())
}
