//! # Provender Core
//!
//! Core contracts and the product-identity resolution pipeline for the
//! Provender toolkit.
//!
//! ## Overview
//!
//! Given a free-text query or a barcode, the pipeline produces canonical
//! product records by orchestrating heterogeneous, unreliable upstream
//! sources (a structured product catalog, a regulatory food database, a
//! web meta-search engine, and a generative synthesis fallback) and
//! guarantees a best-effort answer even when most sources fail or return
//! nothing.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Catalog, Regulatory, WebSearch, Synthesis) |
//! | [`circuit_breaker`] | Circuit breaker for resilient upstream calls |
//! | [`config`] | Injected endpoint/timeout/credential configuration |
//! | [`data_source`] | Product source trait and request/response types |
//! | [`dedup`] | Fingerprint-based deduplication |
//! | [`domain`] | Canonical domain models (product, barcode, grade) |
//! | [`enrich`] | Image backfill and the suspicious-URL heuristic |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`normalize`] | Per-provider raw schemas and normalizers |
//! | [`pipeline`] | Fallback orchestrator and public operations |
//! | [`retry`] | Retry backoff for the synthesis upstream |
//! | [`source`] | Provider identifiers |
//!
//! ## Quick Start
//!
//! ```rust
//! use provender_core::{PipelineBuilder, SearchTier};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Mock mode serves deterministic offline data.
//!     let pipeline = PipelineBuilder::new().with_mock_mode().build();
//!
//!     let resolution = pipeline.search_products("granola bar").await;
//!     assert_eq!(resolution.terminal_tier, Some(SearchTier::StructuredFanout));
//!
//!     for product in &resolution.data {
//!         println!("{} ({})", product.identity.name, product.grades.nutri_score);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  Entry operations    │  search / barcode / regenerate
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐     tier 1: catalog ∥ regulatory
//! │ ResolutionPipeline   │     tier 2: web context → synthesis
//! │ (tier state machine) │     crisis: unconditional synthesis
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │ ProductSource        │────▶│ HttpClient       │
//! │ (adapter trait ×4)   │     │ (reqwest/noop)   │
//! └──────────┬───────────┘     └──────────────────┘
//!            ▼
//! ┌──────────────────────┐
//! │ normalize → dedup →  │
//! │ enrich               │
//! └──────────────────────┘
//! ```
//!
//! ## Error handling
//!
//! Adapters never raise past their boundary: every timeout, transport
//! failure, and malformed payload becomes a [`SourceError`] value, and the
//! pipeline degrades to fewer or zero results instead of surfacing errors
//! to its caller. Unreachable sources stay distinguishable from empty ones
//! through the [`Resolution`](pipeline::Resolution) error records and
//! `tracing` diagnostics.

pub mod adapters;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod dedup;
pub mod domain;
pub mod enrich;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod normalize;
pub mod pipeline;
pub mod retry;
pub mod source;

// Re-export commonly used types at the crate root for convenience

// Adapter implementations
pub use adapters::{CatalogAdapter, RegulatoryAdapter, SynthesisAdapter, WebSearchAdapter};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Configuration
pub use config::{
    CatalogConfig, PipelineConfig, RegulatoryConfig, SynthesisConfig, WebSearchConfig,
};

// Source trait and types
pub use data_source::{
    BarcodeRequest, CapabilitySet, Endpoint, HealthState, HealthStatus, ImageSearchRequest,
    ProductSource, SearchRequest, SourceError, SourceErrorKind, SynthesisRequest, WebContext,
    WebHit, WebSearchRequest,
};

// Deduplication and enrichment
pub use dedup::dedup;
pub use enrich::{backfill_images, is_suspicious_image_url, needs_image_backfill};

// Domain models
pub use domain::{
    Barcode, CanonicalProduct, Grade, Ingredient, ProductGrades, ProductIdentity, ProductMedia,
    SensoryProfile, UtcDateTime,
};

// Envelope types
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};

// Error types
pub use error::ValidationError;

// HTTP transport
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

// Pipeline
pub use pipeline::{
    BarcodeTier, PipelineBuilder, Resolution, ResolutionPipeline, SearchTier, SourceSnapshot,
};

// Retry
pub use retry::{Backoff, RetryConfig};

// Source identifiers
pub use source::ProviderId;
