//! Pipeline configuration.
//!
//! Every upstream endpoint, timeout, and credential the pipeline touches is
//! injected here at construction time; adapters never carry literal URLs or
//! keys at call sites. Environment overrides are applied only through
//! [`PipelineConfig::from_env`], keeping the rest of the crate free of
//! `std::env` reads.

use std::env;

/// Structured product catalog endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Transport timeout budget; the catalog is the fastest tier and gets a
    /// hard cap so a slow upstream cannot stall the structured fan-out.
    pub timeout_ms: Option<u64>,
    pub page_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://world.openfoodfacts.org"),
            timeout_ms: Some(8_000),
            page_size: 10,
        }
    }
}

/// Regulatory food-data endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegulatoryConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_ms: Option<u64>,
    pub page_size: usize,
}

impl Default for RegulatoryConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api.nal.usda.gov/fdc/v1"),
            api_key: String::from("DEMO_KEY"),
            timeout_ms: Some(8_000),
            page_size: 10,
        }
    }
}

/// Web meta-search endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSearchConfig {
    pub base_url: String,
    /// Category hint forwarded to the meta-search engine.
    pub category: String,
    pub result_limit: usize,
    /// How many image candidates to request when building synthesis context.
    pub context_image_results: usize,
    pub timeout_ms: Option<u64>,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://127.0.0.1:8888"),
            category: String::from("food"),
            result_limit: 5,
            context_image_results: 3,
            timeout_ms: None,
        }
    }
}

/// Generative synthesis endpoint settings (OpenAI-compatible).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_ms: Option<u64>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api.openai.com/v1"),
            api_key: String::new(),
            model: String::from("gpt-4o-mini"),
            timeout_ms: None,
        }
    }
}

/// Complete injected configuration for a [`crate::ResolutionPipeline`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    pub catalog: CatalogConfig,
    pub regulatory: RegulatoryConfig,
    pub websearch: WebSearchConfig,
    pub synthesis: SynthesisConfig,
}

impl PipelineConfig {
    /// Default configuration with `PROVENDER_*` environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = env::var("PROVENDER_CATALOG_URL") {
            config.catalog.base_url = value;
        }
        if let Ok(value) = env::var("PROVENDER_REGULATORY_URL") {
            config.regulatory.base_url = value;
        }
        if let Ok(value) = env::var("PROVENDER_REGULATORY_API_KEY") {
            config.regulatory.api_key = value;
        }
        if let Ok(value) = env::var("PROVENDER_WEBSEARCH_URL") {
            config.websearch.base_url = value;
        }
        if let Ok(value) = env::var("PROVENDER_SYNTHESIS_URL") {
            config.synthesis.base_url = value;
        }
        if let Ok(value) = env::var("PROVENDER_SYNTHESIS_API_KEY") {
            config.synthesis.api_key = value;
        }
        if let Ok(value) = env::var("PROVENDER_SYNTHESIS_MODEL") {
            config.synthesis.model = value;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cap_structured_tiers_only() {
        let config = PipelineConfig::default();
        assert_eq!(config.catalog.timeout_ms, Some(8_000));
        assert_eq!(config.regulatory.timeout_ms, Some(8_000));
        assert_eq!(config.websearch.timeout_ms, None);
        assert_eq!(config.synthesis.timeout_ms, None);
    }
}
