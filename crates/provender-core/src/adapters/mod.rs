//! Provider adapters.
//!
//! One adapter per upstream source, each implementing [`crate::ProductSource`]
//! for the endpoints it supports and signalling the rest as unsupported.
//! Every adapter has a real mode (HTTP through the shared transport) and a
//! deterministic fake mode selected by constructing it over a mock transport.

mod catalog;
mod regulatory;
mod synthesis;
mod websearch;

pub use catalog::CatalogAdapter;
pub use regulatory::RegulatoryAdapter;
pub use synthesis::SynthesisAdapter;
pub use websearch::WebSearchAdapter;

use crate::circuit_breaker::CircuitState;
use crate::data_source::{HealthState, HealthStatus};

pub(crate) fn health_from_circuit(state: CircuitState) -> HealthStatus {
    HealthStatus::new(match state {
        CircuitState::Closed => HealthState::Healthy,
        CircuitState::HalfOpen => HealthState::Degraded,
        CircuitState::Open => HealthState::Unhealthy,
    })
}

/// Stable seed for deterministic fake-mode payloads.
pub(crate) fn fake_seed(input: &str) -> u64 {
    input
        .bytes()
        .fold(0u64, |acc, byte| acc.wrapping_mul(31).wrapping_add(byte as u64))
}
