use provender_core::{HealthState, ResolutionPipeline};
use serde::Serialize;

use crate::commands::CommandResult;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct SourceRow {
    id: &'static str,
    endpoints: Vec<&'static str>,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceRow>,
}

pub async fn run(pipeline: &ResolutionPipeline) -> Result<CommandResult, CliError> {
    let mut rows = Vec::new();

    for provider in pipeline.registered_sources() {
        if let Some(snapshot) = pipeline.snapshot(provider).await {
            rows.push(SourceRow {
                id: snapshot.id.as_str(),
                endpoints: snapshot.capabilities.supported_endpoints(),
                status: match snapshot.health.state {
                    HealthState::Healthy => "healthy",
                    HealthState::Degraded => "degraded",
                    HealthState::Unhealthy => "unhealthy",
                },
            });
        }
    }

    let data = serde_json::to_value(SourcesResponseData { sources: rows })?;
    Ok(CommandResult::ok(data, pipeline.registered_sources()))
}
