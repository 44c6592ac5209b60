use provender_core::{CanonicalProduct, ResolutionPipeline, SearchTier};
use serde::Serialize;

use crate::cli::RegenerateArgs;
use crate::commands::CommandResult;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct RegenerateResponseData {
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    terminal_tier: Option<SearchTier>,
    product: Option<CanonicalProduct>,
}

pub async fn run(
    args: &RegenerateArgs,
    pipeline: &ResolutionPipeline,
) -> Result<CommandResult, CliError> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err(CliError::Command(String::from("query must not be empty")));
    }

    let resolution = pipeline.regenerate_product(query).await;

    let data = serde_json::to_value(RegenerateResponseData {
        query: query.to_owned(),
        terminal_tier: resolution.terminal_tier,
        product: resolution.data,
    })?;

    Ok(CommandResult::ok(data, resolution.source_chain)
        .with_warnings(resolution.warnings)
        .with_errors(resolution.errors)
        .with_latency(resolution.latency_ms))
}
