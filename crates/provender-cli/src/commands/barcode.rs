use provender_core::{Barcode, BarcodeTier, CanonicalProduct, ResolutionPipeline};
use serde::Serialize;

use crate::cli::BarcodeArgs;
use crate::commands::CommandResult;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct BarcodeResponseData {
    barcode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    terminal_tier: Option<BarcodeTier>,
    product: Option<CanonicalProduct>,
}

pub async fn run(
    args: &BarcodeArgs,
    pipeline: &ResolutionPipeline,
) -> Result<CommandResult, CliError> {
    let barcode = Barcode::parse(&args.barcode)?;

    let resolution = pipeline.product_by_barcode(&barcode).await;

    let data = serde_json::to_value(BarcodeResponseData {
        barcode: barcode.as_str().to_owned(),
        terminal_tier: resolution.terminal_tier,
        product: resolution.data,
    })?;

    Ok(CommandResult::ok(data, resolution.source_chain)
        .with_warnings(resolution.warnings)
        .with_errors(resolution.errors)
        .with_latency(resolution.latency_ms))
}
