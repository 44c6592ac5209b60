mod barcode;
mod regenerate;
mod search;
mod sources;

use provender_core::{
    Envelope, EnvelopeError, EnvelopeMeta, PipelineBuilder, ProviderId, ResolutionPipeline,
};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::RequestId;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub source_chain: Vec<ProviderId>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            source_chain,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    tracing::debug!(command = ?cli.command, mock = cli.mock, "dispatching command");
    let pipeline = build_pipeline(cli.mock);

    let command_result = match &cli.command {
        Command::Search(args) => search::run(args, &pipeline).await?,
        Command::Barcode(args) => barcode::run(args, &pipeline).await?,
        Command::Regenerate(args) => regenerate::run(args, &pipeline).await?,
        Command::Sources => sources::run(&pipeline).await?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        latency_ms,
        source_chain,
    } = command_result;

    // Commands that consult no source still report the registered set so
    // the envelope's source chain is never empty.
    let source_chain = if source_chain.is_empty() {
        pipeline.registered_sources()
    } else {
        source_chain
    };

    let mut meta = EnvelopeMeta::new(RequestId::new_v4().to_string(), source_chain, latency_ms)?;
    for warning in warnings {
        meta.push_warning(warning);
    }

    Ok(Envelope::new(meta, data, errors))
}

fn build_pipeline(mock: bool) -> ResolutionPipeline {
    if mock {
        PipelineBuilder::new().with_mock_mode().build()
    } else {
        PipelineBuilder::new().with_env_config().build()
    }
}
