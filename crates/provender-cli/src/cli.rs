//! CLI argument definitions for Provender.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `search` | Resolve a free-text query into product records |
//! | `barcode` | Resolve a barcode into a single product |
//! | `regenerate` | Skip structured sources and synthesize from web context |
//! | `sources` | List data source capabilities and health |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings and errors as failures |
//! | `--mock` | `false` | Serve deterministic offline data |

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Provider-neutral product identity CLI.
///
/// Resolves free-text queries and barcodes into canonical product records
/// by orchestrating a structured catalog, a regulatory database, web
/// meta-search, and a generative synthesis fallback.
#[derive(Debug, Parser)]
#[command(
    name = "provender",
    author,
    version,
    about = "Provider-neutral product identity CLI"
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Serve deterministic offline data instead of calling upstreams.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a free-text query into a list of product records.
    Search(SearchArgs),
    /// Resolve a barcode into a single product record.
    Barcode(BarcodeArgs),
    /// Skip structured sources and synthesize a product from web context.
    Regenerate(RegenerateArgs),
    /// List registered data sources with capabilities and health.
    Sources,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Free-text product query, e.g. "granola bar".
    pub query: String,
}

#[derive(Debug, Args)]
pub struct BarcodeArgs {
    /// Product barcode (8-14 digits).
    pub barcode: String,
}

#[derive(Debug, Args)]
pub struct RegenerateArgs {
    /// Free-text product query to synthesize from.
    pub query: String,
}
