//! Command implementations for the HSP CLI.
//!
//! Provides subcommands for building a solver input document from a case,
//! a model template, mapping files and exported time series, and for
//! inspecting the resolution ranges of a case.

use clap::Subcommand;

pub mod build;
pub mod ranges;

#[derive(Subcommand)]
pub enum Command {
    /// Build the solver input document for a case
    Build {
        /// Case file (horizon, resolution schedule, solver commands)
        #[arg(short = 'c', long)]
        case: String,

        /// Model template JSON
        #[arg(short = 'm', long)]
        model: String,

        /// Base mapping declarations (JSON list)
        #[arg(long)]
        mappings: String,

        /// Override mapping declarations, applied after the base mappings
        #[arg(long)]
        overrides: Option<String>,

        /// Datapoints CSV: external_id,timestamp,value (no headers)
        #[arg(short = 'd', long)]
        datapoints: String,

        /// Series metadata CSV with EXTERNAL_ID,IS_STEP headers
        #[arg(long)]
        metadata: Option<String>,

        /// Output path for the solver input JSON
        #[arg(short = 'o', long)]
        output: String,

        /// Attempts per store call before giving up on transient failures
        #[arg(long, default_value_t = 3)]
        max_attempts: u32,

        /// Delay before the first retry, doubled after each attempt
        #[arg(long, default_value_t = 1000)]
        initial_delay_ms: u64,
    },

    /// Print the constant-resolution ranges of a case's schedule
    Ranges {
        /// Case file
        #[arg(short = 'c', long)]
        case: String,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Build {
            case,
            model,
            mappings,
            overrides,
            datapoints,
            metadata,
            output,
            max_attempts,
            initial_delay_ms,
        } => build::run_build(&build::BuildArgs {
            case,
            model,
            mappings,
            overrides,
            datapoints,
            metadata,
            output,
            max_attempts,
            initial_delay_ms,
        }),
        Command::Ranges { case } => ranges::run_ranges(&case),
    }
}
