//! Build a solver input document.

use anyhow::Context;
use hsp_model::ModelTree;
use hsp_prep::{CaseConfig, Mapping, MappingProcessor, ModelWriter, SolverInput};
use hsp_store::{RetryPolicy, RetryingStore, SqliteStore};
use log::info;
use std::fs;
use std::time::Duration;

pub struct BuildArgs {
    pub case: String,
    pub model: String,
    pub mappings: String,
    pub overrides: Option<String>,
    pub datapoints: String,
    pub metadata: Option<String>,
    pub output: String,
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
}

/// File contents for one build.
pub struct BuildInputs<'a> {
    pub case: &'a str,
    pub model: &'a str,
    pub mappings: &'a str,
    pub overrides: Option<&'a str>,
    pub datapoints: &'a str,
    pub metadata: Option<&'a str>,
}

fn read(path: &str) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
}

/// Run the whole pipeline on in-memory inputs and return the solver input
/// JSON.
pub fn build_solver_input(inputs: &BuildInputs<'_>, policy: RetryPolicy) -> anyhow::Result<String> {
    let case = CaseConfig::from_json_str(inputs.case).context("Failed to load case")?;
    let template = ModelTree::from_json_str(inputs.model).context("Failed to load model template")?;
    let mappings = Mapping::parse_list(inputs.mappings).context("Failed to load mappings")?;
    let overrides = inputs
        .overrides
        .map(Mapping::parse_list)
        .transpose()
        .context("Failed to load override mappings")?;

    let sqlite = SqliteStore::new()?;
    let loaded = sqlite.load_datapoints(inputs.datapoints)?;
    if let Some(metadata) = inputs.metadata {
        sqlite.load_metadata(metadata)?;
    }
    info!(
        "Loaded {} datapoints for {} to {}",
        loaded, case.starttime, case.endtime
    );
    let store = RetryingStore::new(sqlite, policy);

    let schedule = case.schedule();
    let processor = MappingProcessor::new(&store, case.starttime, case.endtime, &schedule);
    let mut writer = ModelWriter::new(processor, template, mappings);
    if let Some(overrides) = overrides {
        writer = writer.with_overrides(overrides, case.override_shift_minutes);
    }
    let model = writer.write().context("Failed to apply mappings")?;
    Ok(SolverInput::new(model, &case).to_json_string()?)
}

pub fn run_build(args: &BuildArgs) -> anyhow::Result<()> {
    let case = read(&args.case)?;
    let model = read(&args.model)?;
    let mappings = read(&args.mappings)?;
    let overrides = args.overrides.as_deref().map(read).transpose()?;
    let datapoints = read(&args.datapoints)?;
    let metadata = args.metadata.as_deref().map(read).transpose()?;

    let inputs = BuildInputs {
        case: &case,
        model: &model,
        mappings: &mappings,
        overrides: overrides.as_deref(),
        datapoints: &datapoints,
        metadata: metadata.as_deref(),
    };
    let policy = RetryPolicy {
        max_attempts: args.max_attempts,
        initial_delay: Duration::from_millis(args.initial_delay_ms),
    };
    let json = build_solver_input(&inputs, policy)?;
    fs::write(&args.output, json).with_context(|| format!("Failed to write {}", args.output))?;
    info!("Build complete. Output: {}", args.output);
    Ok(())
}
