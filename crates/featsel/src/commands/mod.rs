//! CLI subcommands.

pub mod evaluate;
pub mod run;

use anyhow::{Context, Result};
use job_engine::ModelParams;

/// Parses the `--model-params` JSON into the typed override set.
///
/// Unknown keys are rejected here, before anything is submitted.
pub(crate) fn parse_model_params(raw: Option<&str>) -> Result<ModelParams> {
    match raw {
        Some(text) => serde_json::from_str(text).context(
            "model_params must be a JSON object with recognized keys \
             (n_estimators, max_depth, n_jobs)",
        ),
        None => Ok(ModelParams::default()),
    }
}
