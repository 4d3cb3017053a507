//! Evaluate command - one-shot synchronous comparison.

use anyhow::Result;
use config::CONFIG;
use tracing::info;

/// Runs the evaluate command.
///
/// # Errors
///
/// Returns an error if the dataset cannot be loaded or training fails.
pub fn run(top_n: usize, raw_params: Option<&str>) -> Result<()> {
    let params = super::parse_model_params(raw_params)?;

    let data = dataset::load_and_partition(&CONFIG.dataset_path)?;
    info!(
        features = data.feature_names.len(),
        classes = data.classes.len(),
        train_rows = data.train.len(),
        validation_rows = data.validation.len(),
        "dataset loaded"
    );

    let config = params.merge_into_config();
    let results = ml_model::evaluate(&data, &config, top_n)?;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
