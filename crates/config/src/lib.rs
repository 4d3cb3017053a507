//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::Context;

/// Default location of the labeled flow-statistics CSV, relative to the
/// working directory.
pub const DEFAULT_DATASET_FILE: &str = "TotalFeatures-ISCXFlowMeter.csv";

/// Default number of job workers.
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Returns the path to the dataset CSV.
#[must_use]
pub fn get_dataset_path() -> PathBuf {
    dotenvy::dotenv().ok();

    std::env::var("DATASET_PATH")
        .map_or_else(|_| PathBuf::from(DEFAULT_DATASET_FILE), PathBuf::from)
}

/// Global configuration instance, lazily initialized.
pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::from_env().expect("Failed to create config"));

/// Application configuration.
#[derive(Clone)]
pub struct Config {
    /// Location of the labeled dataset CSV
    pub dataset_path: PathBuf,

    /// Number of workers consuming the job queue
    pub worker_count: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `DATASET_PATH`: location of the labeled dataset CSV (default:
    ///   `TotalFeatures-ISCXFlowMeter.csv` in the working directory)
    /// - `FEATSEL_WORKERS`: number of job workers (default: 2)
    ///
    /// # Errors
    ///
    /// Returns an error if `FEATSEL_WORKERS` is set to something that is not
    /// a positive integer.
    fn from_env() -> anyhow::Result<Self> {
        // Load .env file
        dotenvy::dotenv().ok();

        let dataset_path = get_dataset_path();

        let worker_count = match std::env::var("FEATSEL_WORKERS") {
            Ok(raw) => {
                let count: usize = raw
                    .parse()
                    .context("FEATSEL_WORKERS must be a positive integer")?;
                anyhow::ensure!(count >= 1, "FEATSEL_WORKERS must be at least 1");
                count
            }
            Err(_) => DEFAULT_WORKER_COUNT,
        };

        Ok(Self {
            dataset_path,
            worker_count,
        })
    }
}
