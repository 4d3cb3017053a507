//! Feature-selection impact evaluator.
//!
//! Submits asynchronous jobs that measure how much weighted-F1 performance a
//! classifier loses when restricted to its top-N most important features.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// Feature-selection impact evaluator
#[derive(Parser)]
#[command(name = "featsel")]
#[command(about = "Evaluates the cost of restricting a classifier to its top-N features")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an evaluation job and wait for its terminal state
    Run {
        /// Number of top-ranked features to keep in the reduced model
        #[arg(short, long, default_value = "10")]
        top_n: usize,

        /// Hyperparameter overrides as JSON, e.g. '{"n_estimators": 100}'
        /// Recognized keys: n_estimators, max_depth, n_jobs
        #[arg(short, long)]
        model_params: Option<String>,
    },

    /// Run the comparison synchronously, bypassing the job engine
    Evaluate {
        /// Number of top-ranked features to keep in the reduced model
        #[arg(short, long, default_value = "10")]
        top_n: usize,

        /// Hyperparameter overrides as JSON, e.g. '{"n_estimators": 100}'
        #[arg(short, long)]
        model_params: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            top_n,
            model_params,
        } => {
            commands::run::run(top_n, model_params.as_deref()).await?;
        }
        Commands::Evaluate {
            top_n,
            model_params,
        } => {
            commands::evaluate::run(top_n, model_params.as_deref())?;
        }
    }

    Ok(())
}
