//! Run command - submits a job and waits for its terminal state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use config::CONFIG;
use job_engine::{
    spawn_job_workers, CsvEvaluationPipeline, InMemoryJobRepository, JobLifecycleController,
    JobService, JobStatus,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

const QUEUE_CAPACITY: usize = 64;
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Runs the run command.
///
/// # Errors
///
/// Returns an error if the submission is rejected or the job fails.
pub async fn run(top_n: usize, raw_params: Option<&str>) -> Result<()> {
    let params = super::parse_model_params(raw_params)?;

    let repository = Arc::new(InMemoryJobRepository::new());
    let pipeline = Arc::new(CsvEvaluationPipeline::new(CONFIG.dataset_path.clone()));
    let controller = Arc::new(JobLifecycleController::new(repository.clone(), pipeline));

    let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
    let shutdown = CancellationToken::new();
    spawn_job_workers(CONFIG.worker_count, controller, receiver, shutdown.clone());

    let service = JobService::new(repository, sender);
    let record = service.submit(params, top_n).await?;
    info!(job_id = %record.id, status = %record.status, "job accepted");

    let finished = loop {
        let snapshot = service.query(record.id).await?;
        if snapshot.status.is_terminal() {
            break snapshot;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    };
    shutdown.cancel();

    match finished.status {
        JobStatus::Complete => {
            let results = finished.results.context("complete job carries results")?;
            info!(
                job_id = %finished.id,
                full_f1 = results.full_model_f1_score,
                reduced_f1 = results.reduced_model_f1_score,
                difference_pct = results.f1_difference_percentage,
                "job complete"
            );
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        _ => {
            let message = finished
                .error_message
                .unwrap_or_else(|| "no error message recorded".to_string());
            anyhow::bail!("job {} failed: {message}", finished.id);
        }
    }
}
