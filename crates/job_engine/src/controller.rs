//! Job lifecycle controller and the evaluation pipeline it drives.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use dataset::DatasetError;
use ml_model::{EvaluationError, EvaluationResult};

use crate::model::{JobStatus, ModelParams};
use crate::repository::{JobRepository, RepositoryError};

/// Failure modes of a job execution. Each becomes a FAILED record with the
/// error's description as the message.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The dataset source is missing or unusable.
    #[error(transparent)]
    DataUnavailable(#[from] DatasetError),

    /// Training or scoring failed.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// The persistence layer failed mid-execution.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The blocking evaluation task panicked or was torn down.
    #[error("evaluation task aborted: {0}")]
    Aborted(String),
}

/// The work a job performs once a worker picks it up.
///
/// Implementations run on a blocking thread and must be pure apart from
/// reading the dataset source.
pub trait EvaluationPipeline: Send + Sync + 'static {
    /// Loads data and runs the full-versus-reduced comparison.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionError`] describing why the evaluation could not
    /// produce a result.
    fn run(&self, params: &ModelParams, top_n: usize) -> Result<EvaluationResult, ExecutionError>;
}

/// Production pipeline: dataset CSV on disk, random-forest evaluator.
pub struct CsvEvaluationPipeline {
    dataset_path: PathBuf,
}

impl CsvEvaluationPipeline {
    #[must_use]
    pub fn new(dataset_path: PathBuf) -> Self {
        Self { dataset_path }
    }
}

impl EvaluationPipeline for CsvEvaluationPipeline {
    fn run(&self, params: &ModelParams, top_n: usize) -> Result<EvaluationResult, ExecutionError> {
        let data = dataset::load_and_partition(&self.dataset_path)?;
        let config = params.merge_into_config();
        Ok(ml_model::evaluate(&data, &config, top_n)?)
    }
}

/// Drives one job at a time through PENDING → RUNNING → COMPLETE/FAILED.
///
/// Every transition is persisted before the next step, so a crash leaves a
/// record observably RUNNING at worst, never silently lost.
pub struct JobLifecycleController {
    repository: Arc<dyn JobRepository>,
    pipeline: Arc<dyn EvaluationPipeline>,
}

impl JobLifecycleController {
    #[must_use]
    pub fn new(repository: Arc<dyn JobRepository>, pipeline: Arc<dyn EvaluationPipeline>) -> Self {
        Self {
            repository,
            pipeline,
        }
    }

    /// Executes the job with the given id to a terminal state.
    ///
    /// All evaluation failures are absorbed into a FAILED record. Records
    /// that are not PENDING are left untouched, which keeps dispatch
    /// effectively at-most-once even if an id is delivered twice.
    ///
    /// # Errors
    ///
    /// Only a repository fault while loading the record or persisting a
    /// transition surfaces to the caller.
    pub async fn execute(&self, id: Uuid) -> Result<(), RepositoryError> {
        let Some(mut record) = self.repository.get(id).await? else {
            warn!(job_id = %id, "dispatched job no longer exists");
            return Ok(());
        };

        if record.status != JobStatus::Pending {
            warn!(job_id = %id, status = %record.status, "skipping job that is not PENDING");
            return Ok(());
        }

        record.mark_running();
        self.repository.update(record.clone()).await?;
        info!(job_id = %id, top_n = record.top_n_features, "job running");

        let outcome = self
            .run_pipeline(record.model_params.clone(), record.top_n_features)
            .await;

        match outcome {
            Ok(results) => {
                info!(
                    job_id = %id,
                    full_f1 = results.full_model_f1_score,
                    reduced_f1 = results.reduced_model_f1_score,
                    "job complete"
                );
                record.mark_complete(results);
            }
            Err(err) => {
                error!(job_id = %id, error = %err, "job failed");
                record.mark_failed(err.to_string());
            }
        }

        self.repository.update(record).await
    }

    async fn run_pipeline(
        &self,
        params: ModelParams,
        top_n: usize,
    ) -> Result<EvaluationResult, ExecutionError> {
        let pipeline = Arc::clone(&self.pipeline);
        tokio::task::spawn_blocking(move || pipeline.run(&params, top_n))
            .await
            .map_err(|e| ExecutionError::Aborted(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JobRecord;
    use crate::repository::InMemoryJobRepository;

    struct StubPipeline {
        fail: bool,
    }

    impl EvaluationPipeline for StubPipeline {
        fn run(
            &self,
            _params: &ModelParams,
            top_n: usize,
        ) -> Result<EvaluationResult, ExecutionError> {
            if self.fail {
                return Err(ExecutionError::Evaluation(EvaluationError::DegenerateMetric));
            }
            Ok(sample_result(top_n))
        }
    }

    fn sample_result(top_n: usize) -> EvaluationResult {
        EvaluationResult {
            full_model_f1_score: 0.9,
            reduced_model_f1_score: 0.85,
            f1_difference_percentage: 5.56,
            total_features_evaluated: 20,
            features_selected_count: top_n,
            top_features_list: (0..top_n).map(|i| format!("f{i}")).collect(),
        }
    }

    fn controller(fail: bool) -> (Arc<InMemoryJobRepository>, JobLifecycleController) {
        let repository = Arc::new(InMemoryJobRepository::new());
        let controller = JobLifecycleController::new(
            repository.clone(),
            Arc::new(StubPipeline { fail }),
        );
        (repository, controller)
    }

    #[tokio::test]
    async fn test_successful_execution_completes_with_results() {
        let (repository, controller) = controller(false);
        let record = JobRecord::new(ModelParams::default(), 5);
        repository.create(record.clone()).await.expect("create");

        controller.execute(record.id).await.expect("execute");

        let stored = repository
            .get(record.id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(stored.status, JobStatus::Complete);
        assert!(stored.error_message.is_none());
        let results = stored.results.expect("results attached");
        assert_eq!(results.features_selected_count, 5);
        assert!(stored.updated_at > stored.created_at);
    }

    #[tokio::test]
    async fn test_failed_execution_records_message() {
        let (repository, controller) = controller(true);
        let record = JobRecord::new(ModelParams::default(), 5);
        repository.create(record.clone()).await.expect("create");

        controller.execute(record.id).await.expect("execute");

        let stored = repository
            .get(record.id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(stored.results.is_none());
        let message = stored.error_message.expect("message attached");
        assert!(message.contains("zero"), "got: {message}");
    }

    #[tokio::test]
    async fn test_missing_record_is_a_noop() {
        let (_repository, controller) = controller(false);

        controller.execute(Uuid::new_v4()).await.expect("execute");
    }

    #[tokio::test]
    async fn test_terminal_record_is_not_reexecuted() {
        let (repository, controller) = controller(true);
        let record = JobRecord::new(ModelParams::default(), 5);
        repository.create(record.clone()).await.expect("create");

        controller.execute(record.id).await.expect("first run");
        let failed = repository
            .get(record.id)
            .await
            .expect("get")
            .expect("exists");

        // A second delivery of the same id must not move the record.
        controller.execute(record.id).await.expect("second run");
        let after = repository
            .get(record.id)
            .await
            .expect("get")
            .expect("exists");

        assert_eq!(after, failed);
    }

    #[tokio::test]
    async fn test_missing_dataset_fails_with_path_in_message() {
        let repository = Arc::new(InMemoryJobRepository::new());
        let pipeline = Arc::new(CsvEvaluationPipeline::new(PathBuf::from(
            "/nonexistent/flows.csv",
        )));
        let controller = JobLifecycleController::new(repository.clone(), pipeline);

        let record = JobRecord::new(ModelParams::default(), 5);
        repository.create(record.clone()).await.expect("create");

        controller.execute(record.id).await.expect("execute");

        let stored = repository
            .get(record.id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(stored.status, JobStatus::Failed);
        let message = stored.error_message.expect("message attached");
        assert!(message.contains("/nonexistent/flows.csv"), "got: {message}");
    }
}
