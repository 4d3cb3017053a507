//! Submission and query boundary.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::model::{JobRecord, ModelParams};
use crate::repository::{JobRepository, RepositoryError};

/// Errors returned synchronously at submission. When validation fails, no
/// record was created.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request was rejected at the boundary.
    #[error("invalid submission: {0}")]
    Validation(String),

    /// The persistence layer rejected the new record.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The worker queue is no longer accepting jobs.
    #[error("job queue is closed")]
    QueueClosed,
}

/// Errors returned by a status query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The id has never been issued.
    #[error("no job found with id {0}")]
    NotFound(Uuid),

    /// The persistence layer failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Creates job records and hands their ids to the worker pool.
pub struct JobService {
    repository: Arc<dyn JobRepository>,
    queue: mpsc::Sender<Uuid>,
}

impl JobService {
    #[must_use]
    pub fn new(repository: Arc<dyn JobRepository>, queue: mpsc::Sender<Uuid>) -> Self {
        Self { repository, queue }
    }

    /// Validates the request, creates a PENDING record, and enqueues its id.
    ///
    /// Only the id crosses the concurrency boundary; workers re-read the
    /// record from the repository.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Validation`] if `top_n_features` is zero or a
    /// parameter override carries a non-positive value; nothing is persisted
    /// in that case.
    pub async fn submit(
        &self,
        model_params: ModelParams,
        top_n_features: usize,
    ) -> Result<JobRecord, SubmitError> {
        if top_n_features == 0 {
            return Err(SubmitError::Validation(
                "top_n_features must be a positive integer".to_string(),
            ));
        }
        model_params.validate().map_err(SubmitError::Validation)?;

        let record = JobRecord::new(model_params, top_n_features);
        self.repository.create(record.clone()).await?;
        self.queue
            .send(record.id)
            .await
            .map_err(|_| SubmitError::QueueClosed)?;

        info!(job_id = %record.id, top_n_features, "job submitted");
        Ok(record)
    }

    /// Returns the latest persisted snapshot for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NotFound`] for unknown ids.
    pub async fn query(&self, id: Uuid) -> Result<JobRecord, QueryError> {
        self.repository.get(id).await?.ok_or(QueryError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::controller::{EvaluationPipeline, ExecutionError, JobLifecycleController};
    use crate::model::JobStatus;
    use crate::repository::InMemoryJobRepository;
    use crate::worker::spawn_job_workers;
    use ml_model::EvaluationResult;

    fn service() -> (Arc<InMemoryJobRepository>, JobService, mpsc::Receiver<Uuid>) {
        let repository = Arc::new(InMemoryJobRepository::new());
        let (sender, receiver) = mpsc::channel(8);
        let service = JobService::new(repository.clone(), sender);
        (repository, service, receiver)
    }

    #[tokio::test]
    async fn test_zero_top_n_is_rejected_without_a_record() {
        let (_repository, service, mut receiver) = service();

        let err = service
            .submit(ModelParams::default(), 0)
            .await
            .expect_err("zero top_n must be rejected");

        assert!(matches!(err, SubmitError::Validation(_)));
        assert!(receiver.try_recv().is_err(), "nothing may be enqueued");
    }

    #[tokio::test]
    async fn test_invalid_params_are_rejected_without_a_record() {
        let (_repository, service, mut receiver) = service();
        let params = ModelParams {
            n_estimators: Some(0),
            ..ModelParams::default()
        };

        let err = service
            .submit(params, 5)
            .await
            .expect_err("zero estimators must be rejected");

        assert!(matches!(err, SubmitError::Validation(_)));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_submit_creates_pending_record_and_enqueues_id() {
        let (_repository, service, mut receiver) = service();

        let record = service
            .submit(ModelParams::default(), 5)
            .await
            .expect("submit");

        assert_eq!(record.status, JobStatus::Pending);
        assert_eq!(receiver.try_recv().expect("id enqueued"), record.id);

        let snapshot = service.query(record.id).await.expect("query");
        assert_eq!(snapshot, record);
    }

    #[tokio::test]
    async fn test_query_unknown_id_is_not_found() {
        let (_repository, service, _receiver) = service();

        let err = service
            .query(Uuid::new_v4())
            .await
            .expect_err("unknown id must be not found");

        assert!(matches!(err, QueryError::NotFound(_)));
    }

    struct InstantPipeline;

    impl EvaluationPipeline for InstantPipeline {
        fn run(
            &self,
            _params: &ModelParams,
            top_n: usize,
        ) -> Result<EvaluationResult, ExecutionError> {
            Ok(EvaluationResult {
                full_model_f1_score: 0.9,
                reduced_model_f1_score: 0.9,
                f1_difference_percentage: 0.0,
                total_features_evaluated: 20,
                features_selected_count: top_n,
                top_features_list: vec!["f0".to_string(); top_n],
            })
        }
    }

    #[tokio::test]
    async fn test_submitted_job_reaches_complete_through_workers() {
        let repository = Arc::new(InMemoryJobRepository::new());
        let (sender, receiver) = mpsc::channel(8);
        let controller = Arc::new(JobLifecycleController::new(
            repository.clone(),
            Arc::new(InstantPipeline),
        ));
        let shutdown = CancellationToken::new();
        spawn_job_workers(2, controller, receiver, shutdown.clone());

        let service = JobService::new(repository, sender);
        let record = service
            .submit(ModelParams::default(), 3)
            .await
            .expect("submit");

        // The observed status walk must be monotone and end in COMPLETE.
        let mut last = JobStatus::Pending;
        let mut terminal = None;
        for _ in 0..200 {
            let snapshot = service.query(record.id).await.expect("query");
            let rank = |status: JobStatus| match status {
                JobStatus::Pending => 0,
                JobStatus::Running => 1,
                JobStatus::Complete | JobStatus::Failed => 2,
            };
            assert!(rank(snapshot.status) >= rank(last), "status regressed");
            last = snapshot.status;
            if snapshot.status.is_terminal() {
                terminal = Some(snapshot);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown.cancel();

        let finished = terminal.expect("job reached a terminal state");
        assert_eq!(finished.status, JobStatus::Complete);
        assert_eq!(
            finished.results.expect("results").features_selected_count,
            3
        );
    }
}
