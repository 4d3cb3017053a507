//! Asynchronous job engine for feature-selection evaluations.
//!
//! Owns the job lifecycle state machine: submission creates a pending
//! record, a worker pool executes each job at most once, and queries read
//! the most recently persisted snapshot.

mod controller;
mod model;
mod repository;
mod service;
mod worker;

pub use controller::{
    CsvEvaluationPipeline, EvaluationPipeline, ExecutionError, JobLifecycleController,
};
pub use model::{JobRecord, JobStatus, ModelParams};
pub use repository::{InMemoryJobRepository, JobRepository, RepositoryError};
pub use service::{JobService, QueryError, SubmitError};
pub use worker::spawn_job_workers;
