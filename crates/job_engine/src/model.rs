//! Job record types.

use chrono::{DateTime, Utc};
use ml_model::{EvaluationResult, ForestConfig};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a job.
///
/// Transitions only move forward: `Pending` → `Running` → `Complete` or
/// `Failed`. The terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl JobStatus {
    /// Returns true for the absorbing states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// Recognized hyperparameter overrides for the base classifier.
///
/// Unknown keys are rejected at deserialization, so nothing unvetted reaches
/// the trainer. Absent keys fall back to the forest defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelParams {
    /// Number of trees in the ensemble.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_estimators: Option<u32>,

    /// Maximum tree depth; omitted means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,

    /// Worker threads for tree fitting; `-1` uses all cores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_jobs: Option<i32>,
}

impl ModelParams {
    /// Checks value-level constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a description of the offending key when a value is out of
    /// range.
    pub fn validate(&self) -> Result<(), String> {
        if self.n_estimators == Some(0) {
            return Err("n_estimators must be a positive integer".to_string());
        }
        if self.max_depth == Some(0) {
            return Err("max_depth must be a positive integer".to_string());
        }
        Ok(())
    }

    /// Merges these overrides over the default forest configuration.
    /// User-supplied keys win.
    #[must_use]
    pub fn merge_into_config(&self) -> ForestConfig {
        let mut config = ForestConfig::default();
        if let Some(n_estimators) = self.n_estimators {
            config.n_estimators = n_estimators as usize;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = Some(max_depth as usize);
        }
        if let Some(n_jobs) = self.n_jobs {
            config.n_jobs = n_jobs;
        }
        config
    }
}

/// One feature-selection evaluation request and its current state.
///
/// `results` and `error_message` are mutually exclusive and both absent
/// until a terminal state is reached. Only the lifecycle controller mutates
/// a record after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub status: JobStatus,
    pub model_params: ModelParams,
    pub top_n_features: usize,
    pub results: Option<EvaluationResult>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Creates a new pending record with a fresh id.
    #[must_use]
    pub fn new(model_params: ModelParams, top_n_features: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            model_params,
            top_n_features,
            results: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.touch();
    }

    pub(crate) fn mark_complete(&mut self, results: EvaluationResult) {
        self.status = JobStatus::Complete;
        self.results = Some(results);
        self.error_message = None;
        self.touch();
    }

    pub(crate) fn mark_failed(&mut self, message: String) {
        self.status = JobStatus::Failed;
        self.error_message = Some(message);
        self.results = None;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
