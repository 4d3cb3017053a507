//! Job persistence seam.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::JobRecord;

/// Errors surfaced by a job repository backend.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// An update referenced an id the store has never seen.
    #[error("no job record with id {0}")]
    UnknownId(Uuid),

    /// The backing store rejected the operation.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Storage contract for job records.
///
/// The lifecycle controller is the only writer of `status`, `results`, and
/// `error_message`. Implementations must serve strongly consistent reads of
/// the latest persisted record, which keeps the query contract monotonic.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Persists a freshly created record.
    async fn create(&self, record: JobRecord) -> Result<(), RepositoryError>;

    /// Returns the latest persisted snapshot, if the id exists.
    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, RepositoryError>;

    /// Replaces the stored record for `record.id`.
    async fn update(&self, record: JobRecord) -> Result<(), RepositoryError>;
}

/// In-memory repository backing the CLI runtime and tests.
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    records: RwLock<HashMap<Uuid, JobRecord>>,
}

impl InMemoryJobRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, record: JobRecord) -> Result<(), RepositoryError> {
        self.records.write().await.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, RepositoryError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn update(&self, record: JobRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(RepositoryError::UnknownId(record.id)),
        }
    }
}
