//! Repository record storage
//!
//! The pipeline and deployment manager receive a [`RecordStore`] at construction;
//! nothing reaches for a process global. [`MemoryRecordStore`] is the volatile
//! reference backend.

mod memory;
mod record;

pub use memory::MemoryRecordStore;
pub use record::{
    Deployment, DeploymentStatus, RecordStatus, RecordSummary, RepositoryRecord, SourceKind,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Repository {0} not found")]
    NotFound(String),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

/// In-place mutation applied atomically by [`RecordStore::update`]
pub type RecordUpdate = Box<dyn FnOnce(&mut RepositoryRecord) + Send>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<RepositoryRecord>, StoreError>;

    /// Inserts or replaces the record with the same id (last writer wins)
    async fn put(&self, record: RepositoryRecord) -> Result<(), StoreError>;

    /// Applies `apply` under the store's write lock and returns the new state
    async fn update(&self, id: &str, apply: RecordUpdate) -> Result<RepositoryRecord, StoreError>;

    /// Summaries ordered by id
    async fn list(&self) -> Result<Vec<RecordSummary>, StoreError>;
}
