use super::{RecordStore, RecordSummary, RecordUpdate, RepositoryRecord, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Volatile process-local store; records live until the process exits
///
/// A panic inside an update closure poisons the map. Every later call then
/// fails with [`StoreError::Unavailable`] instead of serving a half-applied record.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<HashMap<String, RepositoryRecord>>>,
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("record map lock poisoned".to_string())
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, id: &str) -> Result<Option<RepositoryRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(id).cloned())
    }

    async fn put(&self, record: RepositoryRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn update(&self, id: &str, apply: RecordUpdate) -> Result<RepositoryRecord, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        apply(record);
        Ok(record.clone())
    }

    async fn list(&self) -> Result<Vec<RecordSummary>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let mut summaries: Vec<RecordSummary> = records.values().map(|r| r.summary()).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }
}

impl std::fmt::Debug for MemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRecordStore")
            .field("records", &self.len())
            .finish()
    }
}
