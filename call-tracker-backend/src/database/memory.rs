use crate::database::{RecordStore, StoreUnavailableError};
use api_structs::TraceRecord;
use async_trait::async_trait;

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: parking_lot::RwLock<Vec<TraceRecord>>,
}

impl MemoryRecordStore {
    pub fn with_records(records: Vec<TraceRecord>) -> Self {
        Self {
            records: parking_lot::RwLock::new(records),
        }
    }
    pub fn len(&self) -> usize {
        self.records.read().len()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, record: &TraceRecord) -> Result<(), StoreUnavailableError> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<TraceRecord>, StoreUnavailableError> {
        Ok(self.records.read().clone())
    }
}

/// Behaves like a store whose database went away.
#[derive(Debug, Default)]
pub struct UnavailableRecordStore;

impl UnavailableRecordStore {
    fn error(context: &str) -> StoreUnavailableError {
        backtraced_error::SqlxError::from_sqlx_error(sqlx::Error::PoolTimedOut, context).into()
    }
}

#[async_trait]
impl RecordStore for UnavailableRecordStore {
    async fn insert(&self, _record: &TraceRecord) -> Result<(), StoreUnavailableError> {
        Err(Self::error("inserting"))
    }

    async fn find_all(&self) -> Result<Vec<TraceRecord>, StoreUnavailableError> {
        Err(Self::error("scanning all records"))
    }
}
