use std::sync::RwLock;

use sensor_client::{InsertedReading, SensorReading, SensorRecord};
use time::OffsetDateTime;

use super::{new_record_id, HistoryQuery, SensorStore, StoreError};

/// Process-local store, used for tests and for running without a database.
#[derive(Default)]
pub struct InMemorySensorStore {
    records: RwLock<Vec<SensorRecord>>,
}

impl InMemorySensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reading under an explicit instant instead of the current one.
    pub fn insert_at(&self, reading: &SensorReading, time: OffsetDateTime) -> Result<InsertedReading, StoreError> {
        let id = new_record_id(reading, time);

        let mut guard = self.records.write().map_err(poisoned)?;
        guard.push(SensorRecord::from_reading(id.clone(), reading, time));

        Ok(InsertedReading { id, time })
    }

    /// Snapshot of everything stored, in insertion order.
    pub fn records(&self) -> Vec<SensorRecord> {
        match self.records.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

#[async_trait::async_trait]
impl SensorStore for InMemorySensorStore {
    async fn insert(&self, reading: &SensorReading) -> Result<InsertedReading, StoreError> {
        self.insert_at(reading, OffsetDateTime::now_utc())
    }

    async fn latest(&self) -> Result<Option<SensorRecord>, StoreError> {
        let guard = self.records.read().map_err(poisoned)?;
        Ok(guard.iter().max_by_key(|r| r.time).cloned())
    }

    async fn history(&self, query: &HistoryQuery) -> Result<Vec<SensorRecord>, StoreError> {
        let guard = self.records.read().map_err(poisoned)?;
        let mut rows: Vec<SensorRecord> = guard.iter().filter(|r| query.matches(r.time)).cloned().collect();
        rows.sort_by(|a, b| b.time.cmp(&a.time));
        rows.truncate(query.limit);
        Ok(rows)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let guard = self.records.read().map_err(poisoned)?;
        Ok(guard.len() as u64)
    }
}
