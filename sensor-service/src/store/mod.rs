pub mod memory;
pub mod postgres;

use std::sync::atomic::{AtomicU64, Ordering};

use sensor_client::{InsertedReading, SensorReading, SensorRecord};
use time::OffsetDateTime;

use crate::normalize::FieldCastError;

pub use memory::InMemorySensorStore;
pub use postgres::PgSensorStore;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),
    #[error(transparent)]
    InvalidValue(#[from] FieldCastError),
    #[error("store error: {0}")]
    Backend(String),
}

/// Bounds for the history read path. Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
    pub limit: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl HistoryQuery {
    pub fn matches(&self, time: OffsetDateTime) -> bool {
        self.start.map_or(true, |s| time >= s) && self.end.map_or(true, |e| time <= e)
    }
}

/// Persistence for sensor readings. Consistency is the backend's concern;
/// callers share one instance without extra locking.
#[async_trait::async_trait]
pub trait SensorStore: Send + Sync {
    async fn insert(&self, reading: &SensorReading) -> Result<InsertedReading, StoreError>;

    async fn latest(&self) -> Result<Option<SensorRecord>, StoreError>;

    /// Matching readings ordered newest first, truncated to `query.limit`.
    async fn history(&self, query: &HistoryQuery) -> Result<Vec<SensorRecord>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn hash_opt_f64(hasher: &mut blake3::Hasher, v: Option<f64>) {
    match v {
        Some(x) => {
            hasher.update(&[1]);
            hasher.update(&x.to_bits().to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

/// 24 hex characters, unique per process through a sequence number.
pub fn new_record_id(reading: &SensorReading, at: OffsetDateTime) -> String {
    let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);

    let mut h = blake3::Hasher::new();
    h.update(&at.unix_timestamp_nanos().to_le_bytes());
    h.update(&seq.to_le_bytes());
    h.update(&std::process::id().to_le_bytes());
    hash_opt_f64(&mut h, reading.volt);
    hash_opt_f64(&mut h, reading.amps);
    hash_opt_f64(&mut h, reading.watt);
    hash_opt_f64(&mut h, reading.temperature);
    hash_opt_f64(&mut h, reading.humidity);

    let hex = h.finalize().to_hex();
    hex.as_str()[..24].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn record_ids_are_24_hex_chars_and_distinct() {
        let reading = SensorReading {
            volt: Some(230.0),
            ..Default::default()
        };
        let at = datetime!(2024-01-01 00:00:00 UTC);

        let a = new_record_id(&reading, at);
        let b = new_record_id(&reading, at);

        assert_eq!(a.len(), 24);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn history_bounds_are_inclusive() {
        let query = HistoryQuery {
            start: Some(datetime!(2024-01-01 00:00:00 UTC)),
            end: Some(datetime!(2024-01-02 00:00:00 UTC)),
            limit: 10,
        };

        assert!(query.matches(datetime!(2024-01-01 00:00:00 UTC)));
        assert!(query.matches(datetime!(2024-01-02 00:00:00 UTC)));
        assert!(!query.matches(datetime!(2023-12-31 23:59:59 UTC)));
        assert!(!query.matches(datetime!(2024-01-02 00:00:01 UTC)));
    }

    #[test]
    fn open_history_query_matches_everything() {
        assert!(HistoryQuery::default().matches(datetime!(1970-01-01 00:00:00 UTC)));
        assert_eq!(HistoryQuery::default().limit, DEFAULT_HISTORY_LIMIT);
    }
}
