use sensor_client::{db::sensor_queries, InsertedReading, SensorReading, SensorRecord};
use sqlx::postgres::{PgPool, PgPoolOptions};
use time::OffsetDateTime;

use super::{new_record_id, HistoryQuery, SensorStore, StoreError};

/// `SensorStore` over a Postgres-wire database.
#[derive(Clone)]
pub struct PgSensorStore {
    pool: PgPool,
}

impl PgSensorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open the pool and make sure the `sensors` table exists.
    pub async fn connect(uri: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(uri)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        sensor_queries::ensure_schema(&pool)
            .await
            .map_err(|e| StoreError::Connection(format!("schema setup failed: {e}")))?;

        Ok(Self::new(pool))
    }
}

fn backend(e: anyhow::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait::async_trait]
impl SensorStore for PgSensorStore {
    async fn insert(&self, reading: &SensorReading) -> Result<InsertedReading, StoreError> {
        let id = new_record_id(reading, OffsetDateTime::now_utc());
        let time = sensor_queries::insert_reading(&self.pool, &id, reading)
            .await
            .map_err(backend)?;

        metrics::counter!("store_inserted_records_total").increment(1);
        Ok(InsertedReading { id, time })
    }

    async fn latest(&self) -> Result<Option<SensorRecord>, StoreError> {
        sensor_queries::latest_reading(&self.pool).await.map_err(backend)
    }

    async fn history(&self, query: &HistoryQuery) -> Result<Vec<SensorRecord>, StoreError> {
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        sensor_queries::reading_history(&self.pool, query.start, query.end, limit)
            .await
            .map_err(backend)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count = sensor_queries::count_readings(&self.pool).await.map_err(backend)?;
        Ok(count.max(0) as u64)
    }
}
