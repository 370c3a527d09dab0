use anyhow::Result;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::domain::{SensorReading, SensorRecord};

/// Create the `sensors` table when it does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensors (
            id          TEXT PRIMARY KEY,
            volt        DOUBLE PRECISION,
            amps        DOUBLE PRECISION,
            watt        DOUBLE PRECISION,
            temperature DOUBLE PRECISION,
            humidity    DOUBLE PRECISION,
            time        TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS sensors_time_idx ON sensors (time DESC)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Insert one reading; the database assigns `time`, which is returned.
pub async fn insert_reading(pool: &PgPool, id: &str, reading: &SensorReading) -> Result<OffsetDateTime> {
    let time = sqlx::query_scalar::<_, OffsetDateTime>(
        r#"
        INSERT INTO sensors (id, volt, amps, watt, temperature, humidity)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING time
        "#,
    )
    .bind(id)
    .bind(reading.volt)
    .bind(reading.amps)
    .bind(reading.watt)
    .bind(reading.temperature)
    .bind(reading.humidity)
    .fetch_one(pool)
    .await?;

    Ok(time)
}

/// Most recent reading by `time`, if any.
pub async fn latest_reading(pool: &PgPool) -> Result<Option<SensorRecord>> {
    let row = sqlx::query_as::<_, SensorRecord>(
        r#"
        SELECT id, volt, amps, watt, temperature, humidity, time
        FROM sensors
        ORDER BY time DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Readings with `start <= time <= end`, newest first. Missing bounds are open.
pub async fn reading_history(
    pool: &PgPool,
    start: Option<OffsetDateTime>,
    end: Option<OffsetDateTime>,
    limit: i64,
) -> Result<Vec<SensorRecord>> {
    let rows = sqlx::query_as::<_, SensorRecord>(
        r#"
        SELECT id, volt, amps, watt, temperature, humidity, time
        FROM sensors
        WHERE ($1::timestamptz IS NULL OR time >= $1)
          AND ($2::timestamptz IS NULL OR time <= $2)
        ORDER BY time DESC
        LIMIT $3
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn count_readings(pool: &PgPool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sensors")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
