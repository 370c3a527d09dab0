use sensor_client::SensorReading;

use crate::store::{SensorStore, StoreError};

/// The reading written into an empty store on first start.
pub fn sample_reading() -> SensorReading {
    SensorReading {
        volt: Some(201.5),
        amps: Some(1.23),
        watt: Some(283.5),
        temperature: Some(20.4),
        humidity: Some(60.2),
    }
}

/// Insert the sample reading when the store holds nothing. A failing count
/// is treated as an empty store. Returns whether a reading was written.
pub async fn seed_if_empty(store: &dyn SensorStore) -> Result<bool, StoreError> {
    let count = match store.count().await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!(error = %e, "could not count readings, assuming empty store");
            0
        }
    };

    if count > 0 {
        tracing::info!(count, "store already contains readings, skipping sample insert");
        return Ok(false);
    }

    let inserted = store.insert(&sample_reading()).await?;
    tracing::info!(id = %inserted.id, "inserted sample reading into empty store");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySensorStore;

    #[tokio::test]
    async fn seeds_exactly_once() {
        let store = InMemorySensorStore::new();

        assert!(seed_if_empty(&store).await.unwrap());
        assert!(!seed_if_empty(&store).await.unwrap());

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].volt, Some(201.5));
        assert_eq!(records[0].humidity, Some(60.2));
    }

    #[tokio::test]
    async fn non_empty_store_is_left_alone() {
        let store = InMemorySensorStore::new();
        store
            .insert(&SensorReading {
                temperature: Some(19.0),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!seed_if_empty(&store).await.unwrap());
        assert_eq!(store.records().len(), 1);
    }
}
