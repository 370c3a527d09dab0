use time::OffsetDateTime;

/// A reading about to be written. Unset metrics stay absent in the store,
/// and the store assigns `time` at creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorReading {
    pub volt: Option<f64>,
    pub amps: Option<f64>,
    pub watt: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl SensorReading {
    /// True when none of the five metrics is set.
    pub fn is_empty(&self) -> bool {
        self.volt.is_none()
            && self.amps.is_none()
            && self.watt.is_none()
            && self.temperature.is_none()
            && self.humidity.is_none()
    }
}

/// A persisted reading as returned by the read paths.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorRecord {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub volt: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub amps: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub watt: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub temperature: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub humidity: Option<f64>,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub time: OffsetDateTime,
}

impl SensorRecord {
    pub fn from_reading(id: String, reading: &SensorReading, time: OffsetDateTime) -> Self {
        Self {
            id,
            volt: reading.volt,
            amps: reading.amps,
            watt: reading.watt,
            temperature: reading.temperature,
            humidity: reading.humidity,
            time,
        }
    }
}

/// Identity of a freshly written reading.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertedReading {
    pub id: String,
    pub time: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn reading_without_metrics_is_empty() {
        assert!(SensorReading::default().is_empty());
    }

    #[test]
    fn zero_counts_as_a_set_metric() {
        let reading = SensorReading {
            volt: Some(0.0),
            ..Default::default()
        };
        assert!(!reading.is_empty());
    }

    #[test]
    fn record_copies_metrics_from_reading() {
        let reading = SensorReading {
            temperature: Some(22.1),
            ..Default::default()
        };
        let at = datetime!(2024-03-01 12:00:00 UTC);
        let record = SensorRecord::from_reading("abc".to_string(), &reading, at);

        assert_eq!(record.id, "abc");
        assert_eq!(record.temperature, Some(22.1));
        assert!(record.volt.is_none());
        assert_eq!(record.time, at);
    }
}
