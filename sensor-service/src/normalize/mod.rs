use sensor_client::SensorReading;
use serde::Serialize;
use serde_json::{Map, Value};

/// Sensor fields recognised in an inbound payload, mapped onto their
/// canonical names. Values are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CanonicalFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amps: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<Value>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("cast to number failed for value \"{value}\" at path \"{field}\"")]
pub struct FieldCastError {
    pub field: &'static str,
    pub value: String,
}

fn resolve(input: &Map<String, Value>, key: &str, legacy: Option<&str>) -> Option<Value> {
    input
        .get(key)
        .or_else(|| legacy.and_then(|l| input.get(l)))
        .cloned()
}

/// Map a loosely shaped payload onto the canonical sensor fields.
///
/// Current names win over the legacy `value1`/`value2`/`value3` aliases.
/// A key counts as present whenever it exists, so `0`, `false` and even
/// `null` are kept and an explicit `null` shadows the legacy alias. Unknown
/// keys are dropped.
pub fn normalize(input: &Map<String, Value>) -> CanonicalFields {
    CanonicalFields {
        volt: resolve(input, "volt", Some("value1")),
        amps: resolve(input, "amps", Some("value2")),
        watt: resolve(input, "watt", Some("value3")),
        temperature: resolve(input, "temperature", None),
        humidity: resolve(input, "humidity", None),
    }
}

fn cast_number(field: &'static str, value: &Value) -> Result<f64, FieldCastError> {
    let fail = || FieldCastError {
        field,
        value: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    };

    match value {
        Value::Number(n) => n.as_f64().ok_or_else(fail),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Err(fail());
            }
            match trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(fail()),
            }
        }
        _ => Err(fail()),
    }
}

/// `null` is stored as an absent metric.
fn cast_opt(field: &'static str, value: &Option<Value>) -> Result<Option<f64>, FieldCastError> {
    value
        .as_ref()
        .filter(|v| !v.is_null())
        .map(|v| cast_number(field, v))
        .transpose()
}

impl CanonicalFields {
    pub fn is_empty(&self) -> bool {
        self.volt.is_none()
            && self.amps.is_none()
            && self.watt.is_none()
            && self.temperature.is_none()
            && self.humidity.is_none()
    }

    /// True when at least one resolved field holds something other than `null`.
    pub fn has_values(&self) -> bool {
        [&self.volt, &self.amps, &self.watt, &self.temperature, &self.humidity]
            .iter()
            .any(|v| v.as_ref().is_some_and(|v| !v.is_null()))
    }

    /// Number of resolved fields.
    pub fn len(&self) -> usize {
        [&self.volt, &self.amps, &self.watt, &self.temperature, &self.humidity]
            .iter()
            .filter(|v| v.is_some())
            .count()
    }

    /// Cast the resolved values to numbers the way the store column types
    /// demand: numbers as-is, numeric strings parsed, booleans as 1/0.
    pub fn to_reading(&self) -> Result<SensorReading, FieldCastError> {
        Ok(SensorReading {
            volt: cast_opt("volt", &self.volt)?,
            amps: cast_opt("amps", &self.amps)?,
            watt: cast_opt("watt", &self.watt)?,
            temperature: cast_opt("temperature", &self.temperature)?,
            humidity: cast_opt("humidity", &self.humidity)?,
        })
    }
}
