use serde::Deserialize;
use std::{fs, io, path::PathBuf, time::Duration};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("store connection string is not set (store.uri or DATABASE_URL)")]
    MissingStoreUri,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub uri: Option<String>,
    pub max_connections: u32,
    /// Write one sample reading when the store starts out empty.
    pub seed_sample: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: None,
            max_connections: 5,
            seed_sample: true,
        }
    }
}

impl StoreConfig {
    pub fn require_uri(&self) -> Result<&str, ConfigError> {
        match self.uri.as_deref() {
            Some(uri) if !uri.trim().is_empty() => Ok(uri),
            _ => Err(ConfigError::MissingStoreUri),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub program: String,
    pub script: PathBuf,
    /// `0` disables the deadline.
    pub timeout_secs: u64,
    pub model_label: String,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            script: PathBuf::from("ml_service/predict_future.py"),
            timeout_secs: 30,
            model_label: "Ridge Regression (3 lags)".to_string(),
        }
    }
}

impl ForecastConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub forecast: ForecastConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Load from the TOML file named by `SENSOR_HUB_CONFIG` (default
    /// `sensor-hub.toml`, optional), then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        use std::env;

        let path = env::var("SENSOR_HUB_CONFIG").unwrap_or_else(|_| "sensor-hub.toml".to_string());
        let mut cfg = match fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        cfg.apply_overrides(|key| env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply `DATABASE_URL`, `PORT`, `FORECAST_PROGRAM`, `FORECAST_SCRIPT`
    /// and `FORECAST_TIMEOUT_SECS` from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("DATABASE_URL") {
            self.store.uri = Some(uri);
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key: "PORT", value: port })?;
        }
        if let Some(program) = lookup("FORECAST_PROGRAM") {
            self.forecast.program = program;
        }
        if let Some(script) = lookup("FORECAST_SCRIPT") {
            self.forecast.script = PathBuf::from(script);
        }
        if let Some(secs) = lookup("FORECAST_TIMEOUT_SECS") {
            self.forecast.timeout_secs = secs.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "FORECAST_TIMEOUT_SECS",
                value: secs,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();

        assert_eq!(cfg.server.bind_addr(), "0.0.0.0:3000");
        assert!(cfg.store.seed_sample);
        assert_eq!(cfg.forecast.timeout(), Some(Duration::from_secs(30)));
        assert!(cfg.metrics.is_none());
        assert!(matches!(cfg.store.require_uri(), Err(ConfigError::MissingStoreUri)));
    }

    #[test]
    fn file_sections_override_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [server]
            port = 8080

            [store]
            uri = "postgres://localhost/sensors"
            seed_sample = false

            [forecast]
            program = "/opt/venv/bin/python"
            timeout_secs = 0

            [metrics]
            bind_addr = "127.0.0.1:9100"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.bind_host, "0.0.0.0");
        assert_eq!(cfg.store.require_uri().unwrap(), "postgres://localhost/sensors");
        assert!(!cfg.store.seed_sample);
        assert_eq!(cfg.forecast.program, "/opt/venv/bin/python");
        assert_eq!(cfg.forecast.script, PathBuf::from("ml_service/predict_future.py"));
        assert!(cfg.forecast.timeout().is_none());
        assert_eq!(cfg.metrics.unwrap().bind_addr, "127.0.0.1:9100");
    }

    #[test]
    fn environment_overrides_win() {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(lookup(&[
            ("DATABASE_URL", "postgres://db/readings"),
            ("PORT", "4000"),
            ("FORECAST_SCRIPT", "/srv/predict.py"),
            ("FORECAST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(cfg.store.require_uri().unwrap(), "postgres://db/readings");
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.forecast.script, PathBuf::from("/srv/predict.py"));
        assert_eq!(cfg.forecast.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut cfg = AppConfig::default();
        let err = cfg.apply_overrides(lookup(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PORT", .. }));
    }

    #[test]
    fn blank_uri_counts_as_missing() {
        let mut cfg = AppConfig::default();
        cfg.store.uri = Some("  ".to_string());
        assert!(matches!(cfg.store.require_uri(), Err(ConfigError::MissingStoreUri)));
    }
}
