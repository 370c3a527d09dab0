pub mod bootstrap;
pub mod config;
pub mod forecast;
pub mod http;
pub mod metrics_server;
pub mod normalize;
pub mod observability;
pub mod store;

pub use forecast::{Forecaster, ProcessForecaster};
pub use http::{router, AppState};
pub use store::{InMemorySensorStore, PgSensorStore, SensorStore};
