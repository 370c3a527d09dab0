pub mod db;
pub mod domain;

pub use domain::{InsertedReading, SensorReading, SensorRecord};
