pub mod sensor_queries;
