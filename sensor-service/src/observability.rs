use tracing_subscriber::EnvFilter;

/// Targets logged at `info` unless `RUST_LOG` says otherwise: the library
/// and the binary.
const DEFAULT_DIRECTIVES: [&str; 2] = ["sensor_service=info", "sensor_hub=info"];

pub fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    for directive in DEFAULT_DIRECTIVES {
        filter = filter.add_directive(directive.parse().unwrap_or_else(|_| "info".parse().unwrap()));
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
