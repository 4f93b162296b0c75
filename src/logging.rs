//! Logging setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber: compact output, `info` by default,
/// with the MQTT and HTTP stacks quieted. `RUST_LOG` overrides the filter
/// entirely.
pub fn init() {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => EnvFilter::new("info")
            .add_directive("rumqttc=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap()),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}
