//! Structured logging setup for the connector tools
//!
//! Log lines go to stderr so that command output on stdout stays machine-readable.

use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize JSON logging
///
/// This sets up:
/// - JSON formatted logs on stderr
/// - `RUST_LOG` filtering, falling back to `default_level`
/// - Service name tagging
pub fn init_logging(service_name: &str, default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    tracing::debug!(service = service_name, "Logging initialized");
}

/// Initialize human-readable console logging
pub fn init_console_logging(service_name: &str, default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!(service = service_name, "Console logging initialized");
}
