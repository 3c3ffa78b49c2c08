//! tracing subscribers used by the ringroute binaries.
//!
//! Logs are always written to stderr so that command output on stdout stays machine readable.
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};

const SERVICE_NAME: &str = "ringroute";
const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Human readable logs, filtered by `RUST_LOG`
pub fn initialize_fmt_subscriber() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Bunyan formatted json logs, filtered by `RUST_LOG`
pub fn initialize_json_subscriber() {
    let formatting_layer = BunyanFormattingLayer::new(SERVICE_NAME.to_string(), std::io::stderr);

    Registry::default()
        .with(env_filter())
        .with(JsonStorageLayer)
        .with(formatting_layer)
        .init();
}
