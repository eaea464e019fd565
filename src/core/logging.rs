//! Logging configuration and initialization
//!
//! This module sets up the tracing subscriber for structured logging. Logs
//! go to stderr so that stdout carries only the smoke-test report.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const VALID_LEVELS: [&str; 6] = ["debug", "info", "warning", "warn", "error", "critical"];

/// Normalize a configured log level into a tracing filter directive
///
/// Only the first word is considered, so trailing comments in `.env` files
/// are ignored. Unknown levels fall back to "info".
pub fn normalize_level(log_level: &str) -> &'static str {
    let level = log_level
        .split_whitespace()
        .next()
        .unwrap_or("info")
        .to_lowercase();

    if !VALID_LEVELS.contains(&level.as_str()) {
        return "info";
    }

    match level.as_str() {
        "debug" => "debug",
        "warning" | "warn" => "warn",
        "error" | "critical" => "error",
        _ => "info",
    }
}

/// Initialize the logging system with the specified level
///
/// `RUST_LOG` takes precedence when it is set.
///
/// # Arguments
///
/// * `log_level` - The log level string (debug, info, warning, error, critical)
pub fn init_logging(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(normalize_level(log_level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
