//! Logging initialization for the session core.
//!
//! Thin wrapper over the observability crate. Every ShipAction component logs
//! through `tracing`; this sets up the structured JSONL sink at
//! `~/.shipaction/logs/dev.jsonl` plus a compact stderr layer.

use std::path::PathBuf;

/// Service name stamped on every log line.
const SERVICE_NAME: &str = "shipaction";

/// Initialize the logging system.
///
/// * `level` - Default log level (trace, debug, info, warn, error). `RUST_LOG`
///   takes precedence when set.
/// * `log_path` - JSONL destination. `None` uses the observability default.
///
/// ```ignore
/// init_logging("info", Some(paths.log_file()));
/// tracing::info!("startup sequencer running");
/// ```
pub fn init_logging(level: &str, log_path: Option<PathBuf>) {
    observability::init_with_config(observability::LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: parse_level(level).as_str().to_ascii_lowercase(),
        log_path,
        also_stderr: true,
    });
}

/// Parse a log level string into a tracing Level.
///
/// Unknown values fall back to `INFO`.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
