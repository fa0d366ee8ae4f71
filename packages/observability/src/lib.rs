//! # Observability
//!
//! Centralized logging for the ShipAction session core.
//!
//! Components are **log producers** only. The binary calls
//! [`init_with_config`] once at startup and everything else uses the standard
//! `tracing` macros with structured fields:
//!
//! ```rust,ignore
//! observability::init("shipaction");
//! tracing::info!(flow = "main", "navigation changed");
//! ```
//!
//! Every event is written as one JSON object per line to
//! `~/.shipaction/logs/dev.jsonl` (or [`LogConfig::log_path`]), so
//! `tail -f ~/.shipaction/logs/dev.jsonl | jq` works for live inspection.
//! A compact human-readable stderr layer can be enabled alongside it.

mod json_layer;
mod writer;

use std::path::PathBuf;

pub use json_layer::{JsonLayer, LogEntry};
pub use writer::{CentralLogWriter, WriterFactory};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every JSON log line.
    pub service_name: String,

    /// Default log level filter (e.g. "debug", "info").
    /// Overridden by the `RUST_LOG` environment variable when set.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.shipaction/logs/dev.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Default central log file location.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".shipaction").join("logs").join("dev.jsonl"))
}

/// Initialize logging with default settings for the given service.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// If the log file cannot be opened the JSONL layer is skipped and logs go to
/// stderr only. Calling this more than once is a no-op.
pub fn init_with_config(config: LogConfig) {
    let log_path = config.log_path.clone().or_else(default_log_path);

    let json_layer = match log_path.as_deref().map(CentralLogWriter::new) {
        Some(Ok(writer)) => Some(
            JsonLayer::new(config.service_name.clone(), WriterFactory::new(writer))
                .with_filter(env_filter(&config.default_level)),
        ),
        Some(Err(e)) => {
            eprintln!("observability: failed to open log file {:?}: {}", log_path, e);
            None
        }
        None => None,
    };

    // Without a file sink, stderr is the only place logs can go.
    let stderr_enabled = config.also_stderr || json_layer.is_none();
    let stderr_layer = stderr_enabled.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            service = %config.service_name,
            log_path = ?log_path,
            "observability initialized"
        );
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
