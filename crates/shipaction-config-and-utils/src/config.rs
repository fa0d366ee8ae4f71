//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Host probed by the background reachability check.
pub const DEFAULT_REACHABILITY_HOST: &str = "www.apple.com:443";

const DEFAULT_SPLASH_DELAY_MS: u64 = 2_000;
const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;
const DEFAULT_LOCKOUT_DURATION_SECS: u64 = 15 * 60;
const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 30 * 60;
const DEFAULT_SESSION_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_REACHABILITY_TIMEOUT_MS: u64 = 5_000;

/// How often the session-expired callback fires while a session stays expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryNotificationSetting {
    /// Fire once, then stay quiet until activity or a restart.
    #[default]
    Once,
    /// Fire on every poll tick for as long as the session is expired.
    EveryTick,
}

/// Session core configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Minimum splash duration before auth state is loaded.
    #[serde(default = "default_splash_delay_ms")]
    pub splash_delay_ms: u64,
    /// Consecutive failed logins before an identifier is locked out.
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
    /// How long a lockout lasts.
    #[serde(default = "default_lockout_duration_secs")]
    pub lockout_duration_secs: u64,
    /// Inactivity window after which a session counts as expired.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    /// Interval of the session expiry check.
    #[serde(default = "default_session_poll_interval_secs")]
    pub session_poll_interval_secs: u64,
    #[serde(default)]
    pub session_expiry_notification: ExpiryNotificationSetting,
    /// `host:port` used by the reachability probe.
    #[serde(default = "default_reachability_host")]
    pub reachability_host: String,
    #[serde(default = "default_reachability_timeout_ms")]
    pub reachability_timeout_ms: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_splash_delay_ms() -> u64 {
    DEFAULT_SPLASH_DELAY_MS
}

fn default_max_failed_attempts() -> u32 {
    DEFAULT_MAX_FAILED_ATTEMPTS
}

fn default_lockout_duration_secs() -> u64 {
    DEFAULT_LOCKOUT_DURATION_SECS
}

fn default_session_timeout_secs() -> u64 {
    DEFAULT_SESSION_TIMEOUT_SECS
}

fn default_session_poll_interval_secs() -> u64 {
    DEFAULT_SESSION_POLL_INTERVAL_SECS
}

fn default_reachability_host() -> String {
    DEFAULT_REACHABILITY_HOST.to_string()
}

fn default_reachability_timeout_ms() -> u64 {
    DEFAULT_REACHABILITY_TIMEOUT_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            splash_delay_ms: DEFAULT_SPLASH_DELAY_MS,
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            lockout_duration_secs: DEFAULT_LOCKOUT_DURATION_SECS,
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
            session_poll_interval_secs: DEFAULT_SESSION_POLL_INTERVAL_SECS,
            session_expiry_notification: ExpiryNotificationSetting::default(),
            reachability_host: default_reachability_host(),
            reachability_timeout_ms: DEFAULT_REACHABILITY_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    ///
    /// Environment variables are applied last, then the result is validated.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Reject values that would disable the security policies.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_failed_attempts == 0 {
            return Err(CoreError::Config(
                "max_failed_attempts must be at least 1".to_string(),
            ));
        }
        if self.session_timeout_secs == 0 {
            return Err(CoreError::Config(
                "session_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.session_poll_interval_secs == 0 {
            return Err(CoreError::Config(
                "session_poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if !self.reachability_host.contains(':') {
            return Err(CoreError::Config(format!(
                "reachability_host must be host:port, got {:?}",
                self.reachability_host
            )));
        }
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("SHIPACTION_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(host) = std::env::var("SHIPACTION_REACHABILITY_HOST") {
            if !host.trim().is_empty() {
                self.reachability_host = host.trim().to_string();
            }
        }
    }

    pub fn splash_delay(&self) -> Duration {
        Duration::from_millis(self.splash_delay_ms)
    }

    pub fn lockout_duration(&self) -> Duration {
        Duration::from_secs(self.lockout_duration_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn session_poll_interval(&self) -> Duration {
        Duration::from_secs(self.session_poll_interval_secs)
    }

    pub fn reachability_timeout(&self) -> Duration {
        Duration::from_millis(self.reachability_timeout_ms)
    }
}
