//! File system paths.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Name of the per-user runtime directory under `$HOME`.
const BASE_DIR_NAME: &str = ".shipaction";

/// Manages file system paths for the session core.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for runtime files (~/.shipaction)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.shipaction`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.shipaction).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.shipaction/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the key-value store backing the user record and onboarding flag
    /// (~/.shipaction/user_defaults.json).
    pub fn user_defaults_file(&self) -> PathBuf {
        self.base_dir.join("user_defaults.json")
    }

    /// Get the logs directory (~/.shipaction/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file (~/.shipaction/logs/dev.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("dev.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
