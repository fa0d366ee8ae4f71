//! Persistence for the ShipAction session core.
//!
//! Everything sits behind the [`KeyValueStore`] trait:
//! - **MemoryStore**: process-local map, used by tests and ephemeral runs
//! - **JsonFileStore**: a single JSON object on disk, rewritten atomically
//!
//! [`UserDefaults`] layers the typed user-record / onboarding API on top.

mod file;
mod keys;
mod memory;
mod traits;
mod user_defaults;

pub use file::JsonFileStore;
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use traits::KeyValueStore;
pub use user_defaults::{UserDefaults, UserRecord};

use shipaction_config_and_utils::Paths;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure (invalid path, write rejected)
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Key not found
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Open the file-backed store at `~/.shipaction/user_defaults.json`
/// (or under the given base directory).
pub fn create_storage(paths: &Paths) -> StorageResult<Box<dyn KeyValueStore>> {
    let store = JsonFileStore::open(paths.user_defaults_file())?;
    Ok(Box::new(store))
}

/// Create a UserDefaults backed by the default file store.
pub fn create_user_defaults(paths: &Paths) -> StorageResult<UserDefaults> {
    let storage = create_storage(paths)?;
    Ok(UserDefaults::new(storage))
}
