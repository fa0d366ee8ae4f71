//! Typed API for the persisted user record and onboarding flag.

use crate::{KeyValueStore, StorageKeys, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The signed-in user as persisted between launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub is_email_verified: bool,
    pub last_sign_in_at: DateTime<Utc>,
}

/// High-level API over a [`KeyValueStore`].
pub struct UserDefaults {
    storage: Box<dyn KeyValueStore>,
}

impl UserDefaults {
    /// Create a new UserDefaults with the given storage backend
    pub fn new(storage: Box<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Persist the user record and mark onboarding as completed.
    pub fn save_user(&self, user: &UserRecord) -> StorageResult<()> {
        let json = serde_json::to_string(user)?;
        self.storage.set(StorageKeys::CURRENT_USER, &json)?;
        self.set_onboarding_completed(true)?;
        tracing::debug!(uid = %user.uid, "saved user record");
        Ok(())
    }

    /// Load the stored user record, if any.
    ///
    /// A record that no longer decodes is treated as absent and logged.
    pub fn load_user(&self) -> StorageResult<Option<UserRecord>> {
        let Some(json) = self.storage.get(StorageKeys::CURRENT_USER)? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(error = %e, "stored user record is unreadable, ignoring");
                Ok(None)
            }
        }
    }

    /// Remove the stored user record and reset the onboarding flag.
    pub fn clear_user_data(&self) -> StorageResult<()> {
        self.storage.delete(StorageKeys::CURRENT_USER)?;
        self.storage.delete(StorageKeys::ONBOARDING_COMPLETED)?;
        tracing::debug!("cleared stored user data");
        Ok(())
    }

    pub fn is_onboarding_completed(&self) -> StorageResult<bool> {
        Ok(self
            .storage
            .get(StorageKeys::ONBOARDING_COMPLETED)?
            .is_some_and(|value| value == "true"))
    }

    pub fn set_onboarding_completed(&self, completed: bool) -> StorageResult<()> {
        self.storage.set(
            StorageKeys::ONBOARDING_COMPLETED,
            if completed { "true" } else { "false" },
        )
    }
}
