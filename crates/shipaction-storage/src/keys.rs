//! Storage key constants.

/// Storage keys used by the session core
pub struct StorageKeys;

impl StorageKeys {
    /// Serialized [`UserRecord`](crate::UserRecord) (JSON)
    pub const CURRENT_USER: &'static str = "currentUser";

    /// Whether the user finished onboarding ("true" / "false")
    pub const ONBOARDING_COMPLETED: &'static str = "hasCompletedOnboarding";
}
