//! Collaborator interfaces injected into the session core.

use crate::IdentityError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shipaction_storage::{StorageResult, UserDefaults, UserRecord};
use tokio::sync::mpsc;

/// Identifier handed out by [`IdentityProvider::subscribe`].
pub type SubscriptionId = u64;

/// One auth-state change: the signed-in identity, or `None` when signed out.
pub type AuthEvent = Option<AuthenticatedIdentity>;

/// The identity reported by the provider on an auth-state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl AuthenticatedIdentity {
    /// Display name, falling back to the local part of the email address.
    pub fn resolved_display_name(&self) -> String {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Build the persisted user record for a sign-in at `signed_in_at`.
    pub fn to_user_record(&self, signed_in_at: DateTime<Utc>) -> UserRecord {
        UserRecord {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.resolved_display_name(),
            is_email_verified: self.email_verified,
            last_sign_in_at: signed_in_at,
        }
    }
}

/// A live auth-state subscription.
///
/// Events arrive in delivery order on `events`. The subscription stays live
/// until [`IdentityProvider::unsubscribe`] is called with `id`.
#[derive(Debug)]
pub struct AuthSubscription {
    pub id: SubscriptionId,
    pub events: mpsc::UnboundedReceiver<AuthEvent>,
}

/// Source of authentication state.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Start listening to auth-state changes.
    fn subscribe(&self) -> AuthSubscription;

    /// Stop delivering events for `id`. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Sign the current user out.
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Check credentials and make the account the current user.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedIdentity, IdentityError>;
}

/// Network reachability.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Whether the network link is currently up.
    fn is_link_up(&self) -> bool;

    /// Whether a well-known host answers.
    async fn can_reach_known_host(&self) -> bool;
}

/// Persistence for the signed-in user.
pub trait UserRepository: Send + Sync {
    fn save_user(&self, user: &UserRecord) -> StorageResult<()>;

    fn load_user(&self) -> StorageResult<Option<UserRecord>>;

    fn clear_user_data(&self) -> StorageResult<()>;

    fn is_onboarding_completed(&self) -> StorageResult<bool>;

    fn set_onboarding_completed(&self, completed: bool) -> StorageResult<()>;
}

impl UserRepository for UserDefaults {
    fn save_user(&self, user: &UserRecord) -> StorageResult<()> {
        UserDefaults::save_user(self, user)
    }

    fn load_user(&self) -> StorageResult<Option<UserRecord>> {
        UserDefaults::load_user(self)
    }

    fn clear_user_data(&self) -> StorageResult<()> {
        UserDefaults::clear_user_data(self)
    }

    fn is_onboarding_completed(&self) -> StorageResult<bool> {
        UserDefaults::is_onboarding_completed(self)
    }

    fn set_onboarding_completed(&self, completed: bool) -> StorageResult<()> {
        UserDefaults::set_onboarding_completed(self, completed)
    }
}
