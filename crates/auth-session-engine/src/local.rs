//! In-process identity and connectivity collaborators.
//!
//! Used by the CLI harness and tests. `LocalIdentityProvider` behaves like a
//! hosted auth SDK listener: each new subscriber first receives the current
//! identity, then every later change in order.

use crate::ports::{
    AuthEvent, AuthSubscription, AuthenticatedIdentity, ConnectivityProbe, IdentityProvider,
    SubscriptionId,
};
use crate::IdentityError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

struct Account {
    password: String,
    identity: AuthenticatedIdentity,
}

#[derive(Default)]
struct ProviderState {
    accounts: HashMap<String, Account>,
    current: Option<AuthenticatedIdentity>,
    subscribers: HashMap<SubscriptionId, mpsc::UnboundedSender<AuthEvent>>,
    next_subscription_id: SubscriptionId,
    offline: bool,
}

impl ProviderState {
    /// Deliver to every live subscriber, dropping the ones whose receiver is gone.
    fn broadcast(&mut self, event: AuthEvent) {
        self.subscribers
            .retain(|_, sender| sender.send(event.clone()).is_ok());
    }
}

/// Identity provider backed by an in-memory account registry.
#[derive(Default)]
pub struct LocalIdentityProvider {
    state: Mutex<ProviderState>,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account that can sign in with `password`.
    pub fn register_account(
        &self,
        email: &str,
        password: &str,
        email_verified: bool,
    ) -> AuthenticatedIdentity {
        let identity = AuthenticatedIdentity {
            uid: Uuid::new_v4().to_string(),
            email: email.trim().to_string(),
            email_verified,
            display_name: None,
        };
        self.state.lock().accounts.insert(
            normalize_email(email),
            Account {
                password: password.to_string(),
                identity: identity.clone(),
            },
        );
        debug!(uid = %identity.uid, email_verified, "registered local account");
        identity
    }

    /// Replace the current identity and notify subscribers, as a restored
    /// session would.
    pub fn set_current_identity(&self, identity: Option<AuthenticatedIdentity>) {
        let mut state = self.state.lock();
        state.current = identity.clone();
        state.broadcast(identity);
    }

    pub fn current_identity(&self) -> Option<AuthenticatedIdentity> {
        self.state.lock().current.clone()
    }

    /// Make password sign-in fail with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Number of subscriptions that have not been unsubscribed.
    pub fn live_subscriptions(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn subscribe(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();

        state.next_subscription_id += 1;
        let id = state.next_subscription_id;
        // Receiver is alive, so this cannot fail.
        let _ = tx.send(state.current.clone());
        state.subscribers.insert(id, tx);

        debug!(subscription_id = id, "auth subscription opened");
        AuthSubscription { id, events: rx }
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if self.state.lock().subscribers.remove(&id).is_some() {
            debug!(subscription_id = id, "auth subscription closed");
        }
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let mut state = self.state.lock();
        if let Some(previous) = state.current.take() {
            info!(uid = %previous.uid, "signed out");
        }
        state.broadcast(None);
        Ok(())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedIdentity, IdentityError> {
        let mut state = self.state.lock();
        if state.offline {
            return Err(IdentityError::Network(
                "identity service unreachable".to_string(),
            ));
        }

        let identity = match state.accounts.get(&normalize_email(email)) {
            Some(account) if account.password == password => account.identity.clone(),
            _ => {
                return Err(IdentityError::InvalidCredentials(
                    "email or password is incorrect".to_string(),
                ))
            }
        };

        state.current = Some(identity.clone());
        state.broadcast(Some(identity.clone()));
        info!(uid = %identity.uid, email_verified = identity.email_verified, "signed in");
        Ok(identity)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Connectivity with manually controlled flags.
#[derive(Debug)]
pub struct ManualConnectivity {
    link_up: AtomicBool,
    reachable: AtomicBool,
}

impl ManualConnectivity {
    pub fn new(link_up: bool, reachable: bool) -> Self {
        Self {
            link_up: AtomicBool::new(link_up),
            reachable: AtomicBool::new(reachable),
        }
    }

    pub fn online() -> Self {
        Self::new(true, true)
    }

    pub fn offline() -> Self {
        Self::new(false, false)
    }

    pub fn set_link_up(&self, link_up: bool) {
        self.link_up.store(link_up, Ordering::SeqCst);
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for ManualConnectivity {
    fn is_link_up(&self) -> bool {
        self.link_up.load(Ordering::SeqCst)
    }

    async fn can_reach_known_host(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_current_identity_first() {
        let provider = LocalIdentityProvider::new();
        let identity = provider.register_account("a@x.com", "pw", true);
        provider.set_current_identity(Some(identity.clone()));

        let mut sub = provider.subscribe();
        assert_eq!(sub.events.recv().await.unwrap(), Some(identity));
    }

    #[tokio::test]
    async fn test_signed_out_subscriber_receives_none() {
        let provider = LocalIdentityProvider::new();
        let mut sub = provider.subscribe();
        assert_eq!(sub.events.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_in_and_out_are_broadcast() {
        let provider = LocalIdentityProvider::new();
        provider.register_account("a@x.com", "pw", true);
        let mut sub = provider.subscribe();
        assert_eq!(sub.events.recv().await.unwrap(), None);

        let identity = provider
            .sign_in_with_password(" A@X.com ", "pw")
            .await
            .unwrap();
        assert_eq!(sub.events.recv().await.unwrap(), Some(identity));

        provider.sign_out().await.unwrap();
        assert_eq!(sub.events.recv().await.unwrap(), None);
        assert_eq!(provider.current_identity(), None);
    }

    #[tokio::test]
    async fn test_wrong_password_is_invalid_credentials() {
        let provider = LocalIdentityProvider::new();
        provider.register_account("a@x.com", "pw", true);

        let err = provider
            .sign_in_with_password("a@x.com", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials(_)));

        let err = provider
            .sign_in_with_password("unknown@x.com", "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials(_)));
    }

    #[tokio::test]
    async fn test_offline_sign_in_is_transient() {
        let provider = LocalIdentityProvider::new();
        provider.register_account("a@x.com", "pw", true);
        provider.set_offline(true);

        let err = provider
            .sign_in_with_password("a@x.com", "pw")
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_unsubscribe_tracks_live_subscriptions() {
        let provider = LocalIdentityProvider::new();
        let first = provider.subscribe();
        let second = provider.subscribe();
        assert_ne!(first.id, second.id);
        assert_eq!(provider.live_subscriptions(), 2);

        provider.unsubscribe(first.id);
        provider.unsubscribe(first.id);
        assert_eq!(provider.live_subscriptions(), 1);
    }

    #[test]
    fn test_dropped_receivers_are_pruned_on_broadcast() {
        let provider = LocalIdentityProvider::new();
        let sub = provider.subscribe();
        drop(sub);

        provider.set_current_identity(None);
        assert_eq!(provider.live_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_manual_connectivity() {
        let connectivity = ManualConnectivity::online();
        assert!(connectivity.is_link_up());
        assert!(connectivity.can_reach_known_host().await);

        connectivity.set_link_up(false);
        connectivity.set_reachable(false);
        assert!(!connectivity.is_link_up());
        assert!(!connectivity.can_reach_known_host().await);
    }
}
