//! Startup sequencing.
//!
//! `StartupSequencer` drives the startup FSM: splash, then a single auth
//! subscription whose events pick the top-level flow. Email verification is
//! checked before connectivity, and any storage or identity failure on the
//! signed-in path falls back to onboarding.
//!
//! Every `perform_startup` bumps a generation counter. The previous
//! subscription is cancelled and any late event it still delivers is rejected,
//! so only the newest subscription can change state.

use crate::navigation::{NavigationFlow, NavigationState};
use crate::ports::{
    AuthEvent, AuthenticatedIdentity, ConnectivityProbe, IdentityProvider, SubscriptionId,
    UserRepository,
};
use crate::startup_fsm::{StartupMachine, StartupMachineInput, StartupState};
use crate::{SessionError, SessionResult};
use chrono::Utc;
use parking_lot::Mutex;
use shipaction_config_and_utils::Config;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const DEFAULT_SPLASH_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupConfig {
    /// Minimum time the splash stays up.
    pub splash_delay: Duration,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            splash_delay: DEFAULT_SPLASH_DELAY,
        }
    }
}

impl From<&Config> for StartupConfig {
    fn from(config: &Config) -> Self {
        Self {
            splash_delay: config.splash_delay(),
        }
    }
}

/// Owns a live auth subscription. Dropping it stops the listener task and
/// unsubscribes from the provider.
struct SubscriptionGuard {
    id: SubscriptionId,
    provider: Arc<dyn IdentityProvider>,
    task: JoinHandle<()>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.task.abort();
        self.provider.unsubscribe(self.id);
        debug!(subscription_id = self.id, "auth subscription cancelled");
    }
}

struct Inner {
    config: StartupConfig,
    navigation: Arc<NavigationState>,
    users: Arc<dyn UserRepository>,
    connectivity: Arc<dyn ConnectivityProbe>,
    identity: Arc<dyn IdentityProvider>,
    /// Internal FSM. Transitions and generation bumps happen under this lock.
    fsm: Mutex<StartupMachine>,
    state_tx: watch::Sender<StartupState>,
    listener: Mutex<Option<SubscriptionGuard>>,
    probe_task: Mutex<Option<JoinHandle<()>>>,
    generation: AtomicU64,
    last_reachability: Mutex<Option<bool>>,
}

/// Sequences app startup and selects the initial navigation flow.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct StartupSequencer {
    inner: Arc<Inner>,
}

impl StartupSequencer {
    pub fn new(
        config: StartupConfig,
        navigation: Arc<NavigationState>,
        users: Arc<dyn UserRepository>,
        connectivity: Arc<dyn ConnectivityProbe>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let (state_tx, _) = watch::channel(StartupState::Initializing);
        Self {
            inner: Arc::new(Inner {
                config,
                navigation,
                users,
                connectivity,
                identity,
                fsm: Mutex::new(StartupMachine::new()),
                state_tx,
                listener: Mutex::new(None),
                probe_task: Mutex::new(None),
                generation: AtomicU64::new(0),
                last_reachability: Mutex::new(None),
            }),
        }
    }

    /// Run (or re-run) startup.
    ///
    /// Returns once the splash delay has elapsed and the auth subscription is
    /// live; settling happens as auth events arrive. A newer call supersedes
    /// this one, including while it is still waiting on the splash.
    pub async fn perform_startup(&self) {
        let generation = self.inner.restart();
        info!(generation, "startup sequence started");

        tokio::time::sleep(self.inner.config.splash_delay).await;

        if !self.inner.is_current(generation) {
            debug!(generation, "startup superseded during splash");
            return;
        }

        if !self
            .inner
            .settle(generation, StartupMachineInput::SplashElapsed)
        {
            return;
        }
        self.inner.navigation.set_loading(true);

        self.inner.spawn_reachability_probe(generation);
        self.inner.install_listener(generation);
    }

    /// React to a connectivity change notification.
    ///
    /// Restores from `NoInternet` by re-running startup. Losing the link while
    /// on the main flow keeps the user there.
    pub async fn handle_connectivity_change(&self) {
        let link_up = self.inner.connectivity.is_link_up();
        let state = self.current_state();

        match (state, link_up) {
            (StartupState::NoInternet, true) => {
                info!("connectivity restored, re-running startup");
                self.perform_startup().await;
            }
            (StartupState::Ready(NavigationFlow::Main), false) => {
                info!("connectivity lost, staying on main flow");
            }
            _ => {
                debug!(state = %state, link_up, "connectivity change ignored");
            }
        }
    }

    pub fn current_state(&self) -> StartupState {
        *self.inner.state_tx.borrow()
    }

    /// Watch startup state changes. The receiver starts at the current state.
    pub fn subscribe_state(&self) -> watch::Receiver<StartupState> {
        self.inner.state_tx.subscribe()
    }

    /// Result of the most recent background reachability probe, if finished.
    pub fn last_reachability(&self) -> Option<bool> {
        *self.inner.last_reachability.lock()
    }

    pub fn navigation(&self) -> &Arc<NavigationState> {
        &self.inner.navigation
    }

    /// Cancel the auth subscription and background probe.
    ///
    /// State is left where it is; `perform_startup` may be called again.
    pub fn shutdown(&self) {
        let guard = {
            let mut listener = self.inner.listener.lock();
            let _fsm = self.inner.fsm.lock();
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            listener.take()
        };
        drop(guard);
        self.inner.abort_probe();
        self.inner.navigation.set_loading(false);
        info!("startup sequencer shut down");
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Start a new generation: cancel the old subscription and probe, and
    /// return the FSM to `Initializing`.
    fn restart(&self) -> u64 {
        let (generation, previous) = {
            let mut listener = self.listener.lock();
            let mut fsm = self.fsm.lock();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if let Err(e) = self.transition(&mut fsm, &StartupMachineInput::Restart) {
                error!(error = %e, "failed to reset startup state");
            }
            (generation, listener.take())
        };
        drop(previous);
        self.abort_probe();
        generation
    }

    /// Apply `input` if `generation` is still current. Returns whether it was
    /// applied.
    fn settle(&self, generation: u64, input: StartupMachineInput) -> bool {
        let mut fsm = self.fsm.lock();
        if !self.is_current(generation) {
            debug!(generation, input = ?input, "dropping stale startup input");
            return false;
        }

        let new_state = match self.transition(&mut fsm, &input) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "startup transition rejected");
                return false;
            }
        };

        match new_state {
            StartupState::Ready(NavigationFlow::Main) => self.navigation.navigate_to_main(),
            StartupState::Ready(NavigationFlow::Onboarding) => {
                self.navigation.navigate_to_onboarding()
            }
            _ => {}
        }
        if new_state.is_settled() {
            self.navigation.set_loading(false);
        }
        true
    }

    /// Transition the FSM and publish the new state if it changed.
    fn transition(
        &self,
        fsm: &mut StartupMachine,
        input: &StartupMachineInput,
    ) -> SessionResult<StartupState> {
        let old_state = StartupState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            SessionError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = StartupState::from(fsm.state());
        if old_state != new_state {
            debug!(
                old_state = %old_state,
                new_state = %new_state,
                "Startup state transition"
            );
            self.state_tx.send_replace(new_state);
        }

        Ok(new_state)
    }

    fn install_listener(self: &Arc<Self>, generation: u64) {
        let mut listener = self.listener.lock();
        if !self.is_current(generation) {
            return;
        }

        let subscription = self.identity.subscribe();
        let task = tokio::spawn(listen(
            Arc::downgrade(self),
            generation,
            subscription.events,
        ));
        debug!(
            subscription_id = subscription.id,
            generation, "listening for auth state"
        );

        // Replacing an existing guard cancels it.
        *listener = Some(SubscriptionGuard {
            id: subscription.id,
            provider: self.identity.clone(),
            task,
        });
    }

    fn spawn_reachability_probe(self: &Arc<Self>, generation: u64) {
        let connectivity = self.connectivity.clone();
        let inner = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            let reachable = connectivity.can_reach_known_host().await;
            if reachable {
                debug!("known host reachable");
            } else {
                warn!("known host unreachable, continuing startup");
            }

            if let Some(inner) = inner.upgrade() {
                if inner.is_current(generation) {
                    *inner.last_reachability.lock() = Some(reachable);
                }
            }
        });

        if let Some(previous) = self.probe_task.lock().replace(task) {
            previous.abort();
        }
    }

    fn abort_probe(&self) {
        if let Some(task) = self.probe_task.lock().take() {
            task.abort();
        }
    }

    async fn handle_auth_event(&self, generation: u64, event: AuthEvent) {
        let input = match event {
            None => {
                info!("no authenticated user, showing onboarding");
                self.clear_user_data();
                StartupMachineInput::SignedOut
            }
            Some(identity) if !identity.email_verified => {
                warn!(uid = %identity.uid, "email not verified, signing out");
                self.sign_out().await;
                self.clear_user_data();
                StartupMachineInput::Unverified
            }
            Some(identity) => self.handle_verified(&identity).await,
        };

        self.settle(generation, input);
    }

    async fn handle_verified(&self, identity: &AuthenticatedIdentity) -> StartupMachineInput {
        let record = identity.to_user_record(Utc::now());
        if let Err(e) = self.users.save_user(&record) {
            error!(uid = %identity.uid, error = %e, "failed to persist user, signing out");
            self.sign_out().await;
            self.clear_user_data();
            return StartupMachineInput::PersistFailed;
        }

        if self.connectivity.is_link_up() {
            info!(uid = %identity.uid, "user verified, entering main flow");
            StartupMachineInput::SignedInOnline
        } else {
            warn!(uid = %identity.uid, "user verified but network link is down");
            StartupMachineInput::SignedInOffline
        }
    }

    async fn sign_out(&self) {
        if let Err(e) = self.identity.sign_out().await {
            warn!(error = %e, "sign-out failed");
        }
    }

    fn clear_user_data(&self) {
        if let Err(e) = self.users.clear_user_data() {
            warn!(error = %e, "failed to clear stored user data");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.probe_task.get_mut().take() {
            task.abort();
        }
    }
}

/// Process auth events one at a time, in delivery order, for one generation.
async fn listen(
    inner: Weak<Inner>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<AuthEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !inner.is_current(generation) {
            break;
        }
        inner.handle_auth_event(generation, event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalIdentityProvider, ManualConnectivity};
    use shipaction_storage::{MemoryStore, UserDefaults};

    struct Harness {
        sequencer: StartupSequencer,
        identity: Arc<LocalIdentityProvider>,
        connectivity: Arc<ManualConnectivity>,
        users: Arc<UserDefaults>,
    }

    fn harness(link_up: bool) -> Harness {
        let identity = Arc::new(LocalIdentityProvider::new());
        let connectivity = Arc::new(ManualConnectivity::new(link_up, link_up));
        let users = Arc::new(UserDefaults::new(Box::new(MemoryStore::new())));
        let sequencer = StartupSequencer::new(
            StartupConfig::default(),
            Arc::new(NavigationState::new()),
            users.clone(),
            connectivity.clone(),
            identity.clone(),
        );
        Harness {
            sequencer,
            identity,
            connectivity,
            users,
        }
    }

    async fn settled(sequencer: &StartupSequencer) -> StartupState {
        let mut rx = sequencer.subscribe_state();
        let state = *rx.wait_for(|state| state.is_settled()).await.unwrap();
        state
    }

    #[tokio::test(start_paused = true)]
    async fn splash_precedes_loading() {
        let h = harness(true);
        assert_eq!(h.sequencer.current_state(), StartupState::Initializing);

        let sequencer = h.sequencer.clone();
        let mut rx = sequencer.subscribe_state();
        let run = tokio::spawn(async move { sequencer.perform_startup().await });

        tokio::time::sleep(Duration::from_millis(1_900)).await;
        assert_eq!(h.sequencer.current_state(), StartupState::Initializing);
        assert_eq!(h.identity.live_subscriptions(), 0);

        run.await.unwrap();
        rx.wait_for(|state| *state != StartupState::Initializing)
            .await
            .unwrap();
        assert_eq!(h.identity.live_subscriptions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn signed_out_goes_to_onboarding() {
        let h = harness(true);
        h.users
            .save_user(
                &AuthenticatedIdentity {
                    uid: "stale".to_string(),
                    email: "old@x.com".to_string(),
                    email_verified: true,
                    display_name: None,
                }
                .to_user_record(Utc::now()),
            )
            .unwrap();

        h.sequencer.perform_startup().await;

        assert_eq!(
            settled(&h.sequencer).await,
            StartupState::Ready(NavigationFlow::Onboarding)
        );
        assert_eq!(h.users.load_user().unwrap(), None);
        assert_eq!(h.sequencer.navigation().current(), NavigationFlow::Onboarding);
        assert!(!h.sequencer.navigation().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn verified_online_goes_to_main() {
        let h = harness(true);
        let identity = h.identity.register_account("a@x.com", "pw", true);
        h.identity.set_current_identity(Some(identity.clone()));

        h.sequencer.perform_startup().await;

        assert_eq!(
            settled(&h.sequencer).await,
            StartupState::Ready(NavigationFlow::Main)
        );
        assert_eq!(h.sequencer.navigation().current(), NavigationFlow::Main);
        assert_eq!(h.users.load_user().unwrap().unwrap().uid, identity.uid);
    }

    #[tokio::test(start_paused = true)]
    async fn verified_offline_leaves_flow_untouched() {
        let h = harness(false);
        let identity = h.identity.register_account("a@x.com", "pw", true);
        h.identity.set_current_identity(Some(identity));

        h.sequencer.perform_startup().await;

        assert_eq!(settled(&h.sequencer).await, StartupState::NoInternet);
        assert_eq!(h.sequencer.navigation().current(), NavigationFlow::Onboarding);
    }

    #[tokio::test(start_paused = true)]
    async fn reachability_result_is_recorded_without_changing_state() {
        let h = harness(true);
        h.connectivity.set_reachable(false);
        let identity = h.identity.register_account("a@x.com", "pw", true);
        h.identity.set_current_identity(Some(identity));

        h.sequencer.perform_startup().await;
        assert_eq!(
            settled(&h.sequencer).await,
            StartupState::Ready(NavigationFlow::Main)
        );

        for _ in 0..10 {
            if h.sequencer.last_reachability().is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(h.sequencer.last_reachability(), Some(false));
        assert_eq!(
            h.sequencer.current_state(),
            StartupState::Ready(NavigationFlow::Main)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn later_sign_out_returns_to_onboarding() {
        let h = harness(true);
        let identity = h.identity.register_account("a@x.com", "pw", true);
        h.identity.set_current_identity(Some(identity));

        h.sequencer.perform_startup().await;
        assert_eq!(
            settled(&h.sequencer).await,
            StartupState::Ready(NavigationFlow::Main)
        );

        let mut rx = h.sequencer.subscribe_state();
        h.identity.sign_out().await.unwrap();
        rx.wait_for(|state| *state == StartupState::Ready(NavigationFlow::Onboarding))
            .await
            .unwrap();
        assert_eq!(h.sequencer.navigation().current(), NavigationFlow::Onboarding);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_subscription() {
        let h = harness(true);
        h.sequencer.perform_startup().await;
        settled(&h.sequencer).await;
        assert_eq!(h.identity.live_subscriptions(), 1);

        h.sequencer.shutdown();
        assert_eq!(h.identity.live_subscriptions(), 0);

        // Events after shutdown do not reach the sequencer.
        let identity = h.identity.register_account("a@x.com", "pw", true);
        h.identity.set_current_identity(Some(identity));
        tokio::task::yield_now().await;
        assert_eq!(
            h.sequencer.current_state(),
            StartupState::Ready(NavigationFlow::Onboarding)
        );
    }

    #[test]
    fn startup_config_from_config() {
        let mut config = Config::default();
        config.splash_delay_ms = 250;
        assert_eq!(
            StartupConfig::from(&config).splash_delay,
            Duration::from_millis(250)
        );
    }
}
