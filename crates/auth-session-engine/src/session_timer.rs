//! Inactivity session timeout.
//!
//! A session is expired once `timeout` has passed since the last recorded
//! activity. While running, a background tick checks for expiry every
//! `poll_interval` and invokes the registered callback.

use parking_lot::Mutex;
use shipaction_config_and_utils::{Config, ExpiryNotificationSetting};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Callback invoked from the tick task when the session has expired.
pub type ExpiredCallback = Arc<dyn Fn() + Send + Sync>;

/// How often the expired callback fires while the session stays expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryNotification {
    /// Once per expiry. Re-armed by `start` or `record_activity`.
    #[default]
    Once,
    /// On every tick while expired.
    EveryTick,
}

impl From<ExpiryNotificationSetting> for ExpiryNotification {
    fn from(setting: ExpiryNotificationSetting) -> Self {
        match setting {
            ExpiryNotificationSetting::Once => ExpiryNotification::Once,
            ExpiryNotificationSetting::EveryTick => ExpiryNotification::EveryTick,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub notification: ExpiryNotification,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SESSION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            notification: ExpiryNotification::default(),
        }
    }
}

impl From<&Config> for SessionPolicy {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.session_timeout(),
            poll_interval: config.session_poll_interval(),
            notification: config.session_expiry_notification.into(),
        }
    }
}

struct TimerInner {
    policy: SessionPolicy,
    last_activity: Mutex<Instant>,
    notified: AtomicBool,
    on_expired: Mutex<Option<ExpiredCallback>>,
}

impl TimerInner {
    fn is_expired(&self) -> bool {
        self.last_activity.lock().elapsed() >= self.policy.timeout
    }

    fn on_tick(&self) {
        if !self.is_expired() {
            return;
        }

        if self.policy.notification == ExpiryNotification::Once
            && self.notified.swap(true, Ordering::SeqCst)
        {
            return;
        }

        info!(
            timeout_secs = self.policy.timeout.as_secs(),
            "session expired due to inactivity"
        );

        // Never hold the lock while running user code.
        let callback = self.on_expired.lock().clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// Tracks user activity and reports inactivity expiry.
///
/// `start` must be called from within a tokio runtime. Dropping the timer
/// stops the tick.
pub struct SessionTimer {
    inner: Arc<TimerInner>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new(SessionPolicy::default())
    }
}

impl SessionTimer {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                policy,
                last_activity: Mutex::new(Instant::now()),
                notified: AtomicBool::new(false),
                on_expired: Mutex::new(None),
            }),
            ticker: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.inner.policy
    }

    /// Register the callback run when the session expires.
    pub fn set_on_expired(&self, callback: ExpiredCallback) {
        *self.inner.on_expired.lock() = Some(callback);
    }

    /// Reset the activity clock and (re)start the tick.
    pub fn start(&self) {
        self.stop();
        self.record_activity();

        let period = self.inner.policy.poll_interval;
        let handle = tokio::spawn(run_ticker(Arc::downgrade(&self.inner), period));
        *self.ticker.lock() = Some(handle);

        debug!(
            timeout_secs = self.inner.policy.timeout.as_secs(),
            poll_secs = period.as_secs(),
            "session timer started"
        );
    }

    /// Cancel the tick. No-op when already stopped.
    pub fn stop(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
            debug!("session timer stopped");
        }
    }

    pub fn record_activity(&self) {
        *self.inner.last_activity.lock() = Instant::now();
        self.inner.notified.store(false, Ordering::SeqCst);
    }

    pub fn is_expired(&self) -> bool {
        self.inner.is_expired()
    }

    pub fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}

async fn run_ticker(inner: Weak<TimerInner>, period: Duration) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.on_tick();
    }
}
