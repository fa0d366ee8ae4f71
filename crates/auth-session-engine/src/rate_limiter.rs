//! Failed-login rate limiting with timed lockout.
//!
//! Counters are keyed by the normalized identifier (trimmed, lowercased) so
//! `" Ada@Example.com "` and `"ada@example.com"` share one record. State is
//! in memory only.

use parking_lot::Mutex;
use shipaction_config_and_utils::Config;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;
const DEFAULT_LOCKOUT_DURATION: Duration = Duration::from_secs(15 * 60);

/// Lockout thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_failed_attempts: u32,
    pub lockout_duration: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            lockout_duration: DEFAULT_LOCKOUT_DURATION,
        }
    }
}

impl From<&Config> for RateLimitPolicy {
    fn from(config: &Config) -> Self {
        Self {
            max_failed_attempts: config.max_failed_attempts,
            lockout_duration: config.lockout_duration(),
        }
    }
}

/// Per-identifier failure state.
///
/// `locked_at` is set iff `count` reached the threshold since the last clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttemptRecord {
    pub count: u32,
    pub locked_at: Option<Instant>,
}

/// Tracks consecutive failed logins per identifier.
#[derive(Debug, Default)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    records: Mutex<HashMap<String, FailedAttemptRecord>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Record one failed attempt and return the new consecutive count.
    ///
    /// The count is not clamped; the lockout is stamped the moment it reaches
    /// the threshold.
    pub fn record_failed_attempt(&self, identifier: &str) -> u32 {
        self.record_failed_attempt_at(identifier, Instant::now())
    }

    pub fn record_failed_attempt_at(&self, identifier: &str, now: Instant) -> u32 {
        let key = normalize(identifier);
        let mut records = self.records.lock();
        let record = records.entry(key).or_insert(FailedAttemptRecord {
            count: 0,
            locked_at: None,
        });

        record.count = record.count.saturating_add(1);
        if record.count >= self.policy.max_failed_attempts && record.locked_at.is_none() {
            record.locked_at = Some(now);
            warn!(
                failed_attempts = record.count,
                lockout_secs = self.policy.lockout_duration.as_secs(),
                "identifier locked out after repeated failed logins"
            );
        } else {
            debug!(failed_attempts = record.count, "failed login recorded");
        }

        record.count
    }

    /// Whether the identifier is currently locked out.
    ///
    /// Not a pure read: once the lockout has run its course the record is
    /// removed, so the counter starts from zero again.
    pub fn is_locked(&self, identifier: &str) -> bool {
        self.is_locked_at(identifier, Instant::now())
    }

    pub fn is_locked_at(&self, identifier: &str, now: Instant) -> bool {
        let key = normalize(identifier);
        let mut records = self.records.lock();

        let Some(locked_at) = records.get(&key).and_then(|record| record.locked_at) else {
            return false;
        };

        if now.saturating_duration_since(locked_at) >= self.policy.lockout_duration {
            records.remove(&key);
            info!("lockout expired, failed attempts reset");
            return false;
        }

        true
    }

    /// Time left on the lockout; zero when not locked.
    pub fn remaining_lockout(&self, identifier: &str) -> Duration {
        self.remaining_lockout_at(identifier, Instant::now())
    }

    pub fn remaining_lockout_at(&self, identifier: &str, now: Instant) -> Duration {
        let key = normalize(identifier);
        self.records
            .lock()
            .get(&key)
            .and_then(|record| record.locked_at)
            .map(|locked_at| {
                self.policy
                    .lockout_duration
                    .saturating_sub(now.saturating_duration_since(locked_at))
            })
            .unwrap_or(Duration::ZERO)
    }

    /// Forget all failures for the identifier.
    pub fn clear(&self, identifier: &str) {
        self.records.lock().remove(&normalize(identifier));
    }

    pub fn failed_attempts(&self, identifier: &str) -> u32 {
        self.records
            .lock()
            .get(&normalize(identifier))
            .map_or(0, |record| record.count)
    }

    /// Failures left before a lockout.
    pub fn attempts_remaining(&self, identifier: &str) -> u32 {
        self.policy
            .max_failed_attempts
            .saturating_sub(self.failed_attempts(identifier))
    }

    pub fn record(&self, identifier: &str) -> Option<FailedAttemptRecord> {
        self.records.lock().get(&normalize(identifier)).copied()
    }
}

fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}
