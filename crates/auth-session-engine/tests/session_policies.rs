//! Lockout and inactivity policies driven through the public API.

use auth_session_engine::{
    ExpiryNotification, LocalIdentityProvider, RateLimitPolicy, RateLimiter, SessionPolicy,
    SessionTimer, SignInFlow, SignInOutcome,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const MINUTE: Duration = Duration::from_secs(60);

#[tokio::test(start_paused = true)]
async fn fifth_failure_locks_normalized_identifier() {
    let limiter = RateLimiter::new(RateLimitPolicy::default());

    for _ in 0..4 {
        limiter.record_failed_attempt("User@Example.com ");
    }
    assert!(!limiter.is_locked("user@example.com"));
    assert_eq!(limiter.attempts_remaining("USER@example.com"), 1);

    limiter.record_failed_attempt("  user@EXAMPLE.com");
    assert!(limiter.is_locked("user@example.com"));
    assert_eq!(limiter.remaining_lockout("user@example.com"), 15 * MINUTE);
}

#[tokio::test(start_paused = true)]
async fn lockout_round_trip() {
    let limiter = RateLimiter::new(RateLimitPolicy::default());
    for _ in 0..5 {
        limiter.record_failed_attempt("a@x.com");
    }

    sleep(10 * MINUTE).await;
    assert!(limiter.is_locked("a@x.com"));
    assert_eq!(limiter.remaining_lockout("a@x.com"), 5 * MINUTE);

    sleep(5 * MINUTE).await;
    assert!(!limiter.is_locked("a@x.com"));
    assert_eq!(limiter.failed_attempts("a@x.com"), 0);
    assert_eq!(limiter.remaining_lockout("a@x.com"), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn session_expires_and_activity_resets() {
    let timer = SessionTimer::new(SessionPolicy {
        notification: ExpiryNotification::Once,
        ..SessionPolicy::default()
    });
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    timer.set_on_expired(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    timer.start();
    sleep(15 * MINUTE).await;
    timer.record_activity();
    sleep(29 * MINUTE + Duration::from_secs(30)).await;
    assert!(!timer.is_expired());
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    sleep(MINUTE).await;
    assert!(timer.is_expired());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn sign_in_flow_locks_and_reports_minutes() {
    let provider = Arc::new(LocalIdentityProvider::new());
    provider.register_account("ada@example.com", "correct", true);
    let flow = SignInFlow::new(
        provider,
        Arc::new(RateLimiter::new(RateLimitPolicy::default())),
        Arc::new(SessionTimer::new(SessionPolicy::default())),
    );

    for _ in 0..5 {
        flow.sign_in("ada@example.com", "wrong").await;
    }

    sleep(90 * Duration::from_secs(1)).await;
    let outcome = flow.sign_in("ada@example.com", "correct").await;
    assert!(matches!(outcome, SignInOutcome::LockedOut { .. }));
    assert_eq!(
        outcome.user_message(),
        "Too many failed attempts. Please try again in 14 minutes."
    );
}
