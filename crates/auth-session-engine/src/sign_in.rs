//! Password sign-in guarded by the rate limiter.
//!
//! A successful verified sign-in starts the inactivity timer; credential
//! rejections count towards the lockout; transient provider failures do not.

use crate::ports::{AuthenticatedIdentity, IdentityProvider};
use crate::rate_limiter::RateLimiter;
use crate::session_timer::SessionTimer;
use crate::{IdentityError, SessionResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Result of a sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    SignedIn(AuthenticatedIdentity),
    /// Credentials were fine but the email is unverified; the user was signed
    /// back out.
    VerificationRequired { email: String },
    Rejected { attempts_remaining: u32 },
    LockedOut { retry_after: Duration },
    /// The provider could not be reached. Not counted as a failed attempt.
    Unavailable { reason: String },
}

impl SignInOutcome {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, SignInOutcome::SignedIn(_))
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            SignInOutcome::SignedIn(identity) => {
                format!("Signed in as {}.", identity.email)
            }
            SignInOutcome::VerificationRequired { email } => format!(
                "Please verify your email address ({email}) before signing in."
            ),
            SignInOutcome::Rejected { attempts_remaining } => format!(
                "Incorrect email or password. {} {} remaining.",
                attempts_remaining,
                if *attempts_remaining == 1 { "attempt" } else { "attempts" }
            ),
            SignInOutcome::LockedOut { retry_after } => {
                let minutes = minutes_rounded_up(*retry_after);
                format!(
                    "Too many failed attempts. Please try again in {} {}.",
                    minutes,
                    if minutes == 1 { "minute" } else { "minutes" }
                )
            }
            SignInOutcome::Unavailable { .. } => {
                "Unable to reach the sign-in service. Check your connection and try again."
                    .to_string()
            }
        }
    }
}

fn minutes_rounded_up(duration: Duration) -> u64 {
    duration.as_secs().div_ceil(60).max(1)
}

/// Sign-in / sign-out flow around an identity provider.
pub struct SignInFlow {
    identity: Arc<dyn IdentityProvider>,
    rate_limiter: Arc<RateLimiter>,
    session: Arc<SessionTimer>,
}

impl SignInFlow {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        rate_limiter: Arc<RateLimiter>,
        session: Arc<SessionTimer>,
    ) -> Self {
        Self {
            identity,
            rate_limiter,
            session,
        }
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn session(&self) -> &Arc<SessionTimer> {
        &self.session
    }

    /// Attempt a password sign-in. Must run inside a tokio runtime.
    pub async fn sign_in(&self, email: &str, password: &str) -> SignInOutcome {
        if self.rate_limiter.is_locked(email) {
            let retry_after = self.rate_limiter.remaining_lockout(email);
            warn!(
                retry_after_secs = retry_after.as_secs(),
                "sign-in blocked by lockout"
            );
            return SignInOutcome::LockedOut { retry_after };
        }

        match self
            .identity
            .sign_in_with_password(email.trim(), password)
            .await
        {
            Ok(identity) if identity.email_verified => {
                self.rate_limiter.clear(email);
                self.session.start();
                info!(uid = %identity.uid, "sign-in succeeded");
                SignInOutcome::SignedIn(identity)
            }
            Ok(identity) => {
                self.rate_limiter.clear(email);
                warn!(uid = %identity.uid, "sign-in with unverified email, signing out");
                if let Err(e) = self.identity.sign_out().await {
                    warn!(error = %e, "sign-out after unverified sign-in failed");
                }
                SignInOutcome::VerificationRequired {
                    email: identity.email,
                }
            }
            Err(IdentityError::InvalidCredentials(reason)) => {
                let failures = self.rate_limiter.record_failed_attempt(email);
                info!(failures, reason = %reason, "sign-in rejected");
                if self.rate_limiter.is_locked(email) {
                    SignInOutcome::LockedOut {
                        retry_after: self.rate_limiter.remaining_lockout(email),
                    }
                } else {
                    SignInOutcome::Rejected {
                        attempts_remaining: self.rate_limiter.attempts_remaining(email),
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "sign-in unavailable");
                SignInOutcome::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Stop the session timer and sign out with the provider.
    pub async fn sign_out(&self) -> SessionResult<()> {
        self.session.stop();
        self.identity.sign_out().await?;
        Ok(())
    }

    pub fn record_activity(&self) {
        self.session.record_activity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalIdentityProvider, RateLimitPolicy, SessionPolicy};

    const MINUTE: Duration = Duration::from_secs(60);

    fn flow() -> (SignInFlow, Arc<LocalIdentityProvider>) {
        let provider = Arc::new(LocalIdentityProvider::new());
        provider.register_account("ada@example.com", "correct", true);
        provider.register_account("new@example.com", "correct", false);
        let flow = SignInFlow::new(
            provider.clone(),
            Arc::new(RateLimiter::new(RateLimitPolicy::default())),
            Arc::new(SessionTimer::new(SessionPolicy::default())),
        );
        (flow, provider)
    }

    #[tokio::test(start_paused = true)]
    async fn verified_sign_in_starts_session() {
        let (flow, provider) = flow();

        let outcome = flow.sign_in("ada@example.com", "correct").await;
        assert!(outcome.is_signed_in());
        assert!(flow.session().is_running());
        assert!(provider.current_identity().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_password_counts_down_then_locks() {
        let (flow, _) = flow();

        for remaining in (1..=4).rev() {
            assert_eq!(
                flow.sign_in("ada@example.com", "wrong").await,
                SignInOutcome::Rejected {
                    attempts_remaining: remaining
                }
            );
        }

        let outcome = flow.sign_in(" ADA@example.com", "wrong").await;
        assert_eq!(outcome, SignInOutcome::LockedOut { retry_after: 15 * MINUTE });

        // Correct password is refused while locked.
        let outcome = flow.sign_in("ada@example.com", "correct").await;
        assert!(matches!(outcome, SignInOutcome::LockedOut { .. }));
        assert!(!flow.session().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn lockout_expires() {
        let (flow, _) = flow();
        for _ in 0..5 {
            flow.sign_in("ada@example.com", "wrong").await;
        }

        tokio::time::sleep(15 * MINUTE).await;
        assert!(flow.sign_in("ada@example.com", "correct").await.is_signed_in());
        assert_eq!(flow.rate_limiter().failed_attempts("ada@example.com"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn success_clears_failures() {
        let (flow, _) = flow();
        flow.sign_in("ada@example.com", "wrong").await;
        flow.sign_in("ada@example.com", "wrong").await;

        assert!(flow.sign_in("ada@example.com", "correct").await.is_signed_in());
        assert_eq!(flow.rate_limiter().failed_attempts("ada@example.com"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unverified_sign_in_is_signed_back_out() {
        let (flow, provider) = flow();

        let outcome = flow.sign_in("new@example.com", "correct").await;
        assert_eq!(
            outcome,
            SignInOutcome::VerificationRequired {
                email: "new@example.com".to_string()
            }
        );
        assert_eq!(provider.current_identity(), None);
        assert!(!flow.session().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_not_counted() {
        let (flow, provider) = flow();
        provider.set_offline(true);

        for _ in 0..10 {
            let outcome = flow.sign_in("ada@example.com", "wrong").await;
            assert!(matches!(outcome, SignInOutcome::Unavailable { .. }));
        }
        assert_eq!(flow.rate_limiter().failed_attempts("ada@example.com"), 0);
        assert!(!flow.rate_limiter().is_locked("ada@example.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn sign_out_stops_session() {
        let (flow, provider) = flow();
        flow.sign_in("ada@example.com", "correct").await;

        flow.sign_out().await.unwrap();
        assert!(!flow.session().is_running());
        assert_eq!(provider.current_identity(), None);
    }

    #[test]
    fn user_messages() {
        assert_eq!(
            SignInOutcome::Rejected {
                attempts_remaining: 1
            }
            .user_message(),
            "Incorrect email or password. 1 attempt remaining."
        );
        assert_eq!(
            SignInOutcome::LockedOut {
                retry_after: Duration::from_secs(14 * 60 + 1)
            }
            .user_message(),
            "Too many failed attempts. Please try again in 15 minutes."
        );
        assert_eq!(
            SignInOutcome::LockedOut {
                retry_after: Duration::from_secs(5)
            }
            .user_message(),
            "Too many failed attempts. Please try again in 1 minute."
        );
    }
}
