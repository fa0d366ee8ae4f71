//! Startup and session core for the ShipAction client.
//!
//! This crate provides:
//! - Top-level navigation state (onboarding vs. main flow)
//! - An explicit FSM-driven startup sequencer that listens to auth state,
//!   gates on email verification and picks the initial flow
//! - Failed-login rate limiting with timed lockout
//! - An inactivity session timer
//! - The sign-in flow tying the limiter and timer to an identity provider
//! - In-process identity and connectivity collaborators

mod error;
mod local;
mod navigation;
mod ports;
mod rate_limiter;
mod reachability;
mod sequencer;
mod session_timer;
mod sign_in;
mod startup_fsm;

pub use error::{IdentityError, SessionError, SessionResult};
pub use local::{LocalIdentityProvider, ManualConnectivity};
pub use navigation::{NavigationFlow, NavigationState};
pub use ports::{
    AuthEvent, AuthSubscription, AuthenticatedIdentity, ConnectivityProbe, IdentityProvider,
    SubscriptionId, UserRepository,
};
pub use rate_limiter::{FailedAttemptRecord, RateLimitPolicy, RateLimiter};
pub use reachability::TcpReachabilityProbe;
pub use sequencer::{StartupConfig, StartupSequencer};
pub use session_timer::{ExpiredCallback, ExpiryNotification, SessionPolicy, SessionTimer};
pub use sign_in::{SignInFlow, SignInOutcome};
pub use startup_fsm::startup_machine;
pub use startup_fsm::{StartupMachine, StartupMachineInput, StartupMachineState, StartupState};
