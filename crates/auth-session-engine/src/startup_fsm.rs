//! Startup state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │  Initializing   │ (initial, splash)
//! └────────┬────────┘
//!          │ SplashElapsed
//!          ▼
//! ┌─────────────────┐  SignedOut / Unverified / PersistFailed  ┌──────────────────┐
//! │ LoadingUserData │ ───────────────────────────────────────► │ ReadyOnboarding  │
//! └────────┬────────┘                                          └──────────────────┘
//!          │ SignedInOnline ──► ReadyMain
//!          │ SignedInOffline ─► NoInternet
//!          ▼
//!   settled states accept every auth outcome again,
//!   any state --Restart--> Initializing
//! ```

use crate::NavigationFlow;
use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::fmt;

// Generates `startup_machine::{State, Input, StateMachine}`.
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub startup_machine(Initializing)

    Initializing => {
        SplashElapsed => LoadingUserData,
        Restart => Initializing
    },
    LoadingUserData => {
        SignedOut => ReadyOnboarding,
        Unverified => ReadyOnboarding,
        PersistFailed => ReadyOnboarding,
        SignedInOnline => ReadyMain,
        SignedInOffline => NoInternet,
        Restart => Initializing
    },
    ReadyOnboarding => {
        SignedOut => ReadyOnboarding,
        Unverified => ReadyOnboarding,
        PersistFailed => ReadyOnboarding,
        SignedInOnline => ReadyMain,
        SignedInOffline => NoInternet,
        Restart => Initializing
    },
    ReadyMain => {
        SignedOut => ReadyOnboarding,
        Unverified => ReadyOnboarding,
        PersistFailed => ReadyOnboarding,
        SignedInOnline => ReadyMain,
        SignedInOffline => NoInternet,
        Restart => Initializing
    },
    NoInternet => {
        SignedOut => ReadyOnboarding,
        Unverified => ReadyOnboarding,
        PersistFailed => ReadyOnboarding,
        SignedInOnline => ReadyMain,
        SignedInOffline => NoInternet,
        Restart => Initializing
    }
}

pub use startup_machine::Input as StartupMachineInput;
pub use startup_machine::State as StartupMachineState;
pub use startup_machine::StateMachine as StartupMachine;

/// Startup state as seen by the rest of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupState {
    /// Splash is showing.
    Initializing,
    /// Waiting for the first auth-state event.
    LoadingUserData,
    /// Reserved for a blocking connectivity check. The sequencer's probe runs
    /// in the background and never enters this state.
    CheckingConnectivity,
    /// Startup finished with the given top-level flow.
    Ready(NavigationFlow),
    /// Signed in but the network link is down.
    NoInternet,
}

impl StartupState {
    /// `Ready` and `NoInternet` are the only settled states.
    pub fn is_settled(&self) -> bool {
        matches!(self, StartupState::Ready(_) | StartupState::NoInternet)
    }

    pub fn is_transient(&self) -> bool {
        !self.is_settled()
    }
}

impl fmt::Display for StartupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupState::Initializing => write!(f, "initializing"),
            StartupState::LoadingUserData => write!(f, "loading_user_data"),
            StartupState::CheckingConnectivity => write!(f, "checking_connectivity"),
            StartupState::Ready(flow) => write!(f, "ready({flow})"),
            StartupState::NoInternet => write!(f, "no_internet"),
        }
    }
}

impl From<&StartupMachineState> for StartupState {
    fn from(state: &StartupMachineState) -> Self {
        match state {
            StartupMachineState::Initializing => StartupState::Initializing,
            StartupMachineState::LoadingUserData => StartupState::LoadingUserData,
            StartupMachineState::ReadyOnboarding => StartupState::Ready(NavigationFlow::Onboarding),
            StartupMachineState::ReadyMain => StartupState::Ready(NavigationFlow::Main),
            StartupMachineState::NoInternet => StartupState::NoInternet,
        }
    }
}
