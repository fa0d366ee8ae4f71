//! Top-level navigation state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::info;

/// The two top-level flows of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationFlow {
    #[default]
    Onboarding,
    Main,
}

impl fmt::Display for NavigationFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationFlow::Onboarding => write!(f, "onboarding"),
            NavigationFlow::Main => write!(f, "main"),
        }
    }
}

/// Holds the current top-level flow and notifies observers when it changes.
///
/// Starts in [`NavigationFlow::Onboarding`]. The loading flag is advisory and
/// never affects the flow.
#[derive(Debug)]
pub struct NavigationState {
    flow: watch::Sender<NavigationFlow>,
    loading: AtomicBool,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationState {
    pub fn new() -> Self {
        let (flow, _) = watch::channel(NavigationFlow::Onboarding);
        Self {
            flow,
            loading: AtomicBool::new(false),
        }
    }

    pub fn navigate_to_main(&self) {
        self.set_flow(NavigationFlow::Main);
    }

    pub fn navigate_to_onboarding(&self) {
        self.set_flow(NavigationFlow::Onboarding);
    }

    pub fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> NavigationFlow {
        *self.flow.borrow()
    }

    /// Watch flow changes. The receiver starts at the current flow.
    pub fn subscribe(&self) -> watch::Receiver<NavigationFlow> {
        self.flow.subscribe()
    }

    fn set_flow(&self, next: NavigationFlow) {
        let previous = self.flow.send_replace(next);
        if previous != next {
            info!(from = %previous, to = %next, "navigation flow changed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let nav = NavigationState::new();
        assert_eq!(nav.current(), NavigationFlow::Onboarding);
        assert!(!nav.is_loading());
    }

    #[test]
    fn test_navigate_between_flows() {
        let nav = NavigationState::new();
        nav.navigate_to_main();
        assert_eq!(nav.current(), NavigationFlow::Main);
        nav.navigate_to_onboarding();
        assert_eq!(nav.current(), NavigationFlow::Onboarding);
    }

    #[test]
    fn test_loading_flag_does_not_touch_flow() {
        let nav = NavigationState::new();
        nav.navigate_to_main();
        nav.set_loading(true);
        assert!(nav.is_loading());
        assert_eq!(nav.current(), NavigationFlow::Main);
        nav.set_loading(false);
        assert!(!nav.is_loading());
        assert_eq!(nav.current(), NavigationFlow::Main);
    }

    #[tokio::test]
    async fn test_observers_are_notified() {
        let nav = NavigationState::new();
        let mut rx = nav.subscribe();
        assert_eq!(*rx.borrow_and_update(), NavigationFlow::Onboarding);

        nav.navigate_to_main();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), NavigationFlow::Main);
    }
}
