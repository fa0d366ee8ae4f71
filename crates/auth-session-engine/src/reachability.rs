//! TCP-based reachability probe.

use crate::ConnectivityProbe;
use async_trait::async_trait;
use shipaction_config_and_utils::Config;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Answers "can reach a known host" by opening a TCP connection to it.
///
/// The link flag has no OS source here; it is whatever the owner last set
/// (initially up).
#[derive(Debug)]
pub struct TcpReachabilityProbe {
    host: String,
    timeout: Duration,
    link_up: AtomicBool,
}

impl TcpReachabilityProbe {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            timeout,
            link_up: AtomicBool::new(true),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.reachability_host.clone(), config.reachability_timeout())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn set_link_up(&self, link_up: bool) {
        self.link_up.store(link_up, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for TcpReachabilityProbe {
    fn is_link_up(&self) -> bool {
        self.link_up.load(Ordering::SeqCst)
    }

    async fn can_reach_known_host(&self) -> bool {
        match timeout(self.timeout, TcpStream::connect(self.host.as_str())).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(host = %self.host, error = %e, "reachability connect failed");
                false
            }
            Err(_) => {
                debug!(
                    host = %self.host,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "reachability connect timed out"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_reachable_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let probe = TcpReachabilityProbe::new(addr.to_string(), Duration::from_secs(2));
        assert!(probe.can_reach_known_host().await);
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = TcpReachabilityProbe::new(addr.to_string(), Duration::from_secs(2));
        assert!(!probe.can_reach_known_host().await);
    }

    #[test]
    fn test_link_flag() {
        let probe = TcpReachabilityProbe::from_config(&Config::default());
        assert_eq!(probe.host(), "www.apple.com:443");
        assert!(probe.is_link_up());
        probe.set_link_up(false);
        assert!(!probe.is_link_up());
    }
}
