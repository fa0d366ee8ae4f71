//! `shipaction startup`: run the sequencer to a settled state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use auth_session_engine::{
    LocalIdentityProvider, NavigationState, StartupConfig, StartupSequencer, StartupState,
    TcpReachabilityProbe,
};
use clap::Args;
use shipaction_config_and_utils::{Config, Paths};
use tracing::info;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Args, Debug)]
pub struct StartupArgs {
    /// Email of the restored session
    #[arg(long, default_value = "demo@shipaction.app")]
    pub email: String,

    /// Restore a session whose email is not verified
    #[arg(long)]
    pub unverified: bool,

    /// Start with no restored session
    #[arg(long, conflicts_with = "unverified")]
    pub signed_out: bool,

    /// Report the network link as down
    #[arg(long)]
    pub offline: bool,

    /// When startup lands on no-internet, bring the link back up and re-run
    #[arg(long, requires = "offline")]
    pub reconnect: bool,
}

pub async fn run_startup(config: &Config, paths: &Paths, args: StartupArgs) -> anyhow::Result<()> {
    let users = Arc::new(
        shipaction_storage::create_user_defaults(paths).context("opening user defaults")?,
    );

    let identity = Arc::new(LocalIdentityProvider::new());
    if !args.signed_out {
        let account = identity.register_account(&args.email, "", !args.unverified);
        identity.set_current_identity(Some(account));
    }

    let connectivity = Arc::new(TcpReachabilityProbe::from_config(config));
    connectivity.set_link_up(!args.offline);

    let sequencer = StartupSequencer::new(
        StartupConfig::from(config),
        Arc::new(NavigationState::new()),
        users,
        connectivity.clone(),
        identity,
    );

    sequencer.perform_startup().await;
    let mut state = wait_settled(&sequencer).await?;
    println!("startup settled: {state}");

    if args.reconnect && state == StartupState::NoInternet {
        info!("simulating connectivity restore");
        connectivity.set_link_up(true);
        sequencer.handle_connectivity_change().await;
        state = wait_settled(&sequencer).await?;
        println!("after reconnect: {state}");
    }

    println!("navigation flow: {}", sequencer.navigation().current());
    match sequencer.last_reachability() {
        Some(reachable) => println!("known host reachable: {reachable}"),
        None => println!("known host reachable: (probe still running)"),
    }

    sequencer.shutdown();
    Ok(())
}

async fn wait_settled(sequencer: &StartupSequencer) -> anyhow::Result<StartupState> {
    let mut rx = sequencer.subscribe_state();
    let state = tokio::time::timeout(SETTLE_TIMEOUT, rx.wait_for(|state| state.is_settled()))
        .await
        .context("startup did not settle in time")?
        .context("startup state channel closed")?;
    Ok(*state)
}
