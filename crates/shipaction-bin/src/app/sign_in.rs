//! `shipaction sign-in`: repeated password attempts against a local account.

use std::sync::Arc;

use auth_session_engine::{
    LocalIdentityProvider, RateLimitPolicy, RateLimiter, SessionPolicy, SessionTimer, SignInFlow,
};
use clap::Args;
use shipaction_config_and_utils::Config;
use tracing::warn;

#[derive(Args, Debug)]
pub struct SignInArgs {
    /// Account email
    #[arg(long, default_value = "demo@shipaction.app")]
    pub email: String,

    /// Password registered for the account
    #[arg(long, default_value = "correct-horse")]
    pub account_password: String,

    /// Password to try
    #[arg(long)]
    pub password: String,

    /// Number of attempts
    #[arg(long, default_value_t = 1)]
    pub attempts: u32,

    /// Register the account with an unverified email
    #[arg(long)]
    pub unverified: bool,
}

pub async fn run_sign_in(config: &Config, args: SignInArgs) -> anyhow::Result<()> {
    let identity = Arc::new(LocalIdentityProvider::new());
    identity.register_account(&args.email, &args.account_password, !args.unverified);

    let session = Arc::new(SessionTimer::new(SessionPolicy::from(config)));
    session.set_on_expired(Arc::new(|| warn!("session expired, sign in again")));

    let flow = SignInFlow::new(
        identity,
        Arc::new(RateLimiter::new(RateLimitPolicy::from(config))),
        session,
    );

    for attempt in 1..=args.attempts {
        let outcome = flow.sign_in(&args.email, &args.password).await;
        println!("attempt {attempt}: {}", outcome.user_message());
    }

    if flow.session().is_running() {
        flow.sign_out().await?;
    }
    Ok(())
}
