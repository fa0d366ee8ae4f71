//! ShipAction CLI - runs the startup/session core against local collaborators.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shipaction_config_and_utils::{init_logging, Config, Paths};

/// ShipAction session core command-line interface.
#[derive(Parser)]
#[command(name = "shipaction")]
#[command(about = "Drive the ShipAction startup sequencer, sign-in flow and stored session")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (config, user defaults, logs). Defaults to ~/.shipaction
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the startup sequence and print the settled state
    Startup(app::StartupArgs),
    /// Attempt password sign-ins to exercise the lockout policy
    SignIn(app::SignInArgs),
    /// Show the stored user and onboarding flag
    Status,
    /// Clear stored user data
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let mut config = Config::load(&paths)?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level, Some(paths.log_file()));

    match cli.command {
        Commands::Startup(args) => app::run_startup(&config, &paths, args).await?,
        Commands::SignIn(args) => app::run_sign_in(&config, args).await?,
        Commands::Status => app::show_status(&paths)?,
        Commands::Reset => app::reset(&paths)?,
    }

    Ok(())
}
