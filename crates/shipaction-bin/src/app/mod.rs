//! Subcommand implementations.

mod sign_in;
mod startup;
mod status;

pub use sign_in::{run_sign_in, SignInArgs};
pub use startup::{run_startup, StartupArgs};
pub use status::{reset, show_status};
