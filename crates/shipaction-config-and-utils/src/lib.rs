//! Configuration, filesystem paths, and logging setup for ShipAction.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, ExpiryNotificationSetting, DEFAULT_LOG_LEVEL, DEFAULT_REACHABILITY_HOST};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
