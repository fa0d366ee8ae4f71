//! `shipaction status` and `shipaction reset`.

use anyhow::Context;
use shipaction_config_and_utils::Paths;

pub fn show_status(paths: &Paths) -> anyhow::Result<()> {
    let defaults =
        shipaction_storage::create_user_defaults(paths).context("opening user defaults")?;

    match defaults.load_user()? {
        Some(user) => println!("stored user:\n{}", serde_json::to_string_pretty(&user)?),
        None => println!("stored user: none"),
    }
    println!("onboarding completed: {}", defaults.is_onboarding_completed()?);
    println!("store: {}", paths.user_defaults_file().display());
    Ok(())
}

pub fn reset(paths: &Paths) -> anyhow::Result<()> {
    let defaults =
        shipaction_storage::create_user_defaults(paths).context("opening user defaults")?;
    defaults.clear_user_data()?;
    println!("cleared stored user data");
    Ok(())
}
