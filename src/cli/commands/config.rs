//! Config command.

use anyhow::Context;

use crate::config::Settings;

/// Run config command - print effective settings as TOML.
///
/// The API key is redacted. Settings are printed even when they would not
/// pass validation, so a broken setup can be inspected.
pub fn run_config(settings: &Settings) -> anyhow::Result<()> {
    let toml_str = settings
        .redacted()
        .to_toml()
        .context("Failed to render configuration")?;
    println!("{toml_str}");
    Ok(())
}
