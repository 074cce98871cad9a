//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod config;
pub mod trigger;
pub mod watch;

use anyhow::Context;

use crate::config::Settings;
use crate::notifier::StashClient;

/// Build the Stash client from validated settings.
pub(crate) fn stash_client(settings: &Settings) -> anyhow::Result<StashClient> {
    let endpoint = settings
        .api
        .endpoint
        .clone()
        .context("Stash API endpoint is unset")?;
    StashClient::new(endpoint, &settings.api, &settings.scan).context("Failed to create Stash client")
}
