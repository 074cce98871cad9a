//! Trigger command.

use anyhow::Context;

use crate::config::Settings;
use crate::notifier::Notifier;

/// Run trigger command - send one scan request and exit.
pub async fn run_trigger(settings: &Settings) -> anyhow::Result<()> {
    settings.validate()?;

    let client = super::stash_client(settings)?;
    client
        .trigger_scan()
        .await
        .with_context(|| format!("Scan request to {} failed", client.endpoint()))?;

    crate::log_event!("trigger", "scan requested", "{}", client.endpoint());
    Ok(())
}
