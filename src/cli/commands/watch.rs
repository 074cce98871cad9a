//! Watch command: the long-running service.

use std::sync::Arc;

use anyhow::{Context, bail};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::notifier::Notifier;
use crate::watcher::{ScheduledTrigger, WatchEngine, WatchRoots};

/// Run watch command - watch roots and trigger scans until interrupted.
pub async fn run_watch(settings: &Settings) -> anyhow::Result<()> {
    if settings.watcher.roots.is_empty() {
        bail!("no watcher arguments provided");
    }
    settings.validate()?;

    let roots = WatchRoots::from_paths(&settings.watcher.roots)?;
    for root in roots.iter() {
        crate::debug_event!("watcher", "root", "{}", root.display());
    }

    let client = super::stash_client(settings)?;
    crate::log_event!("notifier", "using endpoint", "{}", client.endpoint());
    let notifier: Arc<dyn Notifier> = Arc::new(client);

    let engine = WatchEngine::builder()
        .roots(roots)
        .notifier(notifier.clone())
        .debounce_ms(settings.watcher.debounce_ms)
        .scope(settings.watcher.coalesce)
        .registration_policy(settings.watcher.on_registration_error)
        .build()
        .context("Failed to start watcher")?;

    // Coordinated shutdown
    let ct = CancellationToken::new();

    let schedule =
        ScheduledTrigger::every_minutes(notifier, settings.watcher.scan_interval_mins)?;
    crate::log_event!(
        "schedule",
        "started",
        "every {} minute(s)",
        settings.watcher.scan_interval_mins
    );
    let schedule_ct = ct.clone();
    let schedule_task = tokio::spawn(async move {
        tokio::select! {
            _ = schedule.run() => {}
            _ = schedule_ct.cancelled() => {
                crate::debug_event!("schedule", "stopped");
            }
        }
    });

    let result = tokio::select! {
        result = engine.run() => result.context("Watcher stopped"),
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            crate::log_event!("watcher", "received shutdown signal");
            Ok(())
        }
    };

    ct.cancel();
    let _ = schedule_task.await;
    result
}
