//! Watch engine: wires the event source, classifier and debouncer together.

use std::sync::Arc;
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use serde::{Deserialize, Serialize};

use super::classifier::{Classification, EventClassifier};
use super::debouncer::{CoalesceScope, DebounceCoordinator};
use super::enumerator::spawn_enrollment;
use super::error::WatchError;
use super::event::{RawEvent, RawKind};
use super::path_registry::PathRegistry;
use super::roots::WatchRoots;
use super::source::{EventReceiver, NotifySource, WatchSource};
use crate::notifier::Notifier;

/// What to do when a directory discovered at runtime cannot be watched.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPolicy {
    /// Log the failure and keep watching everything else.
    #[default]
    Skip,
    /// Stop the engine with the error.
    Exit,
}

/// Event loop over a single event source.
///
/// Roots are registered up front; every directory below them is enrolled in
/// the background while events are already flowing.
pub struct WatchEngine {
    roots: WatchRoots,
    registry: Arc<PathRegistry>,
    classifier: EventClassifier,
    debouncer: DebounceCoordinator,
    policy: RegistrationPolicy,
    event_rx: EventReceiver,
}

impl WatchEngine {
    /// Create a builder for configuring the engine.
    pub fn builder() -> WatchEngineBuilder {
        WatchEngineBuilder::new()
    }

    /// Shared registry of watched directories.
    pub fn registry(&self) -> Arc<PathRegistry> {
        self.registry.clone()
    }

    /// Run until the event source closes.
    ///
    /// Failing to watch a root is fatal. Everything after startup is soft,
    /// except a runtime registration failure under [`RegistrationPolicy::Exit`].
    pub async fn run(mut self) -> Result<(), WatchError> {
        for root in self.roots.iter() {
            self.registry.ensure_watched(root)?;
            crate::debug_event!("watcher", "now watching", "{}", root.display());
        }

        crate::log_event!(
            "watcher",
            "started",
            "{} root(s), {}ms debounce",
            self.roots.len(),
            self.debouncer.window().as_millis()
        );

        for root in self.roots.iter() {
            spawn_enrollment(root.to_path_buf(), self.registry.clone());
        }

        while let Some(res) = self.event_rx.recv().await {
            match res {
                Ok(event) => self.handle_event(event).await?,
                Err(e) => tracing::error!("[watcher] file watch error: {e}"),
            }
        }

        crate::debug_event!("watcher", "event source closed");
        Ok(())
    }

    /// Handle one notify event, which may carry several paths.
    async fn handle_event(&self, event: Event) -> Result<(), WatchError> {
        if event.need_rescan() {
            tracing::warn!("[watcher] event queue overflowed, treating all roots as changed");
            for root in self.roots.iter() {
                self.debouncer.record(root.to_path_buf());
            }
            return Ok(());
        }

        // The source side of a move; `Both` lists it first
        if matches!(
            event.kind,
            EventKind::Modify(ModifyKind::Name(RenameMode::From | RenameMode::Both))
        ) {
            if let Some(from) = event.paths.first() {
                self.forget(from);
            }
        }

        for raw in RawEvent::from_notify(&event) {
            tracing::trace!("[watcher] event: {:?} {}", raw.kind, raw.path.display());
            if !raw.is_actionable() {
                continue;
            }
            if raw.kind == RawKind::Remove {
                self.forget(&raw.path);
            }

            match self.classifier.classify(&raw).await {
                Ok(outcome) => self.route(outcome),
                Err(e) => match self.policy {
                    RegistrationPolicy::Skip => {
                        tracing::error!("[watcher] {e}");
                    }
                    RegistrationPolicy::Exit => return Err(e),
                },
            }
        }

        Ok(())
    }

    /// Stop tracking a directory that is gone so it can be watched again if
    /// it comes back.
    fn forget(&self, path: &std::path::Path) {
        let dropped = self.registry.forget(path);
        if dropped > 0 {
            crate::debug_event!(
                "watcher",
                "stopped watching",
                "{} ({dropped} directories)",
                path.display()
            );
        }
    }

    fn route(&self, outcome: Classification) {
        match outcome {
            Classification::NewDirectory(dir) => {
                crate::log_event!(
                    "watcher",
                    "new directory detected, now watching",
                    "{}",
                    dir.display()
                );
                // It may have arrived with content already inside (a move)
                spawn_enrollment(dir, self.registry.clone());
            }
            Classification::ContentChanged(path) => {
                crate::debug_event!("watcher", "file changed", "{}", path.display());
                self.debouncer.record(path);
            }
            Classification::Vanished(_) | Classification::Ignored => {}
        }
    }
}

impl std::fmt::Debug for WatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchEngine")
            .field("roots", &self.roots)
            .field("registry", &self.registry)
            .field("debouncer", &self.debouncer)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`WatchEngine`].
pub struct WatchEngineBuilder {
    roots: WatchRoots,
    notifier: Option<Arc<dyn Notifier>>,
    source: Option<(Arc<dyn WatchSource>, EventReceiver)>,
    debounce_ms: u64,
    scope: CoalesceScope,
    policy: RegistrationPolicy,
}

impl WatchEngineBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            roots: WatchRoots::new(),
            notifier: None,
            source: None,
            debounce_ms: 100,
            scope: CoalesceScope::default(),
            policy: RegistrationPolicy::default(),
        }
    }

    /// Set the validated root set.
    pub fn roots(mut self, roots: WatchRoots) -> Self {
        self.roots = roots;
        self
    }

    /// Set the notifier called when changes settle.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Use an existing event source instead of the platform watcher.
    pub fn source(mut self, source: Arc<dyn WatchSource>, event_rx: EventReceiver) -> Self {
        self.source = Some((source, event_rx));
        self
    }

    /// Set the debounce window in milliseconds.
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn scope(mut self, scope: CoalesceScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn registration_policy(mut self, policy: RegistrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<WatchEngine, WatchError> {
        let notifier = self
            .notifier
            .ok_or(WatchError::MissingComponent {
                component: "notifier",
            })?;

        let (source, event_rx) = match self.source {
            Some(source) => source,
            None => {
                let (source, event_rx) = NotifySource::new()?;
                (Arc::new(source) as Arc<dyn WatchSource>, event_rx)
            }
        };

        let registry = Arc::new(PathRegistry::new(source));

        Ok(WatchEngine {
            roots: self.roots,
            classifier: EventClassifier::new(registry.clone()),
            registry,
            debouncer: DebounceCoordinator::new(
                notifier,
                Duration::from_millis(self.debounce_ms),
                self.scope,
            ),
            policy: self.policy,
            event_rx,
        })
    }
}

impl Default for WatchEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
