//! Classification of raw events into semantic outcomes.

use std::path::PathBuf;
use std::sync::Arc;

use super::{PathRegistry, RawEvent, RawKind, WatchError};

/// What a raw event means for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A directory appeared and is now watched. No notification.
    NewDirectory(PathBuf),
    /// Content was created, written or removed. Needs a notification.
    ContentChanged(PathBuf),
    /// A created path could not be inspected, usually because it is already
    /// gone. Dropped.
    Vanished(PathBuf),
    /// Not an operation the engine acts on.
    Ignored,
}

/// Maps raw events to [`Classification`]s, enrolling new directories.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    registry: Arc<PathRegistry>,
}

impl EventClassifier {
    pub fn new(registry: Arc<PathRegistry>) -> Self {
        Self { registry }
    }

    /// Classify one event.
    ///
    /// Only Create events are stat'ed: a written path exists by definition
    /// and a removed one cannot be inspected. The only error is a failed
    /// registration of a new directory.
    pub async fn classify(&self, event: &RawEvent) -> Result<Classification, WatchError> {
        match event.kind {
            RawKind::Create => self.classify_created(event).await,
            RawKind::Write | RawKind::Remove => {
                Ok(Classification::ContentChanged(event.path.clone()))
            }
            RawKind::Other => Ok(Classification::Ignored),
        }
    }

    async fn classify_created(&self, event: &RawEvent) -> Result<Classification, WatchError> {
        crate::debug_event!("watcher", "created path item", "{}", event.path.display());

        let path = match std::path::absolute(&event.path) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(
                    "[watcher] could not get absolute path for {}: {e}",
                    event.path.display()
                );
                return Ok(Classification::Vanished(event.path.clone()));
            }
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("[watcher] could not stat {}: {e}", path.display());
                return Ok(Classification::Vanished(path));
            }
        };

        if !metadata.is_dir() {
            return Ok(Classification::ContentChanged(path));
        }

        self.registry.ensure_watched(&path)?;
        Ok(Classification::NewDirectory(path))
    }
}
