//! Filesystem event source.
//!
//! A source is told which directories to watch and delivers change events for
//! each watched directory and its direct children. Watches are non-recursive;
//! subdirectories are enrolled one by one through the [`PathRegistry`].
//!
//! [`PathRegistry`]: super::PathRegistry

use std::path::Path;

use notify::{Event, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::WatchError;

/// Receiving end of a source's raw event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<notify::Result<Event>>;

/// Something that can be asked to watch more directories at any time.
pub trait WatchSource: Send + Sync {
    /// Start delivering events for `path` and its direct children.
    fn watch(&self, path: &Path) -> Result<(), WatchError>;
}

/// [`WatchSource`] backed by the platform's recommended notify watcher.
pub struct NotifySource {
    watcher: Mutex<notify::RecommendedWatcher>,
}

impl NotifySource {
    /// Create the watcher and the channel its events are delivered on.
    pub fn new() -> Result<(Self, EventReceiver), WatchError> {
        // Unbounded: the consumer registers new watches, and a watch call
        // round-trips through the same notify thread that feeds this channel.
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;

        Ok((
            Self {
                watcher: Mutex::new(watcher),
            },
            rx,
        ))
    }
}

impl WatchSource for NotifySource {
    fn watch(&self, path: &Path) -> Result<(), WatchError> {
        self.watcher
            .lock()
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }
}

impl std::fmt::Debug for NotifySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifySource").finish_non_exhaustive()
    }
}
