//! Recursive enrollment of existing subdirectories.
//!
//! Runs alongside live event delivery. A directory created after its parent
//! was listed but before the walk reached it is still picked up, through the
//! Create event on the already-watched parent.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use walkdir::WalkDir;

use super::{PathRegistry, WatchError};

/// Register every directory below `root` with the registry.
///
/// `root` itself is not registered here. Returns the number of newly
/// registered directories. An unreadable or unwatchable directory below the
/// root is logged and its subtree skipped; failing to list the root is an
/// error.
pub fn enroll_subtree(root: &Path, registry: &PathRegistry) -> Result<usize, WatchError> {
    let mut enrolled = 0;
    let mut walker = WalkDir::new(root).min_depth(1).follow_links(false).into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if e.path() == Some(root) {
                    return Err(WatchError::EnumerationFailed {
                        path: root.to_path_buf(),
                        reason: e.to_string(),
                    });
                }
                tracing::warn!("[watcher] skipping unreadable subtree: {e}");
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        match registry.ensure_watched(entry.path()) {
            Ok(true) => {
                crate::debug_event!("watcher", "now watching", "{}", entry.path().display());
                enrolled += 1;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!("[watcher] {e}; its subtree will not be watched");
                walker.skip_current_dir();
            }
        }
    }

    Ok(enrolled)
}

/// Walk `root` on the blocking pool, logging the outcome.
pub fn spawn_enrollment(
    root: PathBuf,
    registry: Arc<PathRegistry>,
) -> JoinHandle<Result<usize, WatchError>> {
    tokio::task::spawn_blocking(move || {
        let result = enroll_subtree(&root, &registry);
        match &result {
            Ok(count) => {
                crate::debug_event!(
                    "watcher",
                    "enrolled",
                    "{count} subdirectories under {}",
                    root.display()
                );
            }
            Err(e) => tracing::error!("[watcher] enrollment of {} failed: {e}", root.display()),
        }
        result
    })
}
