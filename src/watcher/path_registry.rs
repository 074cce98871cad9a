//! Registry of watched directories.
//!
//! Every directory handed to the event source goes through here, whether it is
//! a configured root, found by the startup walk, or created at runtime. The
//! registry makes enrollment idempotent so concurrent discoverers never
//! register the same directory twice.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{WatchError, WatchSource};

/// Set of directories currently subscribed to the event source.
pub struct PathRegistry {
    /// The event source that owns the actual watches.
    source: Arc<dyn WatchSource>,
    /// Directories already handed to the source.
    watched: Mutex<HashSet<PathBuf>>,
}

impl PathRegistry {
    /// Create an empty registry in front of `source`.
    pub fn new(source: Arc<dyn WatchSource>) -> Self {
        Self {
            source,
            watched: Mutex::new(HashSet::new()),
        }
    }

    /// Make sure `dir` is watched.
    ///
    /// Returns `true` when the directory was newly registered and `false` when
    /// it already was. Registering twice is not an error.
    pub fn ensure_watched(&self, dir: &Path) -> Result<bool, WatchError> {
        // Held across the watch call so check-then-register is atomic
        let mut watched = self.watched.lock();
        if watched.contains(dir) {
            return Ok(false);
        }

        self.source.watch(dir)?;
        watched.insert(dir.to_path_buf());
        Ok(true)
    }

    /// Drop `path` and every registered directory below it.
    ///
    /// Called when a path is removed or moved away. The OS discards the
    /// watches itself; forgetting them lets a directory re-created at the
    /// same path be registered again. Returns the number of entries dropped.
    pub fn forget(&self, path: &Path) -> usize {
        let mut watched = self.watched.lock();
        let before = watched.len();
        watched.retain(|dir| !dir.starts_with(path));
        before - watched.len()
    }

    /// Check if a directory is registered.
    pub fn contains(&self, dir: &Path) -> bool {
        self.watched.lock().contains(dir)
    }

    /// Get count of watched directories.
    pub fn dir_count(&self) -> usize {
        self.watched.lock().len()
    }

    /// Snapshot of all watched directories, sorted.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.watched.lock().iter().cloned().collect();
        dirs.sort();
        dirs
    }
}

impl std::fmt::Debug for PathRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathRegistry")
            .field("watched", &self.dir_count())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Source that records every watch request instead of touching the OS.
    #[derive(Default)]
    pub(crate) struct RecordingSource {
        pub(crate) calls: Mutex<Vec<PathBuf>>,
        pub(crate) fail_on: Option<PathBuf>,
    }

    impl WatchSource for RecordingSource {
        fn watch(&self, path: &Path) -> Result<(), WatchError> {
            if self.fail_on.as_deref() == Some(path) {
                return Err(WatchError::PathWatchFailed {
                    path: path.to_path_buf(),
                    reason: "permission denied".to_string(),
                });
            }
            self.calls.lock().push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn test_ensure_watched_is_idempotent() {
        let source = Arc::new(RecordingSource::default());
        let registry = PathRegistry::new(source.clone());

        let dir = PathBuf::from("/data/movies");
        assert!(registry.ensure_watched(&dir).unwrap());
        assert!(!registry.ensure_watched(&dir).unwrap());

        // Only one registration reached the source
        assert_eq!(source.calls.lock().as_slice(), &[dir.clone()]);
        assert_eq!(registry.dir_count(), 1);
        assert!(registry.contains(&dir));
    }

    #[test]
    fn test_forget_allows_registering_again() {
        let source = Arc::new(RecordingSource::default());
        let registry = PathRegistry::new(source.clone());

        let show = PathBuf::from("/data/show");
        registry.ensure_watched(&show).unwrap();
        registry.ensure_watched(&show.join("s01")).unwrap();
        registry.ensure_watched(Path::new("/data/show-extras")).unwrap();

        // Component-wise: show-extras is not below show
        assert_eq!(registry.forget(&show), 2);
        assert!(!registry.contains(&show.join("s01")));
        assert!(registry.contains(Path::new("/data/show-extras")));

        assert!(registry.ensure_watched(&show).unwrap());
        assert_eq!(source.calls.lock().len(), 4);
    }

    #[test]
    fn test_forget_unknown_path_is_noop() {
        let registry = PathRegistry::new(Arc::new(RecordingSource::default()));
        registry.ensure_watched(Path::new("/data")).unwrap();
        assert_eq!(registry.forget(Path::new("/data/x.mp4")), 0);
        assert_eq!(registry.dir_count(), 1);
    }

    #[test]
    fn test_failed_registration_is_not_recorded() {
        let source = Arc::new(RecordingSource {
            fail_on: Some(PathBuf::from("/data/locked")),
            ..Default::default()
        });
        let registry = PathRegistry::new(source);

        let err = registry
            .ensure_watched(Path::new("/data/locked"))
            .unwrap_err();
        assert!(matches!(err, WatchError::PathWatchFailed { .. }));
        assert!(!registry.contains(Path::new("/data/locked")));
        assert_eq!(registry.dir_count(), 0);
    }

    #[test]
    fn test_concurrent_registration() {
        let source = Arc::new(RecordingSource::default());
        let registry = Arc::new(PathRegistry::new(source.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..20 {
                        registry
                            .ensure_watched(&PathBuf::from(format!("/data/{i}")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.dir_count(), 20);
        assert_eq!(source.calls.lock().len(), 20);
        assert_eq!(registry.watched_dirs().len(), 20);
    }
}
