//! Watch roots: the directories the operator asked to monitor.

use std::fs;
use std::path::{Path, PathBuf};

use super::WatchError;

/// Deduplicated set of watch roots.
///
/// No root is ever below another root. Nested roots are covered by the
/// recursive enrollment of their ancestor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WatchRoots {
    roots: Vec<PathBuf>,
}

impl WatchRoots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and accept every path in order.
    pub fn from_paths<I, P>(paths: I) -> Result<Self, WatchError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut roots = Self::new();
        for path in paths {
            roots.insert(path.as_ref())?;
        }
        Ok(roots)
    }

    /// Accept a root.
    ///
    /// The path must be an existing, listable directory. It is stored in
    /// canonical form. Returns `false` if it is already covered by an
    /// accepted root. Accepted roots below the new one are dropped.
    pub fn insert(&mut self, path: &Path) -> Result<bool, WatchError> {
        let invalid = |reason: String| WatchError::InvalidRoot {
            path: path.to_path_buf(),
            reason,
        };

        let metadata = fs::metadata(path).map_err(|e| invalid(e.to_string()))?;
        if !metadata.is_dir() {
            return Err(invalid("watcher path must be a directory".to_string()));
        }
        fs::read_dir(path).map_err(|e| invalid(format!("cannot list contents: {e}")))?;

        let root = fs::canonicalize(path).map_err(|e| invalid(e.to_string()))?;

        // Path::starts_with compares whole components, so /data2 is not
        // under /data.
        if let Some(covering) = self.roots.iter().find(|r| root.starts_with(r)) {
            tracing::debug!(
                "[roots] {} already covered by {}",
                root.display(),
                covering.display()
            );
            return Ok(false);
        }

        self.roots.retain(|existing| {
            let nested = existing.starts_with(&root);
            if nested {
                tracing::debug!(
                    "[roots] {} superseded by {}",
                    existing.display(),
                    root.display()
                );
            }
            !nested
        });
        self.roots.push(root);
        Ok(true)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
