//! Error types for the watch engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Invalid watch root {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("Cannot enumerate {path}: {reason}")]
    EnumerationFailed { path: PathBuf, reason: String },

    #[error("Invalid scan interval of {minutes} minute(s): must be between 1 and {max}")]
    InvalidInterval { minutes: u64, max: u64 },

    #[error("Engine is missing required component: {component}")]
    MissingComponent { component: &'static str },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
