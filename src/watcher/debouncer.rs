//! Per-path debouncing of content changes.
//!
//! Media files are usually written in many chunks, and a single copy can emit
//! hundreds of write events. Each path gets one resettable timer; only when a
//! path has been quiet for the whole window does a single scan request go out.
//!
//! # States
//!
//! ```text
//! idle --record--> pending --record--> pending (deadline pushed out)
//!                     |
//!                deadline passes
//!                     v
//!        entry removed, notifier called --> idle
//! ```
//!
//! The table lock covers lookup, insert, reset and delete only. It is never
//! held across an `.await`, so a slow scan request for one path cannot stall
//! events for any other path.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep_until};

use crate::notifier::Notifier;

/// How events are grouped into debounce entries.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CoalesceScope {
    /// One timer per path; N settled paths send N requests.
    #[default]
    PerPath,
    /// One timer for the whole watched tree; a burst anywhere sends one
    /// request once everything is quiet.
    Global,
}

/// Outstanding timer for one key.
#[derive(Debug)]
struct PendingEntry {
    /// When the timer fires unless reset again.
    deadline: Instant,
    /// Most recent path recorded under this key, for logging.
    last_path: PathBuf,
}

struct Shared {
    pending: Mutex<HashMap<PathBuf, PendingEntry>>,
    window: Duration,
    scope: CoalesceScope,
    notifier: Arc<dyn Notifier>,
}

/// Coalesces content-change events and fires one notification per settle.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone)]
pub struct DebounceCoordinator {
    shared: Arc<Shared>,
}

impl DebounceCoordinator {
    /// Create a coordinator that calls `notifier` after `window` of quiet.
    pub fn new(notifier: Arc<dyn Notifier>, window: Duration, scope: CoalesceScope) -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(HashMap::new()),
                window,
                scope,
                notifier,
            }),
        }
    }

    /// Record a content change for `path`.
    ///
    /// Starts a timer if none is pending for the path's key and returns
    /// `true`; otherwise pushes the pending deadline out to a full window from
    /// now and returns `false`. Must be called within a tokio runtime.
    pub fn record(&self, path: PathBuf) -> bool {
        let key = self.key_for(&path);
        let deadline = Instant::now() + self.shared.window;

        let started = {
            let mut pending = self.shared.pending.lock();
            match pending.entry(key.clone()) {
                Entry::Occupied(mut entry) => {
                    let entry = entry.get_mut();
                    entry.deadline = deadline;
                    entry.last_path = path;
                    false
                }
                Entry::Vacant(entry) => {
                    entry.insert(PendingEntry {
                        deadline,
                        last_path: path,
                    });
                    true
                }
            }
        };

        if started {
            tokio::spawn(settle(self.shared.clone(), key));
        }
        started
    }

    /// Check if a timer is pending for the key `path` maps to.
    pub fn is_pending(&self, path: &Path) -> bool {
        self.shared.pending.lock().contains_key(&self.key_for(path))
    }

    /// Get the number of pending timers.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    pub fn window(&self) -> Duration {
        self.shared.window
    }

    fn key_for(&self, path: &Path) -> PathBuf {
        match self.shared.scope {
            CoalesceScope::PerPath => path.to_path_buf(),
            CoalesceScope::Global => PathBuf::new(),
        }
    }
}

impl std::fmt::Debug for DebounceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebounceCoordinator")
            .field("window", &self.shared.window)
            .field("scope", &self.shared.scope)
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Timer task for one key: wait out the deadline, then notify once.
async fn settle(shared: Arc<Shared>, key: PathBuf) {
    let path = loop {
        let deadline = match shared.pending.lock().get(&key) {
            Some(entry) => entry.deadline,
            None => return,
        };

        sleep_until(deadline).await;

        // Remove before notifying: an event that lands while the request is
        // in flight starts a fresh cycle instead of resetting a dead timer.
        let mut pending = shared.pending.lock();
        let due = match pending.get(&key) {
            Some(entry) => entry.deadline <= Instant::now(),
            None => return,
        };
        if !due {
            continue;
        }
        match pending.remove(&key) {
            Some(entry) => break entry.last_path,
            None => return,
        }
    };

    crate::log_event!("watcher", "files changed, sending update", "{}", path.display());

    if let Err(e) = shared.notifier.trigger_scan().await {
        tracing::error!("[watcher] scan request failed: {e}");
    }
}
