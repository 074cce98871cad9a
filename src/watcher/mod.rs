//! Recursive directory watching with per-path debounced scan triggers.
//!
//! # Architecture
//!
//! ```text
//! WatchEngine
//!   - Single event source (notify::RecommendedWatcher, non-recursive)
//!   - Shared PathRegistry (one watch per directory)
//!   - EventClassifier (new directory / content change / vanished)
//!   - DebounceCoordinator (one resettable timer per path)
//!         |
//!     Notifier::trigger_scan
//!         ^
//! ScheduledTrigger (fixed interval, independent of events)
//! ```
//!
//! Directories are enrolled one at a time: each configured root up front,
//! every existing subdirectory by a background walk, and every directory
//! created later as its Create event arrives.

mod classifier;
mod debouncer;
mod engine;
mod enumerator;
mod error;
mod event;
pub(crate) mod path_registry;
mod roots;
mod schedule;
mod source;

pub use classifier::{Classification, EventClassifier};
pub use debouncer::{CoalesceScope, DebounceCoordinator};
pub use engine::{RegistrationPolicy, WatchEngine, WatchEngineBuilder};
pub use enumerator::{enroll_subtree, spawn_enrollment};
pub use error::WatchError;
pub use event::{RawEvent, RawKind};
pub use path_registry::PathRegistry;
pub use roots::WatchRoots;
pub use schedule::{MAX_SCAN_INTERVAL_MINS, ScheduledTrigger};
pub use source::{EventReceiver, NotifySource, WatchSource};
