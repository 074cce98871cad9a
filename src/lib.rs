pub mod cli;
pub mod config;
pub mod logging;
pub mod notifier;
pub mod watcher;

pub use config::{ConfigError, Settings};
pub use notifier::{Notifier, NotifyError, StashClient};
pub use watcher::{
    CoalesceScope, DebounceCoordinator, RegistrationPolicy, ScheduledTrigger, WatchEngine,
    WatchError, WatchRoots,
};
