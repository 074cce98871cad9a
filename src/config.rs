//! Configuration for the watcher.
//!
//! Layered, lowest priority first:
//! - Default values
//! - TOML configuration file (`--config` or the nearest `.stash-watcher/settings.toml`)
//! - The original `STASH_*` environment variables
//! - `STASH_WATCH_` prefixed environment variables
//! - CLI argument overrides (applied by the caller)
//!
//! # Environment Variables
//!
//! Kept for compatibility with existing deployments:
//! - `STASH_API_ENDPOINT` sets `api.endpoint`
//! - `STASH_API_KEY` sets `api.api_key`
//! - `STASH_SCAN_INTERVAL_MINS` sets `watcher.scan_interval_mins`
//!
//! Presence flags are switched on by merely being set, whatever their value:
//! `STASH_WATCH_DO_AUTH`, `STASH_WATCH_VERBOSE`, `STASH_WATCH_DEBUG`,
//! `STASH_WATCH_FORCE_RESCAN` and the `STASH_WATCH_GEN_*` family.
//!
//! Any other setting can be given with the `STASH_WATCH_` prefix and double
//! underscores between nesting levels:
//! - `STASH_WATCH_WATCHER__DEBOUNCE_MS=250` sets `watcher.debounce_ms`
//! - `STASH_WATCH_API__TIMEOUT_SECS=10` sets `api.timeout_secs`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::watcher::{CoalesceScope, MAX_SCAN_INTERVAL_MINS, RegistrationPolicy};

/// Directory holding the settings file.
const CONFIG_DIR: &str = ".stash-watcher";
const CONFIG_FILE: &str = "settings.toml";

/// Prefix for nested environment overrides.
const ENV_PREFIX: &str = "STASH_WATCH_";

/// Plain environment variables and the setting each one feeds.
const LEGACY_VARS: &[(&str, &str)] = &[
    ("STASH_API_ENDPOINT", "api.endpoint"),
    ("STASH_API_KEY", "api.api_key"),
    ("STASH_SCAN_INTERVAL_MINS", "watcher.scan_interval_mins"),
];

/// Presence flags that switch a boolean setting on.
const PRESENCE_FLAGS: &[(&str, &str)] = &[
    ("STASH_WATCH_DO_AUTH", "api.use_auth"),
    ("STASH_WATCH_FORCE_RESCAN", "scan.rescan"),
    ("STASH_WATCH_GEN_CLIP_PREV", "scan.generate_clip_previews"),
    ("STASH_WATCH_GEN_COVER", "scan.generate_covers"),
    ("STASH_WATCH_GEN_IMAGE_PREV", "scan.generate_image_previews"),
    ("STASH_WATCH_GEN_PHASH", "scan.generate_phashes"),
    ("STASH_WATCH_GEN_PREV", "scan.generate_previews"),
    ("STASH_WATCH_GEN_SPRITE", "scan.generate_sprites"),
    ("STASH_WATCH_GEN_THUMB", "scan.generate_thumbnails"),
];

/// Presence flags that raise the log level. Later entries win.
const LOG_FLAGS: &[(&str, &str)] = &[
    ("STASH_WATCH_VERBOSE", "info,stash_watcher=debug"),
    ("STASH_WATCH_DEBUG", "info,stash_watcher=trace"),
];

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Configuration file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("Invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Settings {
    /// Stash API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Watch roots, debounce and schedule
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Options passed to every metadata scan
    #[serde(default)]
    pub scan: ScanOptions,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ApiConfig {
    /// GraphQL endpoint, e.g. `http://localhost:9999/graphql`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Send the API key with each request
    #[serde(default)]
    pub use_auth: bool,

    /// API key sent in the `ApiKey` header when `use_auth` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Idle keep-alive connections kept per host
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatcherConfig {
    /// Directories to watch recursively
    #[serde(default)]
    pub roots: Vec<PathBuf>,

    /// Quiet period after the last event before a scan fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Minutes between scheduled scans
    #[serde(default = "default_scan_interval_mins")]
    pub scan_interval_mins: u64,

    /// Debounce each path separately or the whole tree as one
    #[serde(default)]
    pub coalesce: CoalesceScope,

    /// What to do when a new directory cannot be watched
    #[serde(default)]
    pub on_registration_error: RegistrationPolicy,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    #[serde(default)]
    pub rescan: bool,
    #[serde(default)]
    pub generate_clip_previews: bool,
    #[serde(default)]
    pub generate_covers: bool,
    #[serde(default)]
    pub generate_image_previews: bool,
    #[serde(default)]
    pub generate_phashes: bool,
    #[serde(default)]
    pub generate_previews: bool,
    #[serde(default)]
    pub generate_sprites: bool,
    #[serde(default)]
    pub generate_thumbnails: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `stash_watcher::watcher = "trace"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_timeout_secs() -> u64 {
    3
}
fn default_max_idle_connections() -> usize {
    1024
}
fn default_debounce_ms() -> u64 {
    100
}
fn default_scan_interval_mins() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            use_auth: false,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_idle_connections: default_max_idle_connections(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            debounce_ms: default_debounce_ms(),
            scan_interval_mins: default_scan_interval_mins(),
            coalesce: CoalesceScope::default(),
            on_registration_error: RegistrationPolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// An explicit `config_path` must exist; otherwise the nearest workspace
    /// settings file is used if there is one.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match config_path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::MissingFile {
                    path: path.to_path_buf(),
                });
            }
            Some(path) => path.to_path_buf(),
            None => Self::find_workspace_config()
                .unwrap_or_else(|| Path::new(CONFIG_DIR).join(CONFIG_FILE)),
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path));
        let figment = with_legacy_env(figment, |name| std::env::var_os(name).is_some());
        let figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                // Presence flags carry no meaningful value
                .ignore(&presence_flag_keys())
                .map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
        );

        Ok(figment.extract().map_err(Box::new)?)
    }

    /// Load configuration from a specific file, defaults underneath.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(Box::new)?)
    }

    /// Find the nearest `.stash-watcher/settings.toml`, searching from the
    /// current directory up to the filesystem root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Check settings needed to run the watcher.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.endpoint.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Invalid {
                field: "api.endpoint",
                reason: "Stash API endpoint is unset (hint: set STASH_API_ENDPOINT)".to_string(),
            });
        }

        if self.api.use_auth && self.api.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Invalid {
                field: "api.api_key",
                reason: "authentication requested but API key is unset \
                         (hint: set STASH_API_KEY)"
                    .to_string(),
            });
        }

        if !(1..=MAX_SCAN_INTERVAL_MINS).contains(&self.watcher.scan_interval_mins) {
            return Err(ConfigError::Invalid {
                field: "watcher.scan_interval_mins",
                reason: format!("must be between 1 and {MAX_SCAN_INTERVAL_MINS} minutes"),
            });
        }

        Ok(())
    }

    /// Copy of these settings safe to print.
    pub fn redacted(&self) -> Self {
        let mut settings = self.clone();
        if settings.api.api_key.is_some() {
            settings.api.api_key = Some("<redacted>".to_string());
        }
        settings
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Layer the original environment variables onto `figment`.
///
/// `is_set` reports whether a variable is present; it is injected so the
/// presence flags can be checked without touching the process environment.
pub(crate) fn with_legacy_env(figment: Figment, is_set: impl Fn(&str) -> bool) -> Figment {
    let legacy_names: Vec<&str> = LEGACY_VARS.iter().map(|(name, _)| *name).collect();
    let mut figment = figment.merge(Env::raw().only(&legacy_names).map(|key| {
        LEGACY_VARS
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, setting)| *setting)
            .unwrap_or_else(|| key.as_str())
            .to_string()
            .into()
    }));

    for (name, setting) in PRESENCE_FLAGS {
        if is_set(name) {
            figment = figment.merge(Serialized::default(setting, true));
        }
    }
    for (name, level) in LOG_FLAGS {
        if is_set(name) {
            figment = figment.merge(Serialized::default("logging.default", *level));
        }
    }

    figment
}

/// Presence flag names with the prefix stripped, as seen by the prefixed
/// environment provider.
fn presence_flag_keys() -> Vec<&'static str> {
    PRESENCE_FLAGS
        .iter()
        .chain(LOG_FLAGS)
        .filter_map(|(name, _)| name.strip_prefix(ENV_PREFIX))
        .collect()
}
