//! CLI argument parsing using clap.

use clap::{
    ArgAction, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::config::Settings;
use crate::watcher::CoalesceScope;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Watch media directories and ask Stash to rescan when they change
#[derive(Parser, Debug)]
#[command(
    name = "stash-watcher",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch media directories and trigger Stash library scans",
    long_about = "Recursively watches one or more directories and sends a \
                  metadataScan request to a Stash server once changes settle, \
                  plus a scheduled scan at a fixed interval.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Directory to watch recursively (repeatable)
    #[arg(short = 'w', long = "watcher", value_name = "PATH", global = true)]
    pub watchers: Vec<PathBuf>,

    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Minutes between scheduled scans
    #[arg(long, value_name = "MINS", global = true)]
    pub scan_interval: Option<u64>,

    /// Quiet period before a changed path triggers a scan
    #[arg(long, value_name = "MS", global = true)]
    pub debounce_ms: Option<u64>,

    /// Debounce each path separately or the whole tree as one
    #[arg(long, value_enum, global = true)]
    pub coalesce: Option<CoalesceScope>,

    /// Stash GraphQL endpoint
    #[arg(long, value_name = "URL", global = true)]
    pub endpoint: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Watch directories and trigger scans (default)
    Watch,

    /// Display effective settings
    Config,

    /// Send a single scan request and exit
    Trigger,
}

impl Cli {
    /// Command to run, `watch` when none is given.
    pub fn selected_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Watch)
    }

    /// Layer command-line options over loaded settings.
    ///
    /// Roots given on the command line are added to configured ones.
    pub fn apply_overrides(&self, mut settings: Settings) -> Settings {
        settings.watcher.roots.extend(self.watchers.iter().cloned());

        if let Some(mins) = self.scan_interval {
            settings.watcher.scan_interval_mins = mins;
        }
        if let Some(ms) = self.debounce_ms {
            settings.watcher.debounce_ms = ms;
        }
        if let Some(scope) = self.coalesce {
            settings.watcher.coalesce = scope;
        }
        if let Some(endpoint) = &self.endpoint {
            settings.api.endpoint = Some(endpoint.clone());
        }

        match self.verbose {
            0 => {}
            1 => settings.logging.default = "info,stash_watcher=debug".to_string(),
            _ => settings.logging.default = "info,stash_watcher=trace".to_string(),
        }

        settings
    }
}
