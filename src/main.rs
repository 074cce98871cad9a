//! stash-watcher binary entry point.

use clap::Parser;

use stash_watcher::Settings;
use stash_watcher::cli::commands::{config, trigger, watch};
use stash_watcher::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => cli.apply_overrides(settings),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    stash_watcher::logging::init_with_config(&settings.logging);

    let result = match cli.selected_command() {
        Commands::Watch => watch::run_watch(&settings).await,
        Commands::Config => config::run_config(&settings),
        Commands::Trigger => trigger::run_trigger(&settings).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
