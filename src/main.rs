// ABOUTME: Entry point for the convoy CLI application.
// ABOUTME: Parses arguments, installs signal handling, and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use convoy::hooks::HookRegistry;
use convoy::shutdown::ShutdownCoordinator;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let coordinator = Arc::new(ShutdownCoordinator::new(Arc::new(HookRegistry::new())));
    tokio::spawn(Arc::clone(&coordinator).watch_signals());
    let mut all_done = coordinator.subscribe();

    let result = tokio::select! {
        biased;
        _ = all_done.wait() => std::process::exit(1),
        result = commands::run(cli, &coordinator) => result,
    };

    // An attached batch returns once shutdown released it.
    if all_done.is_released() {
        std::process::exit(1);
    }

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
