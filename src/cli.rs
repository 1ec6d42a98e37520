// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "convoy")]
#[command(about = "Declarative container reconciliation for Docker and Podman")]
#[command(version)]
pub struct Cli {
    /// Path to the project file (default: discover convoy.yml)
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Show what would change without touching any container
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, start, or replace containers until they match the project
    Up {
        /// Stream container output until interrupted
        #[arg(short, long)]
        attach: bool,
    },

    /// Create missing containers without starting them
    Create,

    /// Start stopped containers
    Start {
        /// Stream container output until interrupted
        #[arg(short, long)]
        attach: bool,
    },

    /// Run `up` with one service scaled to COUNT instances
    Scale { service: String, count: u32 },

    /// Restart containers (extra arguments go to the runtime)
    Restart {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Stop containers (extra arguments go to the runtime)
    Stop {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Kill containers (extra arguments go to the runtime)
    Kill {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Remove containers (extra arguments go to the runtime)
    Rm {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List project containers (extra arguments go to the runtime)
    Ps {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print the IP addresses of running containers
    Ip,

    /// Build images of services that declare a build
    Build,

    /// Pull images of services that do not build their own
    Pull,

    /// Follow container logs
    Logs {
        /// Lines of history to show per container
        #[arg(long, default_value_t = 100)]
        tail: u64,
    },

    /// Show live resource usage of running containers
    Stats,

    /// Print the resolved plan: instances, decisions inputs, and cleanup
    Show,
}
