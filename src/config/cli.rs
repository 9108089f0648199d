//! Command-line argument definitions for deploybot.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Command-line interface for deploybot.
///
/// Invoked with no arguments, deploybot runs the full build pipeline.
#[derive(Debug, Parser)]
#[command(name = "deploybot")]
#[command(
    author,
    version,
    about = "Build-and-release orchestrator for Django services"
)]
pub struct Cli {
    /// Subcommand to execute (defaults to `build`).
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Root directory of the Django project.
    #[arg(long, global = true)]
    pub project_dir: Option<Utf8PathBuf>,

    /// Log filter used when `RUST_LOG` is unset (for example `debug`).
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Returns the requested subcommand, defaulting to `build`.
    #[must_use]
    pub const fn selected_command(&self) -> Commands {
        match self.command {
            Some(command) => command,
            None => Commands::Build,
        }
    }
}

/// Available subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Install dependencies, collect assets, probe the database and migrate.
    Build,

    /// Verify runtime environment, storage settings and database reachability.
    Check,

    /// Summarise the service definition and its declared environment.
    Services,
}
