//! `deploybot` application entry point.
//!
//! This binary runs the release build for a Django service. It uses `eyre`
//! for opaque error handling at the application boundary, converting
//! domain-specific errors into human-readable reports.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Configuration file (`~/.config/deploybot/config.toml` or path from `DEPLOYBOT_CONFIG_PATH`)
//! 3. Environment variables (`DEPLOYBOT_*` and the platform's own, such as `DATABASE_URL`)
//! 4. Command-line arguments

use std::io;
use std::process::ExitCode;

use clap::Parser;
use deploybot::api::{self, CommandOutcome};
use deploybot::config::{AppConfig, Cli, Commands, load_config};
use deploybot::error::Result as DeployResult;
use deploybot::logging;
use deploybot::pipeline::{ReleaseContext, StatusWriter};
use deploybot::probe::PgProbe;
use deploybot::process::SystemCommandRunner;
use eyre::{Report, Result as EyreResult};

/// Application entry point.
///
/// Loads configuration, installs the log subscriber, then dispatches to the
/// subcommand. Status lines go to stdout and the exit code follows the
/// command outcome.
fn main() -> EyreResult<ExitCode> {
    let cli = Cli::parse();
    let env = mockable::DefaultEnv::new();

    let config = load_config(&cli, &env).map_err(Report::from)?;
    logging::init(config.log_level());
    tracing::debug!(project = %config.project_dir(), command = ?cli.selected_command(), "configuration loaded");

    // One worker: steps run strictly in sequence, and `Handle::block_on`
    // needs a runtime whose drivers run off the calling thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;

    let outcome = run(cli.selected_command(), &config, &env, runtime.handle()).map_err(Report::from)?;
    Ok(ExitCode::from(outcome.code()))
}

/// Execute the selected command, returning domain-specific errors.
///
/// Keeps semantic errors inside the run loop so the CLI boundary owns
/// conversion to `eyre::Report`.
fn run(
    command: Commands,
    config: &AppConfig,
    env: &mockable::DefaultEnv,
    runtime_handle: &tokio::runtime::Handle,
) -> DeployResult<CommandOutcome> {
    let runner = SystemCommandRunner::new();
    let probe = PgProbe::new();
    let ctx = ReleaseContext::new(config, &runner, &probe, env);
    let mut out = StatusWriter::new(io::stdout().lock());

    match command {
        Commands::Build => Ok(api::build(&ctx, runtime_handle, &mut out)),
        Commands::Check => Ok(api::check(&ctx, runtime_handle, &mut out)),
        Commands::Services => api::services(config, env, &mut out),
    }
}
