//! Command functions behind the `deploybot` CLI.
//!
//! Each subcommand has one function here: [`build`], [`check`] and
//! [`services`]. They take library-owned types, write status lines through a
//! [`StatusWriter`], and return a [`CommandOutcome`] that the binary maps to
//! a process exit code. None of them call `std::process::exit`.

use std::io::Write;

use tokio::runtime::Handle;

use crate::config::AppConfig;
use crate::error::Result as DeployResult;
use crate::manifest::{EnvVarSource, ServiceDefinition, ServiceManifest};
use crate::pipeline::steps::{build_pipeline, preflight_pipeline};
use crate::pipeline::{EnvLookup, ReleaseContext, StatusWriter};

/// Outcome of a deploybot command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command succeeded (exit code 0).
    Success,
    /// The command ran to a verdict that should fail the deploy.
    Failed {
        /// Process exit code to report.
        code: u8,
    },
}

impl CommandOutcome {
    /// Map a numeric exit code onto an outcome.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        if code == 0 {
            Self::Success
        } else {
            Self::Failed { code }
        }
    }

    /// The process exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failed { code } => code,
        }
    }
}

/// Run the release build pipeline.
///
/// Fails only when a fatal step halted the run; warnings from non-fatal
/// steps are reported but leave the outcome successful.
pub fn build<W: Write>(
    ctx: &ReleaseContext<'_>,
    runtime_handle: &Handle,
    out: &mut StatusWriter<W>,
) -> CommandOutcome {
    let report = runtime_handle.block_on(build_pipeline().run(ctx, out));
    CommandOutcome::from_code(report.exit_code())
}

/// Run the preflight checks.
///
/// Every check runs; the outcome fails if any of them did.
pub fn check<W: Write>(
    ctx: &ReleaseContext<'_>,
    runtime_handle: &Handle,
    out: &mut StatusWriter<W>,
) -> CommandOutcome {
    let report = runtime_handle.block_on(preflight_pipeline().run(ctx, out));
    if report.has_failures() {
        CommandOutcome::Failed { code: 1 }
    } else {
        CommandOutcome::Success
    }
}

/// Describe the service definition and the environment it expects.
///
/// # Errors
///
/// Returns `ManifestError::Unreadable` or
/// `ManifestError::InvalidServiceDefinition` if the definition cannot be
/// loaded, and `ManifestError::NoWebService` if it declares no web service.
pub fn services<W: Write>(
    config: &AppConfig,
    env: &dyn EnvLookup,
    out: &mut StatusWriter<W>,
) -> DeployResult<CommandOutcome> {
    let path = config.project_path(&config.service.manifest);
    let manifest = ServiceManifest::load(&path)?;
    let web = manifest.primary_web_service()?;
    tracing::debug!(%path, web = %web.name, "loaded service definition");

    out.line(format_args!("Service definition: {path}"));
    for service in &manifest.services {
        describe_service(service, env, out);
    }
    for database in &manifest.databases {
        let name = database.database_name.as_deref().unwrap_or(&database.name);
        out.line(format_args!("database {} ({name})", database.name));
    }
    Ok(CommandOutcome::Success)
}

fn describe_service<W: Write>(
    service: &ServiceDefinition,
    env: &dyn EnvLookup,
    out: &mut StatusWriter<W>,
) {
    let runtime = service.runtime.as_deref().unwrap_or("unspecified runtime");
    out.line(format_args!("{} {} ({runtime})", service.kind, service.name));
    if let Some(ref command) = service.build_command {
        out.line(format_args!("  build: {command}"));
    }
    if let Some(ref command) = service.start_command {
        out.line(format_args!("  start: {command}"));
    }
    for decl in &service.env_vars {
        let source = match decl.source() {
            EnvVarSource::Literal(value) => format!("literal {value}"),
            EnvVarSource::Generated => String::from("generated by the platform"),
            EnvVarSource::FromDatabase(reference) => {
                format!("from database {} ({})", reference.name, reference.property)
            }
            EnvVarSource::OutOfBand if env.is_set(&decl.key) => {
                String::from("set in dashboard (present)")
            }
            EnvVarSource::OutOfBand => String::from("set in dashboard (missing)"),
        };
        out.line(format_args!("  {}: {source}", decl.key));
    }
}
