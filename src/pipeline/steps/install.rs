//! Dependency installation.

use std::collections::HashSet;

use crate::error::{DependencyError, DeployError};
use crate::manifest::{Requirement, normalise_name, read_requirements};
use crate::pipeline::summary::installed_packages;
use crate::pipeline::{OnFailure, ReleaseContext, Step, StepFuture, StepSuccess};

/// Creates the virtual environment if needed, installs the dependency
/// manifest, and verifies every declared package is present.
///
/// There is no partial success: any installer failure or missing package
/// fails the step. Packages pulled in through nested `-r` files are verified
/// too. Requirements guarded by an environment marker are not, because pip
/// skips them on platforms the marker excludes.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallStep;

impl InstallStep {
    async fn install(ctx: &ReleaseContext<'_>) -> Result<StepSuccess, DeployError> {
        let toolchain = ctx.toolchain();

        if toolchain.venv_exists() {
            tracing::debug!(venv = %toolchain.venv_dir(), "reusing virtual environment");
        } else {
            tracing::info!(venv = %toolchain.venv_dir(), "creating virtual environment");
            let output = ctx.runner.run(toolchain.create_venv()).await?;
            if !output.success() {
                return Err(DependencyError::EnvironmentCreationFailed {
                    path: toolchain.venv_dir().to_string(),
                    message: output.failure_summary(),
                }
                .into());
            }
        }

        let requirements = read_requirements(toolchain.requirements())?;
        tracing::info!(
            manifest = %toolchain.requirements(),
            count = requirements.len(),
            "installing dependencies"
        );

        let upgrade = ctx
            .runner
            .run(toolchain.pip(["install", "--upgrade", "pip"]))
            .await?;
        if !upgrade.success() {
            return Err(DependencyError::InstallFailed {
                message: format!("pip upgrade failed: {}", upgrade.failure_summary()),
            }
            .into());
        }

        let install = ctx
            .runner
            .run(toolchain.pip(["install", "-r", toolchain.requirements().as_str()]))
            .await?;
        if !install.success() {
            return Err(DependencyError::InstallFailed {
                message: install.failure_summary(),
            }
            .into());
        }

        let installed: HashSet<String> = installed_packages(ctx)
            .await?
            .iter()
            .map(|package| normalise_name(&package.name))
            .collect();
        let missing: Vec<String> = requirements
            .iter()
            .filter(|requirement| !requirement.is_conditional())
            .map(Requirement::normalised_name)
            .filter(|name| !installed.contains(name))
            .collect();
        if !missing.is_empty() {
            return Err(DependencyError::MissingPackages { packages: missing }.into());
        }

        let manifest_name = toolchain
            .requirements()
            .file_name()
            .unwrap_or("requirements");
        Ok(StepSuccess::Completed(format!(
            "installed {} declared packages from {manifest_name}",
            requirements.len()
        )))
    }
}

impl Step for InstallStep {
    fn name(&self) -> &'static str {
        "install"
    }

    fn on_failure(&self) -> OnFailure {
        OnFailure::Halt
    }

    fn run<'a>(&'a self, ctx: &'a ReleaseContext<'a>) -> StepFuture<'a> {
        Box::pin(Self::install(ctx))
    }
}
