//! Environment preflight checks.
//!
//! These steps inspect configuration and the process environment without
//! running anything, so they are cheap to run before every deploy.

use crate::config::StorageBackend;
use crate::error::{ConfigError, DeployError};
use crate::manifest::ServiceManifest;
use crate::pipeline::{OnFailure, ReleaseContext, Step, StepFuture, StepSuccess};

/// Verifies that every `preflight.required_env` variable is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredEnvStep;

impl RequiredEnvStep {
    fn check(ctx: &ReleaseContext<'_>) -> Result<StepSuccess, DeployError> {
        let required = &ctx.config.preflight.required_env;
        let missing: Vec<&str> = required
            .iter()
            .map(String::as_str)
            .filter(|name| !ctx.env.is_set(name))
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: missing.join(", "),
            }
            .into());
        }
        Ok(StepSuccess::Completed(format!(
            "{} required variables set",
            required.len()
        )))
    }
}

impl Step for RequiredEnvStep {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn on_failure(&self) -> OnFailure {
        OnFailure::WarnAndContinue
    }

    fn run<'a>(&'a self, ctx: &'a ReleaseContext<'a>) -> StepFuture<'a> {
        let result = Self::check(ctx);
        Box::pin(async move { result })
    }
}

/// Verifies that variables the service definition expects to be set in the
/// dashboard (`sync: false`) are present.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceEnvStep;

impl ServiceEnvStep {
    fn check(ctx: &ReleaseContext<'_>) -> Result<StepSuccess, DeployError> {
        let path = ctx.config.project_path(&ctx.config.service.manifest);
        if !path.exists() {
            return Ok(StepSuccess::Skipped(format!("no service definition at {path}")));
        }

        let manifest = ServiceManifest::load(&path)?;
        let keys = manifest.out_of_band_keys();
        let missing: Vec<&str> = keys
            .iter()
            .copied()
            .filter(|key| !ctx.env.is_set(key))
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: missing.join(", "),
            }
            .into());
        }
        Ok(StepSuccess::Completed(format!(
            "{} dashboard variables set",
            keys.len()
        )))
    }
}

impl Step for ServiceEnvStep {
    fn name(&self) -> &'static str {
        "service-env"
    }

    fn on_failure(&self) -> OnFailure {
        OnFailure::WarnAndContinue
    }

    fn run<'a>(&'a self, ctx: &'a ReleaseContext<'a>) -> StepFuture<'a> {
        let result = Self::check(ctx);
        Box::pin(async move { result })
    }
}

/// Verifies that a remote storage backend has its credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageStep;

impl StorageStep {
    fn check(ctx: &ReleaseContext<'_>) -> Result<StepSuccess, DeployError> {
        let storage = &ctx.config.storage;
        storage.validate()?;
        let message = match storage.backend {
            StorageBackend::Local => String::from("local storage"),
            StorageBackend::S3 => String::from("s3 storage configured"),
            StorageBackend::Supabase => String::from("supabase storage configured"),
        };
        Ok(StepSuccess::Completed(message))
    }
}

impl Step for StorageStep {
    fn name(&self) -> &'static str {
        "storage"
    }

    fn on_failure(&self) -> OnFailure {
        OnFailure::WarnAndContinue
    }

    fn run<'a>(&'a self, ctx: &'a ReleaseContext<'a>) -> StepFuture<'a> {
        let result = Self::check(ctx);
        Box::pin(async move { result })
    }
}
