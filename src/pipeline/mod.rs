//! Release pipeline: steps, run state and the orchestrator.
//!
//! A pipeline is a fixed, ordered list of [`Step`]s. Each step reports a
//! typed result and declares what a failure means ([`OnFailure`]); the
//! [`Orchestrator`] alone decides whether to continue or halt.

mod orchestrator;
mod state;
pub mod steps;
mod summary;
mod toolchain;

#[cfg(test)]
pub(crate) mod test_support;

pub use orchestrator::{Orchestrator, StatusWriter};
pub use state::{RunReport, RunState, StepOutcome, StepResult};
pub use summary::{InstalledPackage, key_packages, parse_freeze};
pub use toolchain::Toolchain;

use std::future::Future;
use std::pin::Pin;

use crate::config::AppConfig;
use crate::error::DeployError;
use crate::process::CommandRunner;
use crate::probe::DatabaseProbe;

/// What a step's failure means for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Stop the run and exit non-zero.
    Halt,
    /// Report the failure and carry on with the next step.
    WarnAndContinue,
}

/// Successful step completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSuccess {
    /// The step did its work.
    Completed(String),
    /// The step had nothing to do.
    Skipped(String),
}

/// Boxed future type returned by [`Step::run`].
pub type StepFuture<'a> =
    Pin<Box<dyn Future<Output = Result<StepSuccess, DeployError>> + Send + 'a>>;

/// One unit of work in a pipeline.
pub trait Step: Send + Sync {
    /// Short name used in status lines and logs.
    fn name(&self) -> &'static str;

    /// What a failure of this step means for the run.
    fn on_failure(&self) -> OnFailure;

    /// Execute the step.
    fn run<'a>(&'a self, ctx: &'a ReleaseContext<'a>) -> StepFuture<'a>;
}

/// Read access to the process environment for presence checks.
pub trait EnvLookup: Sync {
    /// Returns whether `key` is set to a non-blank value.
    fn is_set(&self, key: &str) -> bool;
}

impl<E: mockable::Env + Sync> EnvLookup for E {
    fn is_set(&self, key: &str) -> bool {
        self.string(key).is_some_and(|value| !value.trim().is_empty())
    }
}

/// Everything a step may use, borrowed for the duration of one run.
#[derive(Clone, Copy)]
pub struct ReleaseContext<'a> {
    /// Merged application configuration.
    pub config: &'a AppConfig,
    /// Runs external commands.
    pub runner: &'a dyn CommandRunner,
    /// Probes the database.
    pub probe: &'a dyn DatabaseProbe,
    /// Looks up environment variables.
    pub env: &'a dyn EnvLookup,
}

impl<'a> ReleaseContext<'a> {
    /// Bundle the collaborators for a run.
    #[must_use]
    pub const fn new(
        config: &'a AppConfig,
        runner: &'a dyn CommandRunner,
        probe: &'a dyn DatabaseProbe,
        env: &'a dyn EnvLookup,
    ) -> Self {
        Self {
            config,
            runner,
            probe,
            env,
        }
    }

    /// Command builder for the configured Python toolchain.
    #[must_use]
    pub fn toolchain(&self) -> Toolchain {
        Toolchain::new(self.config)
    }
}
