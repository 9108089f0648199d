//! Database connectivity step.

use std::time::Duration;

use crate::error::DeployError;
use crate::pipeline::{OnFailure, ReleaseContext, Step, StepFuture, StepSuccess};
use crate::probe::ConnectivityProber;

/// Probes the configured database before anything touches its schema.
#[derive(Debug, Clone, Copy)]
pub struct DatabaseStep {
    policy: OnFailure,
}

impl DatabaseStep {
    /// Create the step with the given failure policy.
    #[must_use]
    pub const fn new(policy: OnFailure) -> Self {
        Self { policy }
    }

    async fn probe(ctx: &ReleaseContext<'_>) -> Result<StepSuccess, DeployError> {
        let timeout = Duration::from_secs(ctx.config.database.probe_timeout_secs);
        let report = ConnectivityProber::new(ctx.probe, timeout)
            .check(ctx.config.database.url.as_deref())
            .await?;

        let mut message = format!("connected to {}", report.target);
        for warning in &report.warnings {
            message.push_str(" (warning: ");
            message.push_str(warning);
            message.push(')');
        }
        Ok(StepSuccess::Completed(message))
    }
}

impl Step for DatabaseStep {
    fn name(&self) -> &'static str {
        "database"
    }

    fn on_failure(&self) -> OnFailure {
        self.policy
    }

    fn run<'a>(&'a self, ctx: &'a ReleaseContext<'a>) -> StepFuture<'a> {
        Box::pin(Self::probe(ctx))
    }
}
