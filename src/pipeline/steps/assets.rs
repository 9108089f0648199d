//! Static asset collection.

use crate::error::{AssetError, DeployError};
use crate::pipeline::{OnFailure, ReleaseContext, Step, StepFuture, StepSuccess};

/// Runs `manage.py collectstatic --noinput --clear`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectStaticStep;

impl CollectStaticStep {
    async fn collect(ctx: &ReleaseContext<'_>) -> Result<StepSuccess, DeployError> {
        let spec = ctx
            .toolchain()
            .manage(["collectstatic", "--noinput", "--clear"]);
        let output = ctx.runner.run(spec).await?;
        if !output.success() {
            return Err(AssetError::CollectFailed {
                message: output.failure_summary(),
            }
            .into());
        }

        let message = output
            .stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map_or_else(|| String::from("static files collected"), str::to_owned);
        Ok(StepSuccess::Completed(message))
    }
}

impl Step for CollectStaticStep {
    fn name(&self) -> &'static str {
        "collectstatic"
    }

    fn on_failure(&self) -> OnFailure {
        OnFailure::Halt
    }

    fn run<'a>(&'a self, ctx: &'a ReleaseContext<'a>) -> StepFuture<'a> {
        Box::pin(Self::collect(ctx))
    }
}
