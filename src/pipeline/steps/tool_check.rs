//! Optional tool and interpreter version check.

use crate::error::{DependencyError, DeployError, ProcessError};
use crate::pipeline::{OnFailure, ReleaseContext, Step, StepFuture, StepSuccess};

/// Verifies the configured tool (by default `gunicorn`) runs from the
/// virtual environment, and that the interpreter matches `PYTHON_VERSION`
/// when one is pinned. Never halts the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolCheckStep;

impl ToolCheckStep {
    async fn check(ctx: &ReleaseContext<'_>) -> Result<StepSuccess, DeployError> {
        let toolchain = ctx.toolchain();
        let mut notes = Vec::new();

        if let Some(ref pinned) = ctx.config.runtime.python_version {
            let output = ctx
                .runner
                .run(toolchain.tool("python", ["--version"]))
                .await?;
            let reported = format!("{}{}", output.stdout, output.stderr);
            let actual = reported
                .trim()
                .strip_prefix("Python ")
                .unwrap_or_else(|| reported.trim())
                .to_owned();
            if !version_matches(pinned, &actual) {
                return Err(DependencyError::VersionMismatch {
                    expected: pinned.clone(),
                    actual,
                }
                .into());
            }
            notes.push(format!("Python {actual}"));
        }

        let Some(ref tool) = ctx.config.runtime.tool else {
            return Ok(if notes.is_empty() {
                StepSuccess::Skipped(String::from("no tool configured"))
            } else {
                StepSuccess::Completed(notes.join(", "))
            });
        };

        let output = match ctx.runner.run(toolchain.tool(tool, ["--version"])).await {
            Ok(output) => output,
            Err(ProcessError::NotFound { .. }) => {
                return Err(unavailable(tool, "not installed in the virtual environment"));
            }
            Err(other) => return Err(other.into()),
        };
        if !output.success() {
            return Err(unavailable(tool, &output.failure_summary()));
        }

        let version = first_line(&output.stdout)
            .or_else(|| first_line(&output.stderr))
            .unwrap_or("version unknown");
        notes.push(version.to_owned());
        Ok(StepSuccess::Completed(notes.join(", ")))
    }
}

impl Step for ToolCheckStep {
    fn name(&self) -> &'static str {
        "tool"
    }

    fn on_failure(&self) -> OnFailure {
        OnFailure::WarnAndContinue
    }

    fn run<'a>(&'a self, ctx: &'a ReleaseContext<'a>) -> StepFuture<'a> {
        Box::pin(Self::check(ctx))
    }
}

fn unavailable(tool: &str, message: &str) -> DeployError {
    DependencyError::ToolUnavailable {
        tool: tool.to_owned(),
        message: message.to_owned(),
    }
    .into()
}

fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

/// A pin of `3.11` accepts any `3.11.x`; a full pin must match exactly.
fn version_matches(pinned: &str, actual: &str) -> bool {
    let pin = pinned.trim();
    actual == pin
        || actual
            .strip_prefix(pin)
            .is_some_and(|rest| rest.starts_with('.'))
}
