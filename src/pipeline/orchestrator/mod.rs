//! Sequential step execution.

use std::fmt;
use std::io::Write;

use tracing::Instrument;

use super::state::{RunReport, RunState, StepResult};
use super::summary::{self, InstalledPackage, key_packages};
use super::{OnFailure, ReleaseContext, Step};

/// Writes human-readable status lines.
///
/// Status output is best effort: a failed write is logged and otherwise
/// ignored so a closed stdout never changes the outcome of a release.
pub struct StatusWriter<W: Write> {
    out: W,
}

impl<W: Write> StatusWriter<W> {
    /// Wrap `out`.
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the writer and return the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write one line.
    pub fn line(&mut self, line: impl fmt::Display) {
        if let Err(error) = writeln!(self.out, "{line}") {
            tracing::warn!(%error, "failed to write status line");
        }
    }

    fn packages(&mut self, packages: &[InstalledPackage]) {
        if packages.is_empty() {
            self.line("Installed packages: none of the key packages were found");
            return;
        }
        self.line("Installed packages:");
        for package in packages {
            self.line(format_args!("  {package}"));
        }
    }
}

/// Runs a fixed list of steps in order, halting on the first fatal failure.
pub struct Orchestrator {
    label: &'static str,
    steps: Vec<Box<dyn Step>>,
    package_summary: bool,
}

impl Orchestrator {
    /// Create an orchestrator whose status lines call the run `label`.
    #[must_use]
    pub fn new(label: &'static str, steps: Vec<Box<dyn Step>>) -> Self {
        Self {
            label,
            steps,
            package_summary: false,
        }
    }

    /// List key installed packages after a completed run.
    #[must_use]
    pub const fn with_package_summary(mut self) -> Self {
        self.package_summary = true;
        self
    }

    /// Names of the steps, in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Execute every step, writing one status line per step to `out`.
    pub async fn run<W: Write>(
        &self,
        ctx: &ReleaseContext<'_>,
        out: &mut StatusWriter<W>,
    ) -> RunReport {
        let total = self.steps.len();
        let mut state = RunState::Pending;
        let mut results = Vec::with_capacity(total);

        while let Some(next) = state.advance(total) {
            state = next;
            let RunState::Running(index) = state else {
                break;
            };
            let Some(step) = self.steps.get(index) else {
                break;
            };

            let span = tracing::info_span!("step", name = step.name());
            let outcome = step.run(ctx).instrument(span).await;

            let (result, halt_reason) = match outcome {
                Ok(success) => {
                    tracing::info!(step = step.name(), ?success, "step finished");
                    (StepResult::from_success(step.name(), success), None)
                }
                Err(error) => {
                    let kind = error.kind();
                    let policy = step.on_failure();
                    if policy == OnFailure::Halt {
                        tracing::error!(step = step.name(), ?kind, %error, "step failed");
                    } else {
                        tracing::warn!(step = step.name(), ?kind, %error, "step failed, continuing");
                    }
                    let result = StepResult::from_error(step.name(), policy, &error);
                    (result, (policy == OnFailure::Halt).then(|| error.to_string()))
                }
            };
            out.line(&result);
            results.push(result);

            if let Some(reason) = halt_reason
                && let Some(halted) = state.halt(step.name(), reason)
            {
                state = halted;
            }
        }

        let packages = match state {
            RunState::Halted { step, .. } => {
                out.line(format_args!("❌ {} halted at step '{step}'", self.label));
                Vec::new()
            }
            _ => {
                out.line(format_args!("✅ {} completed", self.label));
                if self.package_summary {
                    self.summarise(ctx, out).await
                } else {
                    Vec::new()
                }
            }
        };

        RunReport::new(state, results, packages)
    }

    async fn summarise<W: Write>(
        &self,
        ctx: &ReleaseContext<'_>,
        out: &mut StatusWriter<W>,
    ) -> Vec<InstalledPackage> {
        match summary::installed_packages(ctx).await {
            Ok(installed) => {
                let packages = key_packages(&installed, &ctx.config.report.packages);
                out.packages(&packages);
                packages
            }
            Err(error) => {
                tracing::warn!(%error, "could not list installed packages");
                out.line(format_args!("⚠️ package summary unavailable: {error}"));
                Vec::new()
            }
        }
    }
}
