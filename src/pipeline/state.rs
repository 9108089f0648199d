//! Run state machine and step results.

use std::fmt;

use super::{InstalledPackage, OnFailure, StepSuccess};
use crate::error::DeployError;

/// Lifecycle of a pipeline run.
///
/// `Pending -> Running(0) -> ... -> Running(n-1) -> Completed`, or
/// `Running(i) -> Halted` on a fatal failure. `Halted` and `Completed` are
/// terminal; transition methods return `None` from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// No step has started.
    Pending,
    /// The step at this index is executing.
    Running(usize),
    /// A fatal step failure stopped the run.
    Halted {
        /// The step that failed.
        step: &'static str,
        /// Why it failed.
        reason: String,
    },
    /// Every step ran.
    Completed,
}

impl RunState {
    /// Move to the next step, or to `Completed` after the last of `total`.
    #[must_use]
    pub const fn advance(&self, total: usize) -> Option<Self> {
        let next = match *self {
            Self::Pending => 0,
            Self::Running(index) => index + 1,
            Self::Halted { .. } | Self::Completed => return None,
        };
        if next < total {
            Some(Self::Running(next))
        } else {
            Some(Self::Completed)
        }
    }

    /// Stop the run because `step` failed fatally.
    #[must_use]
    pub fn halt(&self, step: &'static str, reason: impl Into<String>) -> Option<Self> {
        match *self {
            Self::Running(_) => Some(Self::Halted {
                step,
                reason: reason.into(),
            }),
            _ => None,
        }
    }

    /// Returns whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Halted { .. } | Self::Completed)
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step did its work.
    Success,
    /// The step had nothing to do.
    Skipped,
    /// The step failed but its policy lets the run continue.
    Warning,
    /// The step failed and halted the run.
    Failure,
}

impl StepOutcome {
    /// Status glyph shown before the step name.
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Success => "✅",
            Self::Skipped => "⏭️",
            Self::Warning => "⚠️",
            Self::Failure => "❌",
        }
    }
}

/// Immutable record of one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    step: &'static str,
    outcome: StepOutcome,
    message: String,
    hint: Option<&'static str>,
}

impl StepResult {
    /// Record a successful or skipped step.
    #[must_use]
    pub fn from_success(step: &'static str, success: StepSuccess) -> Self {
        let (outcome, message) = match success {
            StepSuccess::Completed(message) => (StepOutcome::Success, message),
            StepSuccess::Skipped(message) => (StepOutcome::Skipped, message),
        };
        Self {
            step,
            outcome,
            message,
            hint: None,
        }
    }

    /// Record a failed step under its declared policy.
    #[must_use]
    pub fn from_error(step: &'static str, policy: OnFailure, error: &DeployError) -> Self {
        let outcome = match policy {
            OnFailure::Halt => StepOutcome::Failure,
            OnFailure::WarnAndContinue => StepOutcome::Warning,
        };
        Self {
            step,
            outcome,
            message: error.to_string(),
            hint: error.hint(),
        }
    }

    /// The step name.
    #[must_use]
    pub const fn step(&self) -> &'static str {
        self.step
    }

    /// The outcome.
    #[must_use]
    pub const fn outcome(&self) -> StepOutcome {
        self.outcome
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The remediation hint, if the failure has one.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.hint
    }

    /// Returns whether the step failed, fatally or not.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.outcome, StepOutcome::Warning | StepOutcome::Failure)
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.outcome.glyph(),
            self.step,
            self.message
        )?;
        if let Some(hint) = self.hint {
            write!(f, "\n    Hint: {hint}")?;
        }
        Ok(())
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    state: RunState,
    results: Vec<StepResult>,
    packages: Vec<InstalledPackage>,
}

impl RunReport {
    pub(crate) const fn new(
        state: RunState,
        results: Vec<StepResult>,
        packages: Vec<InstalledPackage>,
    ) -> Self {
        Self {
            state,
            results,
            packages,
        }
    }

    /// The terminal state.
    #[must_use]
    pub const fn state(&self) -> &RunState {
        &self.state
    }

    /// Per-step results in execution order.
    #[must_use]
    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    /// Key packages found after a completed build.
    #[must_use]
    pub fn packages(&self) -> &[InstalledPackage] {
        &self.packages
    }

    /// Returns the result recorded for `step`, if it ran.
    #[must_use]
    pub fn result_for(&self, step: &str) -> Option<&StepResult> {
        self.results.iter().find(|result| result.step == step)
    }

    /// Returns whether the run was halted by a fatal failure.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        matches!(self.state, RunState::Halted { .. })
    }

    /// Returns whether any step failed, fatally or not.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(StepResult::is_failure)
    }

    /// Process exit code: non-zero only when the run halted.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.is_halted() { 1 } else { 0 }
    }
}
