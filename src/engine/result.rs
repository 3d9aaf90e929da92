//! Outcomes of executing and rolling back steps.

use std::time::Duration;

use super::{Diff, StepId, StepStatus};

/// Result of executing one plan entry.
#[derive(Debug)]
pub struct StepResult {
    /// Step identifier.
    pub step_id: StepId,

    /// Final status for this run.
    pub status: StepStatus,

    /// Apply error (only for `Failed`).
    pub error: Option<anyhow::Error>,

    /// Time spent in `apply` (zero when apply was not called).
    pub duration: Duration,

    /// The planned diff this result corresponds to.
    pub diff: Diff,

    /// Whether `apply` was called.
    pub applied: bool,
}

impl StepResult {
    /// Step was applied successfully.
    pub fn applied(step_id: StepId, duration: Duration, diff: Diff) -> Self {
        Self {
            step_id,
            status: StepStatus::Satisfied,
            error: None,
            duration,
            diff,
            applied: true,
        }
    }

    /// Step was already satisfied; nothing was applied.
    pub fn already_satisfied(step_id: StepId) -> Self {
        Self {
            step_id,
            status: StepStatus::Satisfied,
            error: None,
            duration: Duration::ZERO,
            diff: Diff::default(),
            applied: false,
        }
    }

    /// Step failed to apply.
    pub fn failed(step_id: StepId, duration: Duration, diff: Diff, error: anyhow::Error) -> Self {
        Self {
            step_id,
            status: StepStatus::Failed,
            error: Some(error),
            duration,
            diff,
            applied: true,
        }
    }

    /// Step was not attempted because a dependency failed.
    pub fn skipped(step_id: StepId, diff: Diff) -> Self {
        Self {
            step_id,
            status: StepStatus::Skipped,
            error: None,
            duration: Duration::ZERO,
            diff,
            applied: false,
        }
    }

    /// Dry-run preview: the planned status and diff, unchanged.
    pub fn preview(step_id: StepId, status: StepStatus, diff: Diff) -> Self {
        Self {
            step_id,
            status,
            error: None,
            duration: Duration::ZERO,
            diff,
            applied: false,
        }
    }

    /// Whether the step ended up satisfied.
    pub fn success(&self) -> bool {
        self.status == StepStatus::Satisfied
    }

    /// Generate a summary line for display.
    pub fn summary_line(&self) -> String {
        let marker = self.status.display_char();

        match self.status {
            StepStatus::Satisfied if !self.applied => {
                format!("{} {} (already satisfied)", marker, self.step_id)
            }
            StepStatus::Satisfied => {
                format!(
                    "{} {} ({})",
                    marker,
                    self.step_id,
                    format_duration(self.duration)
                )
            }
            StepStatus::Failed => {
                let error = self
                    .error
                    .as_ref()
                    .map(|e| format!("{:#}", e))
                    .unwrap_or_else(|| "unknown error".to_string());
                format!("{} {} - {}", marker, self.step_id, error)
            }
            StepStatus::Skipped => {
                format!("{} {} (skipped: dependency failed)", marker, self.step_id)
            }
            StepStatus::NeedsApply if !self.diff.is_empty() => {
                format!("{} {} (would apply: {})", marker, self.step_id, self.diff)
            }
            _ => format!("{} {} ({})", marker, self.step_id, self.status),
        }
    }
}

/// Result of rolling back one previously-applied step.
///
/// `success == false` with no error means rollback is not supported by the
/// step (not attempted); with an error it means rollback was attempted and
/// failed.
#[derive(Debug)]
pub struct RollbackResult {
    /// Step identifier.
    pub step_id: StepId,

    /// Whether the rollback ran and succeeded.
    pub success: bool,

    /// Rollback error, if one was attempted and failed.
    pub error: Option<anyhow::Error>,

    /// Time spent in `rollback`.
    pub duration: Duration,
}

impl RollbackResult {
    /// Rollback ran and succeeded.
    pub fn succeeded(step_id: StepId, duration: Duration) -> Self {
        Self {
            step_id,
            success: true,
            error: None,
            duration,
        }
    }

    /// Rollback ran and failed.
    pub fn failed(step_id: StepId, duration: Duration, error: anyhow::Error) -> Self {
        Self {
            step_id,
            success: false,
            error: Some(error),
            duration,
        }
    }

    /// The step cannot be rolled back; nothing was attempted.
    pub fn not_supported(step_id: StepId) -> Self {
        Self {
            step_id,
            success: false,
            error: None,
            duration: Duration::ZERO,
        }
    }

    /// Whether a rollback was actually attempted.
    pub fn is_attempted(&self) -> bool {
        self.success || self.error.is_some()
    }

    /// Generate a summary line for display.
    pub fn summary_line(&self) -> String {
        match (&self.error, self.success) {
            (_, true) => format!(
                "↺ {} rolled back ({})",
                self.step_id,
                format_duration(self.duration)
            ),
            (Some(e), false) => format!("✗ {} rollback failed - {:#}", self.step_id, e),
            (None, false) => format!("○ {} (rollback not supported)", self.step_id),
        }
    }
}

/// Outcome of one [`Executor::execute`](super::Executor::execute) call.
#[derive(Debug, Default)]
pub struct ExecuteResult {
    pub(crate) results: Vec<StepResult>,
    pub(crate) rollback_results: Vec<RollbackResult>,
    pub(crate) rolled_back: bool,
    pub(crate) cancelled: bool,
}

impl ExecuteResult {
    /// Per-step results in plan order.
    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    /// Rollback results in rollback order (reverse of application).
    pub fn rollback_results(&self) -> &[RollbackResult] {
        &self.rollback_results
    }

    /// Whether the rollback sweep ran.
    pub fn rolled_back(&self) -> bool {
        self.rolled_back
    }

    /// Whether the walk stopped early because the run was cancelled.
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    /// Result for one step, if it was reached.
    pub fn get(&self, id: &str) -> Option<&StepResult> {
        self.results.iter().find(|r| r.step_id.as_str() == id)
    }

    /// Results with status `Failed`.
    pub fn failed(&self) -> Vec<&StepResult> {
        self.with_status(StepStatus::Failed)
    }

    /// Results with status `Skipped`.
    pub fn skipped(&self) -> Vec<&StepResult> {
        self.with_status(StepStatus::Skipped)
    }

    /// Whether any step failed.
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.status == StepStatus::Failed)
    }

    /// Number of steps whose `apply` ran and succeeded.
    pub fn applied_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.success() && r.applied)
            .count()
    }

    /// Whether the run finished with nothing failed, skipped or cancelled.
    pub fn success(&self) -> bool {
        !self.cancelled
            && self
                .results
                .iter()
                .all(|r| !matches!(r.status, StepStatus::Failed | StepStatus::Skipped))
    }

    /// Total time spent applying and rolling back.
    pub fn total_duration(&self) -> Duration {
        self.results.iter().map(|r| r.duration).sum::<Duration>()
            + self
                .rollback_results
                .iter()
                .map(|r| r.duration)
                .sum::<Duration>()
    }

    fn with_status(&self, status: StepStatus) -> Vec<&StepResult> {
        self.results.iter().filter(|r| r.status == status).collect()
    }
}

/// Format a duration for display.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{}s", secs, millis / 100)
    } else {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}
