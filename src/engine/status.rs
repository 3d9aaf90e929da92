//! Per-run step lifecycle state.

use serde::{Deserialize, Serialize};

/// Status of a step within one run.
///
/// `Unknown` moves to `Satisfied` or `NeedsApply` during planning, and to
/// `Satisfied`, `Failed` or `Skipped` during execution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not inspected yet.
    #[default]
    Unknown,

    /// Current state already matches the desired state.
    Satisfied,

    /// A change is required.
    NeedsApply,

    /// Applying the change failed.
    Failed,

    /// Not attempted because a dependency failed.
    Skipped,
}

impl StepStatus {
    /// Check if this is a terminal state (no more changes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Satisfied | StepStatus::Failed | StepStatus::Skipped
        )
    }

    /// Get a display character for this status.
    pub fn display_char(&self) -> char {
        match self {
            StepStatus::Unknown => '?',
            StepStatus::Satisfied => '✓',
            StepStatus::NeedsApply => '○',
            StepStatus::Failed => '✗',
            StepStatus::Skipped => '⊘',
        }
    }

    /// All statuses, in declaration order.
    pub fn all() -> [StepStatus; 5] {
        [
            StepStatus::Unknown,
            StepStatus::Satisfied,
            StepStatus::NeedsApply,
            StepStatus::Failed,
            StepStatus::Skipped,
        ]
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Unknown => "unknown",
            StepStatus::Satisfied => "satisfied",
            StepStatus::NeedsApply => "needs_apply",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}
