//! Ordered snapshot of planned work.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::{Diff, Step, StepId, StepStatus};

/// One step together with its checked status and proposed diff.
#[derive(Clone)]
pub struct PlanEntry {
    step: Arc<dyn Step>,
    status: StepStatus,
    diff: Diff,
}

impl PlanEntry {
    /// Create an entry.
    pub fn new(step: Arc<dyn Step>, status: StepStatus, diff: Diff) -> Self {
        Self { step, status, diff }
    }

    /// The planned step.
    pub fn step(&self) -> &Arc<dyn Step> {
        &self.step
    }

    /// Identifier of the planned step.
    pub fn id(&self) -> StepId {
        self.step.id()
    }

    /// Status reported by the step's check.
    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Proposed change; empty unless the status is `NeedsApply`.
    pub fn diff(&self) -> &Diff {
        &self.diff
    }

    /// Whether this entry needs to be applied.
    pub fn needs_apply(&self) -> bool {
        self.status == StepStatus::NeedsApply
    }
}

impl std::fmt::Debug for PlanEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanEntry")
            .field("id", &self.step.id())
            .field("status", &self.status)
            .field("diff", &self.diff)
            .finish()
    }
}

/// Immutable, ordered result of planning.
///
/// Entries are in the topological order used to build the plan. Re-planning
/// requires a fresh [`Planner`](super::Planner) pass.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    entries: Vec<PlanEntry>,
}

impl Plan {
    /// Build a plan from entries already in execution order.
    pub fn new(entries: Vec<PlanEntry>) -> Self {
        Self { entries }
    }

    /// All entries in execution order.
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the plan has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose status is `NeedsApply`.
    pub fn needs_apply(&self) -> Vec<&PlanEntry> {
        self.entries.iter().filter(|e| e.needs_apply()).collect()
    }

    /// Whether any entry needs to be applied.
    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(PlanEntry::needs_apply)
    }

    /// Look up an entry by step ID.
    pub fn get(&self, id: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.step.id().as_str() == id)
    }

    /// Step IDs in execution order.
    pub fn step_ids(&self) -> Vec<StepId> {
        self.entries.iter().map(PlanEntry::id).collect()
    }

    /// Aggregate counts per status.
    pub fn summary(&self) -> PlanSummary {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.status).or_insert(0) += 1;
        }
        PlanSummary { counts }
    }
}

/// Counts of plan entries per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    counts: BTreeMap<StepStatus, usize>,
}

impl PlanSummary {
    /// Number of entries with the given status.
    pub fn count(&self, status: StepStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// Total number of entries.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Non-zero counts, ordered by status.
    pub fn counts(&self) -> &BTreeMap<StepStatus, usize> {
        &self.counts
    }
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} step(s): {} to apply, {} already satisfied",
            self.total(),
            self.count(StepStatus::NeedsApply),
            self.count(StepStatus::Satisfied)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ExplainContext, Explanation, RunContext};

    struct Fixed(&'static str);

    impl Step for Fixed {
        fn id(&self) -> StepId {
            StepId::new(self.0)
        }

        fn check(&self, _ctx: &RunContext) -> anyhow::Result<StepStatus> {
            Ok(StepStatus::Satisfied)
        }

        fn plan(&self, _ctx: &RunContext) -> anyhow::Result<Diff> {
            Ok(Diff::default())
        }

        fn apply(&self, _ctx: &RunContext) -> anyhow::Result<()> {
            Ok(())
        }

        fn explain(&self, _ctx: &ExplainContext) -> Explanation {
            Explanation::new(self.0, "")
        }
    }

    fn entry(id: &'static str, status: StepStatus) -> PlanEntry {
        let diff = if status == StepStatus::NeedsApply {
            Diff::add("package", id, "1.0")
        } else {
            Diff::default()
        };
        PlanEntry::new(Arc::new(Fixed(id)), status, diff)
    }

    #[test]
    fn empty_plan() {
        let plan = Plan::default();
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
        assert!(!plan.has_changes());
        assert_eq!(plan.summary().total(), 0);
    }

    #[test]
    fn needs_apply_filters_entries() {
        let plan = Plan::new(vec![
            entry("a", StepStatus::Satisfied),
            entry("b", StepStatus::NeedsApply),
            entry("c", StepStatus::NeedsApply),
        ]);

        let pending: Vec<String> = plan
            .needs_apply()
            .iter()
            .map(|e| e.id().to_string())
            .collect();
        assert_eq!(pending, vec!["b", "c"]);
        assert!(plan.has_changes());
    }

    #[test]
    fn all_satisfied_has_no_changes() {
        let plan = Plan::new(vec![
            entry("a", StepStatus::Satisfied),
            entry("b", StepStatus::Satisfied),
        ]);
        assert!(!plan.has_changes());
        assert!(plan.needs_apply().is_empty());
    }

    #[test]
    fn summary_counts_per_status() {
        let plan = Plan::new(vec![
            entry("a", StepStatus::Satisfied),
            entry("b", StepStatus::NeedsApply),
            entry("c", StepStatus::NeedsApply),
        ]);

        let summary = plan.summary();
        assert_eq!(summary.count(StepStatus::Satisfied), 1);
        assert_eq!(summary.count(StepStatus::NeedsApply), 2);
        assert_eq!(summary.count(StepStatus::Failed), 0);
        assert_eq!(summary.total(), 3);
        assert_eq!(
            summary.to_string(),
            "3 step(s): 2 to apply, 1 already satisfied"
        );
    }

    #[test]
    fn get_and_step_ids_keep_order() {
        let plan = Plan::new(vec![
            entry("b", StepStatus::Satisfied),
            entry("a", StepStatus::NeedsApply),
        ]);
        assert_eq!(plan.step_ids(), vec![StepId::new("b"), StepId::new("a")]);
        assert_eq!(plan.get("a").unwrap().status(), StepStatus::NeedsApply);
        assert!(plan.get("missing").is_none());
    }
}
