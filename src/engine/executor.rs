//! Applies a plan in order, with skip propagation, dry-run and rollback.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::{
    ExecuteResult, Plan, PlanEntry, RollbackResult, RunContext, Step, StepId, StepResult,
    StepStatus,
};

/// How a dependency failure blocks later steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipPropagation {
    /// Skip steps whose dependency failed or was itself skipped.
    #[default]
    Transitive,
    /// Skip only steps whose direct dependency failed.
    Direct,
}

impl std::str::FromStr for SkipPropagation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transitive" => Ok(Self::Transitive),
            "direct" => Ok(Self::Direct),
            _ => Err(format!("unknown skip propagation: {}", s)),
        }
    }
}

/// Applies a [`Plan`].
///
/// Configuration is immutable; each `with_*` method returns a new executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor {
    dry_run: bool,
    rollback_on_failure: bool,
    skip_propagation: SkipPropagation,
}

impl Executor {
    /// An executor that applies changes and does not roll back.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report planned changes without applying them.
    pub fn with_dry_run(self, dry_run: bool) -> Self {
        Self { dry_run, ..self }
    }

    /// Stop at the first failure and undo what was applied.
    pub fn with_rollback_on_failure(self, rollback_on_failure: bool) -> Self {
        Self {
            rollback_on_failure,
            ..self
        }
    }

    /// Choose how failures block dependent steps.
    pub fn with_skip_propagation(self, skip_propagation: SkipPropagation) -> Self {
        Self {
            skip_propagation,
            ..self
        }
    }

    /// Whether this executor only previews.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Whether failures trigger the rollback sweep.
    pub fn rollback_on_failure(&self) -> bool {
        self.rollback_on_failure
    }

    /// The configured skip propagation.
    pub fn skip_propagation(&self) -> SkipPropagation {
        self.skip_propagation
    }

    /// Execute all plan entries in their fixed order.
    ///
    /// Apply errors are captured per step and never abort the call.
    /// Cancellation is checked before each entry and after a failed apply; a
    /// cancelled run returns the results gathered so far and is never rolled
    /// back.
    pub fn execute(&self, ctx: &RunContext, plan: &Plan) -> ExecuteResult {
        let dry_run = self.dry_run || ctx.is_dry_run();
        let mut outcome = ExecuteResult::default();
        let mut failed: HashSet<StepId> = HashSet::new();
        let mut blocked: HashSet<StepId> = HashSet::new();
        let mut applied: Vec<Arc<dyn Step>> = Vec::new();

        tracing::debug!(
            "Executing plan with {} entries (dry_run={}, rollback_on_failure={})",
            plan.len(),
            dry_run,
            self.rollback_on_failure
        );

        for entry in plan.entries() {
            if ctx.is_cancelled() {
                tracing::warn!(
                    "Run cancelled after {} of {} steps",
                    outcome.results.len(),
                    plan.len()
                );
                outcome.cancelled = true;
                break;
            }

            let id = entry.id();

            if self.is_blocked(entry, &failed, &blocked) {
                tracing::debug!("Skipping {}: dependency did not succeed", id);
                blocked.insert(id.clone());
                outcome
                    .results
                    .push(StepResult::skipped(id, entry.diff().clone()));
                continue;
            }

            if entry.status() == StepStatus::Satisfied {
                tracing::debug!("{} already satisfied", id);
                outcome.results.push(StepResult::already_satisfied(id));
                continue;
            }

            if dry_run {
                outcome.results.push(StepResult::preview(
                    id,
                    entry.status(),
                    entry.diff().clone(),
                ));
                continue;
            }

            let start = Instant::now();
            match entry.step().apply(ctx) {
                Ok(()) => {
                    let duration = start.elapsed();
                    tracing::debug!("Applied {} in {:?}", id, duration);
                    applied.push(Arc::clone(entry.step()));
                    outcome
                        .results
                        .push(StepResult::applied(id, duration, entry.diff().clone()));
                }
                Err(error) => {
                    let duration = start.elapsed();
                    tracing::warn!("Apply failed for {}: {:#}", id, error);
                    failed.insert(id.clone());
                    blocked.insert(id.clone());
                    outcome.results.push(StepResult::failed(
                        id,
                        duration,
                        entry.diff().clone(),
                        error,
                    ));

                    // A step interrupted by cancellation counts as a cancelled run.
                    if ctx.is_cancelled() {
                        outcome.cancelled = true;
                        break;
                    }

                    if self.rollback_on_failure {
                        break;
                    }
                }
            }
        }

        if self.rollback_on_failure
            && !outcome.cancelled
            && !failed.is_empty()
            && !applied.is_empty()
        {
            outcome.rollback_results = self.rollback(ctx, &applied);
            outcome.rolled_back = true;
        }

        outcome
    }

    fn is_blocked(
        &self,
        entry: &PlanEntry,
        failed: &HashSet<StepId>,
        blocked: &HashSet<StepId>,
    ) -> bool {
        let stop = match self.skip_propagation {
            SkipPropagation::Transitive => blocked,
            SkipPropagation::Direct => failed,
        };
        entry
            .step()
            .depends_on()
            .iter()
            .any(|dep| stop.contains(dep))
    }

    /// Undo applied steps in exact reverse order of application.
    fn rollback(&self, ctx: &RunContext, applied: &[Arc<dyn Step>]) -> Vec<RollbackResult> {
        tracing::info!("Rolling back {} applied step(s)", applied.len());

        applied
            .iter()
            .rev()
            .map(|step| {
                let id = step.id();
                let capability = match step.as_rollback() {
                    Some(capability) if capability.can_rollback() => capability,
                    _ => {
                        tracing::debug!("{} does not support rollback", id);
                        return RollbackResult::not_supported(id);
                    }
                };

                let start = Instant::now();
                match capability.rollback(ctx) {
                    Ok(()) => RollbackResult::succeeded(id, start.elapsed()),
                    Err(error) => {
                        tracing::warn!("Rollback failed for {}: {:#}", id, error);
                        RollbackResult::failed(id, start.elapsed(), error)
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        Diff, ExplainContext, Explanation, Planner, Rollback, StepGraph,
    };
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Scripted {
        id: &'static str,
        deps: Vec<&'static str>,
        status: StepStatus,
        fail_apply: bool,
        rollback: Option<bool>,
        log: Log,
    }

    impl Scripted {
        fn new(id: &'static str, log: &Log) -> Self {
            Self {
                id,
                deps: Vec::new(),
                status: StepStatus::NeedsApply,
                fail_apply: false,
                rollback: None,
                log: Arc::clone(log),
            }
        }

        fn after(mut self, deps: &[&'static str]) -> Self {
            self.deps = deps.to_vec();
            self
        }

        fn failing(mut self) -> Self {
            self.fail_apply = true;
            self
        }

        fn satisfied(mut self) -> Self {
            self.status = StepStatus::Satisfied;
            self
        }

        fn rollbackable(mut self, succeeds: bool) -> Self {
            self.rollback = Some(succeeds);
            self
        }
    }

    impl Step for Scripted {
        fn id(&self) -> StepId {
            StepId::new(self.id)
        }

        fn depends_on(&self) -> Vec<StepId> {
            self.deps.iter().map(|d| StepId::new(*d)).collect()
        }

        fn check(&self, _ctx: &RunContext) -> anyhow::Result<StepStatus> {
            Ok(self.status)
        }

        fn plan(&self, _ctx: &RunContext) -> anyhow::Result<Diff> {
            Ok(Diff::add("test", self.id, "present"))
        }

        fn apply(&self, _ctx: &RunContext) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("apply:{}", self.id));
            if self.fail_apply {
                anyhow::bail!("{} exploded", self.id);
            }
            Ok(())
        }

        fn explain(&self, _ctx: &ExplainContext) -> Explanation {
            Explanation::new(self.id, "")
        }

        fn as_rollback(&self) -> Option<&dyn Rollback> {
            self.rollback.map(|_| self as &dyn Rollback)
        }
    }

    impl Rollback for Scripted {
        fn can_rollback(&self) -> bool {
            self.rollback.is_some()
        }

        fn rollback(&self, _ctx: &RunContext) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("rollback:{}", self.id));
            match self.rollback {
                Some(true) => Ok(()),
                _ => anyhow::bail!("cannot undo {}", self.id),
            }
        }
    }

    fn plan_of(steps: Vec<Scripted>) -> Plan {
        let mut graph = StepGraph::new();
        for step in steps {
            graph.add(step).unwrap();
        }
        Planner::new().plan(&RunContext::new(), &graph).unwrap()
    }

    fn statuses(result: &ExecuteResult) -> Vec<(String, StepStatus)> {
        result
            .results()
            .iter()
            .map(|r| (r.step_id.to_string(), r.status))
            .collect()
    }

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn empty_plan_returns_no_results() {
        let result = Executor::new().execute(&RunContext::new(), &Plan::default());
        assert!(result.results().is_empty());
        assert!(!result.rolled_back());
    }

    #[test]
    fn applies_in_plan_order() {
        let log = log();
        let plan = plan_of(vec![
            Scripted::new("c", &log).after(&["b"]),
            Scripted::new("b", &log).after(&["a"]),
            Scripted::new("a", &log),
        ]);

        let result = Executor::new().execute(&RunContext::new(), &plan);

        assert_eq!(
            statuses(&result),
            vec![
                ("a".to_string(), StepStatus::Satisfied),
                ("b".to_string(), StepStatus::Satisfied),
                ("c".to_string(), StepStatus::Satisfied),
            ]
        );
        assert_eq!(*log.lock().unwrap(), vec!["apply:a", "apply:b", "apply:c"]);
        assert!(result.success());
    }

    #[test]
    fn satisfied_entries_never_apply() {
        let log = log();
        let plan = plan_of(vec![Scripted::new("a", &log).satisfied()]);

        let result = Executor::new().execute(&RunContext::new(), &plan);

        assert!(result.results()[0].success());
        assert!(!result.results()[0].applied);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn failure_skips_direct_dependents_and_continues_unrelated() {
        let log = log();
        let plan = plan_of(vec![
            Scripted::new("a", &log).failing(),
            Scripted::new("b", &log).after(&["a"]),
            Scripted::new("c", &log),
        ]);

        let result = Executor::new().execute(&RunContext::new(), &plan);

        assert_eq!(
            statuses(&result),
            vec![
                ("a".to_string(), StepStatus::Failed),
                ("b".to_string(), StepStatus::Skipped),
                ("c".to_string(), StepStatus::Satisfied),
            ]
        );
        assert!(result.results()[0].error.is_some());
        assert!(!result.rolled_back());
    }

    #[test]
    fn transitive_skip_by_default() {
        let log = log();
        let plan = plan_of(vec![
            Scripted::new("a", &log).failing(),
            Scripted::new("b", &log).after(&["a"]),
            Scripted::new("c", &log).after(&["b"]),
        ]);

        let result = Executor::new().execute(&RunContext::new(), &plan);

        assert_eq!(result.get("c").unwrap().status, StepStatus::Skipped);
        assert_eq!(*log.lock().unwrap(), vec!["apply:a"]);
    }

    #[test]
    fn direct_skip_propagation_runs_grandchildren() {
        let log = log();
        let plan = plan_of(vec![
            Scripted::new("a", &log).failing(),
            Scripted::new("b", &log).after(&["a"]),
            Scripted::new("c", &log).after(&["b"]),
        ]);

        let result = Executor::new()
            .with_skip_propagation(SkipPropagation::Direct)
            .execute(&RunContext::new(), &plan);

        assert_eq!(result.get("b").unwrap().status, StepStatus::Skipped);
        assert_eq!(result.get("c").unwrap().status, StepStatus::Satisfied);
    }

    #[test]
    fn dry_run_never_applies() {
        let log = log();
        let plan = plan_of(vec![
            Scripted::new("a", &log),
            Scripted::new("b", &log).satisfied(),
        ]);

        let result = Executor::new()
            .with_dry_run(true)
            .execute(&RunContext::new(), &plan);

        assert!(log.lock().unwrap().is_empty());
        let a = result.get("a").unwrap();
        assert_eq!(a.status, StepStatus::NeedsApply);
        assert_eq!(&a.diff, plan.get("a").unwrap().diff());
        assert!(result.get("b").unwrap().success());
    }

    #[test]
    fn dry_run_context_never_applies() {
        let log = log();
        let plan = plan_of(vec![Scripted::new("a", &log)]);

        let ctx = RunContext::new().with_dry_run(true);
        let result = Executor::new().execute(&ctx, &plan);

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(result.results()[0].status, StepStatus::NeedsApply);
    }

    #[test]
    fn rollback_in_reverse_order_of_application() {
        let log = log();
        let plan = plan_of(vec![
            Scripted::new("a", &log).rollbackable(true),
            Scripted::new("b", &log).after(&["a"]).rollbackable(true),
            Scripted::new("c", &log).after(&["b"]).failing(),
        ]);

        let result = Executor::new()
            .with_rollback_on_failure(true)
            .execute(&RunContext::new(), &plan);

        assert!(result.rolled_back());
        let rolled: Vec<(String, bool)> = result
            .rollback_results()
            .iter()
            .map(|r| (r.step_id.to_string(), r.success))
            .collect();
        assert_eq!(
            rolled,
            vec![("b".to_string(), true), ("a".to_string(), true)]
        );
        assert_eq!(
            *log.lock().unwrap(),
            vec!["apply:a", "apply:b", "apply:c", "rollback:b", "rollback:a"]
        );
    }

    #[test]
    fn rollback_stops_walk_at_first_failure() {
        let log = log();
        let plan = plan_of(vec![
            Scripted::new("a", &log).rollbackable(true),
            Scripted::new("b", &log).failing(),
            Scripted::new("c", &log),
        ]);

        let result = Executor::new()
            .with_rollback_on_failure(true)
            .execute(&RunContext::new(), &plan);

        assert_eq!(result.results().len(), 2);
        assert!(result.get("c").is_none());
        assert_eq!(result.rollback_results().len(), 1);
    }

    #[test]
    fn rollback_gating_and_failures_do_not_stop_sweep() {
        let log = log();
        let plan = plan_of(vec![
            Scripted::new("a", &log).rollbackable(true),
            Scripted::new("b", &log),
            Scripted::new("c", &log).rollbackable(false),
            Scripted::new("d", &log).failing(),
        ]);

        let result = Executor::new()
            .with_rollback_on_failure(true)
            .execute(&RunContext::new(), &plan);

        let rollbacks = result.rollback_results();
        assert_eq!(rollbacks.len(), 3);

        assert_eq!(rollbacks[0].step_id.as_str(), "c");
        assert!(!rollbacks[0].success);
        assert!(rollbacks[0].error.is_some());

        assert_eq!(rollbacks[1].step_id.as_str(), "b");
        assert!(!rollbacks[1].success);
        assert!(rollbacks[1].error.is_none());

        assert_eq!(rollbacks[2].step_id.as_str(), "a");
        assert!(rollbacks[2].success);
    }

    #[test]
    fn no_rollback_when_nothing_was_applied() {
        let log = log();
        let plan = plan_of(vec![Scripted::new("a", &log).failing()]);

        let result = Executor::new()
            .with_rollback_on_failure(true)
            .execute(&RunContext::new(), &plan);

        assert!(!result.rolled_back());
        assert!(result.rollback_results().is_empty());
    }

    #[test]
    fn no_rollback_without_opt_in() {
        let log = log();
        let plan = plan_of(vec![
            Scripted::new("a", &log).rollbackable(true),
            Scripted::new("b", &log).failing(),
        ]);

        let result = Executor::new().execute(&RunContext::new(), &plan);

        assert!(!result.rolled_back());
        assert!(!log.lock().unwrap().iter().any(|e| e.starts_with("rollback")));
    }

    #[test]
    fn cancellation_returns_partial_results_without_rollback() {
        let log = log();
        let plan = plan_of(vec![
            Scripted::new("a", &log).rollbackable(true),
            Scripted::new("b", &log),
        ]);

        let ctx = RunContext::new();
        ctx.cancellation().cancel();

        let result = Executor::new()
            .with_rollback_on_failure(true)
            .execute(&ctx, &plan);

        assert!(result.cancelled());
        assert!(result.results().is_empty());
        assert!(!result.rolled_back());
        assert!(log.lock().unwrap().is_empty());
    }

    struct Interrupted;

    impl Step for Interrupted {
        fn id(&self) -> StepId {
            StepId::new("interrupted")
        }

        fn depends_on(&self) -> Vec<StepId> {
            vec![StepId::new("a")]
        }

        fn check(&self, _ctx: &RunContext) -> anyhow::Result<StepStatus> {
            Ok(StepStatus::NeedsApply)
        }

        fn plan(&self, _ctx: &RunContext) -> anyhow::Result<Diff> {
            Ok(Diff::default())
        }

        fn apply(&self, ctx: &RunContext) -> anyhow::Result<()> {
            ctx.cancellation().cancel();
            anyhow::bail!("interrupted")
        }

        fn explain(&self, _ctx: &ExplainContext) -> Explanation {
            Explanation::default()
        }
    }

    #[test]
    fn cancellation_during_apply_skips_rollback() {
        let log = log();
        let mut graph = StepGraph::new();
        graph.add(Scripted::new("a", &log).rollbackable(true)).unwrap();
        graph.add(Interrupted).unwrap();
        graph.add(Scripted::new("z", &log).after(&["a"])).unwrap();
        let plan = Planner::new().plan(&RunContext::new(), &graph).unwrap();

        let result = Executor::new()
            .with_rollback_on_failure(true)
            .execute(&RunContext::new(), &plan);

        assert!(result.cancelled());
        assert!(!result.rolled_back());
        assert_eq!(result.get("interrupted").unwrap().status, StepStatus::Failed);
        assert!(result.get("z").is_none());
        assert_eq!(*log.lock().unwrap(), vec!["apply:a"]);
    }

    #[test]
    fn skip_propagation_parses() {
        assert_eq!("direct".parse::<SkipPropagation>(), Ok(SkipPropagation::Direct));
        assert_eq!(
            "Transitive".parse::<SkipPropagation>(),
            Ok(SkipPropagation::Transitive)
        );
        assert!("sideways".parse::<SkipPropagation>().is_err());
    }
}
