//! Reconciliation engine.
//!
//! Steps declare a desired state and how to reach it. The engine orders them
//! by dependency, asks each one whether work is needed, and applies the
//! resulting plan:
//!
//! ```text
//! StepGraph ──topological_sort──▶ Planner ──check/plan──▶ Plan ──▶ Executor
//! ```
//!
//! # Example
//!
//! ```
//! use converge::engine::{
//!     Diff, Executor, ExplainContext, Explanation, Planner, RunContext, Step, StepGraph,
//!     StepId, StepStatus,
//! };
//!
//! struct Noop;
//!
//! impl Step for Noop {
//!     fn id(&self) -> StepId {
//!         StepId::new("noop")
//!     }
//!     fn check(&self, _ctx: &RunContext) -> anyhow::Result<StepStatus> {
//!         Ok(StepStatus::NeedsApply)
//!     }
//!     fn plan(&self, _ctx: &RunContext) -> anyhow::Result<Diff> {
//!         Ok(Diff::add("example", "noop", "done"))
//!     }
//!     fn apply(&self, _ctx: &RunContext) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//!     fn explain(&self, _ctx: &ExplainContext) -> Explanation {
//!         Explanation::new("Noop", "Does nothing")
//!     }
//! }
//!
//! let mut graph = StepGraph::new();
//! graph.add(Noop).unwrap();
//!
//! let ctx = RunContext::new();
//! let plan = Planner::new().plan(&ctx, &graph).unwrap();
//! assert!(plan.has_changes());
//!
//! let result = Executor::new().execute(&ctx, &plan);
//! assert!(result.success());
//! ```

pub mod context;
pub mod diff;
pub mod executor;
pub mod graph;
pub mod id;
pub mod plan;
pub mod planner;
pub mod result;
pub mod status;
pub mod step;

pub use context::{CancellationToken, RunContext};
pub use diff::{Diff, DiffType};
pub use executor::{Executor, SkipPropagation};
pub use graph::StepGraph;
pub use id::StepId;
pub use plan::{Plan, PlanEntry, PlanSummary};
pub use planner::Planner;
pub use result::{format_duration, ExecuteResult, RollbackResult, StepResult};
pub use status::StepStatus;
pub use step::{ExplainContext, Explanation, Rollback, Step};
