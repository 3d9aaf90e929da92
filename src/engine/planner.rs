//! Turns a step graph into a plan.

use crate::error::{ConvergeError, Result};

use super::{Diff, Plan, PlanEntry, RunContext, StepGraph, StepStatus};

/// Walks a [`StepGraph`] in topological order and checks every step.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planner;

impl Planner {
    /// Create a planner.
    pub fn new() -> Self {
        Self
    }

    /// Build a plan for every step in the graph.
    ///
    /// Any check or plan error aborts the whole pass: an unknown state for
    /// one step may invalidate ordering assumptions for the rest, so no
    /// partial plan is returned. An error raised once the run is cancelled
    /// is reported as [`ConvergeError::Cancelled`].
    pub fn plan(&self, ctx: &RunContext, graph: &StepGraph) -> Result<Plan> {
        let order = graph.topological_sort()?;
        let mut entries = Vec::with_capacity(order.len());

        for step in order {
            if ctx.is_cancelled() {
                tracing::debug!("Planning cancelled before {}", step.id());
                return Err(ConvergeError::Cancelled);
            }

            let id = step.id();
            let status = step.check(ctx).map_err(|source| {
                interrupted(ctx).unwrap_or(ConvergeError::CheckFailed {
                    step: id.clone(),
                    source,
                })
            })?;

            let diff = match status {
                StepStatus::NeedsApply => step.plan(ctx).map_err(|source| {
                    interrupted(ctx).unwrap_or(ConvergeError::PlanFailed {
                        step: id.clone(),
                        source,
                    })
                })?,
                StepStatus::Satisfied => Diff::default(),
                other => {
                    return Err(ConvergeError::CheckFailed {
                        step: id,
                        source: anyhow::anyhow!("check returned invalid status '{}'", other),
                    });
                }
            };

            tracing::debug!("Planned {}: {}", id, status);
            entries.push(PlanEntry::new(step, status, diff));
        }

        Ok(Plan::new(entries))
    }
}

/// A step that fails after cancellation was most likely interrupted by it.
fn interrupted(ctx: &RunContext) -> Option<ConvergeError> {
    if ctx.is_cancelled() {
        tracing::debug!("Step error after cancellation; reporting as cancelled");
        Some(ConvergeError::Cancelled)
    } else {
        None
    }
}
