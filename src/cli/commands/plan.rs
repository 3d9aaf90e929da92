//! Plan command implementation.
//!
//! The `converge plan` command checks every step and shows what `apply`
//! would change, without changing anything.

use serde::Serialize;

use crate::cli::args::PlanArgs;
use crate::engine::{Diff, Plan, PlanSummary, Planner, RunContext, StepId, StepStatus};
use crate::error::{ConvergeError, Result};
use crate::providers::build_graph;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandContext, CommandResult, EXIT_CANCELLED, EXIT_CONFIG};
use super::load_manifest;

/// The plan command implementation.
pub struct PlanCommand {
    context: CommandContext,
    args: PlanArgs,
}

impl PlanCommand {
    /// Create a new plan command.
    pub fn new(context: CommandContext, args: PlanArgs) -> Self {
        Self { context, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &PlanArgs {
        &self.args
    }
}

/// JSON form of a plan.
#[derive(Debug, Serialize)]
struct PlanReport<'a> {
    entries: Vec<EntryReport<'a>>,
    summary: SummaryReport,
}

#[derive(Debug, Serialize)]
struct EntryReport<'a> {
    id: StepId,
    status: StepStatus,
    depends_on: Vec<StepId>,
    diff: Option<&'a Diff>,
}

#[derive(Debug, Serialize)]
struct SummaryReport {
    total: usize,
    needs_apply: usize,
    satisfied: usize,
    has_changes: bool,
}

impl<'a> PlanReport<'a> {
    fn new(plan: &'a Plan) -> Self {
        let entries = plan
            .entries()
            .iter()
            .map(|entry| EntryReport {
                id: entry.id(),
                status: entry.status(),
                depends_on: entry.step().depends_on(),
                diff: entry.needs_apply().then(|| entry.diff()),
            })
            .collect();

        Self {
            entries,
            summary: SummaryReport::new(&plan.summary(), plan.has_changes()),
        }
    }
}

impl SummaryReport {
    fn new(summary: &PlanSummary, has_changes: bool) -> Self {
        Self {
            total: summary.total(),
            needs_apply: summary.count(StepStatus::NeedsApply),
            satisfied: summary.count(StepStatus::Satisfied),
            has_changes,
        }
    }
}

impl Command for PlanCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = load_manifest(&self.context, ui)? else {
            return Ok(CommandResult::failure(EXIT_CONFIG));
        };

        let graph = build_graph(&config, self.context.project_root())?;
        let ctx = RunContext::new().with_cancellation(self.context.cancellation().clone());

        let plan = match Planner::new().plan(&ctx, &graph) {
            Ok(plan) => plan,
            Err(ConvergeError::Cancelled) => {
                ui.warning("Planning cancelled");
                return Ok(CommandResult::failure(EXIT_CANCELLED));
            }
            Err(e) => return Err(e),
        };

        if self.args.json {
            let json = serde_json::to_string_pretty(&PlanReport::new(&plan))
                .map_err(anyhow::Error::from)?;
            ui.output(&json);
            return Ok(CommandResult::success());
        }

        ui.show_header("Plan");
        for entry in plan.entries() {
            let diff = entry.needs_apply().then(|| entry.diff());
            ui.show_step(entry.status(), entry.id().as_str(), diff);
        }

        ui.message("");
        if plan.has_changes() {
            ui.message(&plan.summary().to_string());
        } else {
            ui.success(&format!(
                "Nothing to do: {} step(s) already satisfied",
                plan.len()
            ));
        }

        Ok(CommandResult::success())
    }
}
