//! Apply command implementation.
//!
//! The `converge apply` command plans, then executes the plan, optionally
//! rolling back on failure.

use std::time::Duration;

use crate::cli::args::ApplyArgs;
use crate::config::Settings;
use crate::engine::{
    format_duration, ExecuteResult, Executor, Planner, RunContext, StepResult, StepStatus,
};
use crate::error::{ConvergeError, Result};
use crate::providers::build_graph;
use crate::ui::UserInterface;

use super::dispatcher::{
    Command, CommandContext, CommandResult, EXIT_CANCELLED, EXIT_CONFIG, EXIT_FAILURE,
};
use super::load_manifest;

/// The apply command implementation.
pub struct ApplyCommand {
    context: CommandContext,
    args: ApplyArgs,
}

impl ApplyCommand {
    /// Create a new apply command.
    pub fn new(context: CommandContext, args: ApplyArgs) -> Self {
        Self { context, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &ApplyArgs {
        &self.args
    }

    /// Executor configured from manifest settings, with flags taking precedence.
    fn executor(&self, settings: &Settings) -> Executor {
        Executor::new()
            .with_dry_run(self.args.dry_run)
            .with_rollback_on_failure(self.args.rollback_on_failure || settings.rollback_on_failure)
            .with_skip_propagation(
                self.args
                    .skip_propagation
                    .unwrap_or(settings.skip_propagation),
            )
    }

    fn run_context(&self, settings: &Settings) -> RunContext {
        let ctx = RunContext::new()
            .with_cancellation(self.context.cancellation().clone())
            .with_dry_run(self.args.dry_run);

        match self.args.timeout.or(settings.timeout_secs) {
            Some(secs) => ctx.with_timeout(Duration::from_secs(secs)),
            None => ctx,
        }
    }

    fn show_result(&self, ui: &mut dyn UserInterface, result: &StepResult) {
        let id = &result.step_id;
        match result.status {
            StepStatus::Satisfied if result.applied => ui.show_step(
                result.status,
                &format!("{} ({})", id, format_duration(result.duration)),
                None,
            ),
            StepStatus::Satisfied => {
                if ui.output_mode().shows_details() {
                    ui.show_step(result.status, &format!("{} (already satisfied)", id), None);
                }
            }
            StepStatus::NeedsApply => ui.show_step(
                result.status,
                &format!("{} (would apply)", id),
                Some(&result.diff),
            ),
            StepStatus::Failed => {
                let error = result
                    .error
                    .as_ref()
                    .map(|e| format!("{:#}", e))
                    .unwrap_or_else(|| "unknown error".to_string());
                ui.show_step(result.status, &format!("{} - {}", id, error), None);
            }
            StepStatus::Skipped => ui.show_step(
                result.status,
                &format!("{} (skipped: dependency did not converge)", id),
                None,
            ),
            StepStatus::Unknown => ui.show_step(result.status, id.as_str(), None),
        }
    }

    fn show_totals(&self, ui: &mut dyn UserInterface, outcome: &ExecuteResult) {
        ui.message("");
        if self.args.dry_run {
            let pending = outcome
                .results()
                .iter()
                .filter(|r| r.status == StepStatus::NeedsApply)
                .count();
            ui.message(&format!("{} step(s) would change", pending));
            return;
        }

        ui.message(&format!(
            "{} applied, {} failed, {} skipped in {}",
            outcome.applied_count(),
            outcome.failed().len(),
            outcome.skipped().len(),
            format_duration(outcome.total_duration())
        ));
    }
}

impl Command for ApplyCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = load_manifest(&self.context, ui)? else {
            return Ok(CommandResult::failure(EXIT_CONFIG));
        };

        let graph = build_graph(&config, self.context.project_root())?;
        let executor = self.executor(&config.settings);
        let ctx = self.run_context(&config.settings);

        let plan = match Planner::new().plan(&ctx, &graph) {
            Ok(plan) => plan,
            Err(ConvergeError::Cancelled) => {
                ui.warning("Run cancelled before any step was applied");
                return Ok(CommandResult::failure(EXIT_CANCELLED));
            }
            Err(e) => return Err(e),
        };

        if !plan.has_changes() {
            ui.success(&format!(
                "Already converged: {} step(s) satisfied",
                plan.len()
            ));
            return Ok(CommandResult::success());
        }

        tracing::info!(
            "Applying {} of {} step(s)",
            plan.needs_apply().len(),
            plan.len()
        );

        ui.show_header(if executor.is_dry_run() { "Dry run" } else { "Apply" });
        let outcome = executor.execute(&ctx, &plan);

        for result in outcome.results() {
            self.show_result(ui, result);
        }

        if !outcome.rollback_results().is_empty() {
            ui.show_header("Rollback");
            for rollback in outcome.rollback_results() {
                ui.message(&format!("  {}", rollback.summary_line()));
            }
        }

        self.show_totals(ui, &outcome);

        if outcome.cancelled() {
            ui.warning("Run cancelled");
            return Ok(CommandResult::failure(EXIT_CANCELLED));
        }

        if outcome.success() {
            if executor.is_dry_run() {
                ui.success("Dry run complete, nothing was changed");
            } else {
                ui.success("Converged");
            }
            return Ok(CommandResult::success());
        }

        for failed in outcome.failed() {
            if !ui.output_mode().shows_status() {
                ui.error(&failed.summary_line());
            }
        }
        ui.error(&format!(
            "{} step(s) failed, {} skipped",
            outcome.failed().len(),
            outcome.skipped().len()
        ));
        Ok(CommandResult::failure(EXIT_FAILURE))
    }
}
