//! List command implementation.
//!
//! The `converge list` command prints steps in execution order.

use crate::cli::args::ListArgs;
use crate::error::Result;
use crate::providers::build_graph;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandContext, CommandResult, EXIT_CONFIG};
use super::load_manifest;

/// The list command implementation.
pub struct ListCommand {
    context: CommandContext,
    args: ListArgs,
}

impl ListCommand {
    /// Create a new list command.
    pub fn new(context: CommandContext, args: ListArgs) -> Self {
        Self { context, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &ListArgs {
        &self.args
    }
}

impl Command for ListCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = load_manifest(&self.context, ui)? else {
            return Ok(CommandResult::failure(EXIT_CONFIG));
        };

        let graph = build_graph(&config, self.context.project_root())?;
        let order = graph.topological_sort()?;

        if order.is_empty() {
            ui.message("No steps declared.");
            return Ok(CommandResult::success());
        }

        ui.show_header("Steps");
        for (index, step) in order.iter().enumerate() {
            ui.message(&format!("  {:>2}. {}", index + 1, step.id()));

            let depends_on = step.depends_on();
            if !depends_on.is_empty() {
                let names: Vec<&str> = depends_on.iter().map(|id| id.as_str()).collect();
                ui.message(&format!("      └── depends on: {}", names.join(", ")));
            }
        }

        Ok(CommandResult::success())
    }
}
