//! Explain command implementation.
//!
//! The `converge explain <STEP_ID>` command describes what a step manages.

use crate::cli::args::ExplainArgs;
use crate::engine::ExplainContext;
use crate::error::Result;
use crate::providers::build_graph;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandContext, CommandResult, EXIT_CONFIG, EXIT_FAILURE};
use super::load_manifest;

/// The explain command implementation.
pub struct ExplainCommand {
    context: CommandContext,
    args: ExplainArgs,
}

impl ExplainCommand {
    /// Create a new explain command.
    pub fn new(context: CommandContext, args: ExplainArgs) -> Self {
        Self { context, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &ExplainArgs {
        &self.args
    }
}

impl Command for ExplainCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = load_manifest(&self.context, ui)? else {
            return Ok(CommandResult::failure(EXIT_CONFIG));
        };

        let graph = build_graph(&config, self.context.project_root())?;
        let Some(step) = graph.get(&self.args.step_id) else {
            ui.error(&format!("Unknown step '{}'", self.args.step_id));
            ui.message("Run 'converge list' to see declared steps.");
            return Ok(CommandResult::failure(EXIT_FAILURE));
        };

        let ctx = ExplainContext::new().with_verbose(ui.output_mode().shows_details());
        let explanation = step.explain(&ctx);

        ui.show_header(&explanation.title);
        for line in explanation.description.lines() {
            ui.message(line);
        }

        let depends_on = step.depends_on();
        if !depends_on.is_empty() {
            ui.message("");
            let names: Vec<&str> = depends_on.iter().map(|id| id.as_str()).collect();
            ui.message(&format!("Depends on: {}", names.join(", ")));
        }

        if !explanation.links.is_empty() {
            ui.message("");
            for link in &explanation.links {
                ui.message(&format!("See: {}", link));
            }
        }

        Ok(CommandResult::success())
    }
}
