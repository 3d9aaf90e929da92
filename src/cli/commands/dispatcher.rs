//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands};
use crate::engine::CancellationToken;
use crate::error::Result;
use crate::ui::UserInterface;

/// Exit code for a run that failed or left steps unconverged.
pub const EXIT_FAILURE: i32 = 1;

/// Exit code when the manifest cannot be found or loaded.
pub const EXIT_CONFIG: i32 = 2;

/// Exit code for a run stopped by an interrupt or timeout.
pub const EXIT_CANCELLED: i32 = 130;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command.
    ///
    /// # Arguments
    ///
    /// * `ui` - User interface for displaying output
    ///
    /// # Returns
    ///
    /// A [`CommandResult`] indicating success/failure and exit code.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Where a command finds its manifest and how it observes interrupts.
#[derive(Debug, Clone)]
pub struct CommandContext {
    project_root: PathBuf,
    config_path: Option<PathBuf>,
    cancellation: CancellationToken,
}

impl CommandContext {
    /// Create a context rooted at `project_root`.
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config_path: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Use an explicit manifest path instead of discovery.
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Share a cancellation token with the runs this context starts.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Explicit manifest path, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Token cancelled on interrupt.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    context: CommandContext,
}

impl CommandDispatcher {
    /// Create a new dispatcher.
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        self.context.project_root()
    }

    /// Dispatch and execute a command.
    ///
    /// Routes the CLI subcommand to the appropriate command implementation
    /// and executes it.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Commands::Plan(args) => {
                let cmd = super::plan::PlanCommand::new(self.context.clone(), args.clone());
                cmd.execute(ui)
            }
            Commands::Apply(args) => {
                let cmd = super::apply::ApplyCommand::new(self.context.clone(), args.clone());
                cmd.execute(ui)
            }
            Commands::Explain(args) => {
                let cmd = super::explain::ExplainCommand::new(self.context.clone(), args.clone());
                cmd.execute(ui)
            }
            Commands::List(args) => {
                let cmd = super::list::ListCommand::new(self.context.clone(), args.clone());
                cmd.execute(ui)
            }
        }
    }
}
