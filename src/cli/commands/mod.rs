//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which routes CLI
//! subcommands to their implementations. This allows:
//! - Single binary with subcommands (`converge plan`, `converge apply`)
//! - Shared manifest loading
//! - Consistent global flag handling

pub mod apply;
pub mod dispatcher;
pub mod explain;
pub mod list;
pub mod plan;

pub use dispatcher::{
    Command, CommandContext, CommandDispatcher, CommandResult, EXIT_CANCELLED, EXIT_CONFIG,
    EXIT_FAILURE,
};

use crate::config::{load_config, ConvergeConfig};
use crate::error::{ConvergeError, Result};
use crate::ui::UserInterface;

/// Load the manifest for a command.
///
/// Reports a missing manifest through `ui` and returns `None`; callers exit
/// with [`EXIT_CONFIG`].
pub(crate) fn load_manifest(
    context: &CommandContext,
    ui: &mut dyn UserInterface,
) -> Result<Option<ConvergeConfig>> {
    match load_config(context.project_root(), context.config_path()) {
        Ok(config) => Ok(Some(config)),
        Err(ConvergeError::ConfigNotFound { path }) => {
            ui.error(&format!("No manifest found at {}", path.display()));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
