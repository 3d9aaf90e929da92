//! Shell command execution.

pub mod command;
pub mod platform;

pub use command::{execute, CommandOptions, CommandResult};
pub use platform::{detect_shell, ShellInfo, ShellType, SHELL_OVERRIDE_VAR};
