//! Command-line interface for converge.
//!
//! This module provides the CLI argument parsing using clap's derive macros
//! and command implementations.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations
//! - [`signal`] - SIGINT/SIGTERM wired to run cancellation

pub mod args;
pub mod commands;
pub mod signal;

pub use args::{ApplyArgs, Cli, Commands, ExplainArgs, ListArgs, PlanArgs};
pub use commands::{
    Command, CommandContext, CommandDispatcher, CommandResult, EXIT_CANCELLED, EXIT_CONFIG,
    EXIT_FAILURE,
};
pub use signal::install_interrupt_handler;
