//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::SkipPropagation;

/// Converge - declarative system state reconciliation.
#[derive(Debug, Parser)]
#[command(name = "converge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the manifest (overrides converge.yml discovery)
    #[arg(short, long, global = true, env = "CONVERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to project root (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show what would change
    Plan(PlanArgs),

    /// Bring the system into the declared state
    Apply(ApplyArgs),

    /// Explain what a step does
    Explain(ExplainArgs),

    /// List steps in execution order
    List(ListArgs),
}

/// Arguments for the `plan` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PlanArgs {
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `apply` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ApplyArgs {
    /// Report planned changes without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Undo applied steps when one fails
    #[arg(long)]
    pub rollback_on_failure: bool,

    /// How failures block dependent steps (transitive, direct)
    #[arg(long, value_parser = parse_skip_propagation)]
    pub skip_propagation: Option<SkipPropagation>,

    /// Abort the run after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Arguments for the `explain` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ExplainArgs {
    /// Step identifier
    pub step_id: String,
}

/// Arguments for the `list` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {}

fn parse_skip_propagation(s: &str) -> Result<SkipPropagation, String> {
    s.parse()
}
