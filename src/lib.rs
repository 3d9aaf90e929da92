//! Converge - declarative system state reconciliation.
//!
//! Converge reads a manifest of desired system state (directories, files,
//! symlinks, command-managed packages), checks what already holds, and
//! applies only what is missing, in dependency order.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Manifest loading, parsing, and validation
//! - [`engine`] - Step graph, planner, and executor
//! - [`error`] - Error types and result aliases
//! - [`providers`] - Built-in step kinds
//! - [`shell`] - Shell command execution
//! - [`ui`] - Terminal output
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use converge::config::parse_config;
//! use converge::engine::{Planner, RunContext};
//! use converge::providers::build_graph;
//!
//! let config = parse_config(
//!     "steps:\n  - type: directory\n    path: /\n",
//!     Path::new("converge.yml"),
//! )
//! .unwrap();
//! let graph = build_graph(&config, Path::new("/")).unwrap();
//! let plan = Planner::new().plan(&RunContext::new(), &graph).unwrap();
//! assert!(!plan.has_changes());
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod providers;
pub mod shell;
pub mod ui;

pub use error::{ConvergeError, Result};
