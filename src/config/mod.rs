//! Manifest loading, parsing, and validation.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Validation in [`validator`]
//!
//! # Example
//!
//! ```
//! use converge::config::{load_config, validate};
//! use std::fs;
//! use tempfile::TempDir;
//!
//! let temp = TempDir::new().unwrap();
//! fs::write(
//!     temp.path().join("converge.yml"),
//!     "steps:\n  - type: directory\n    path: build\n",
//! )
//! .unwrap();
//!
//! let config = load_config(temp.path(), None).unwrap();
//! validate(&config).unwrap();
//! assert_eq!(config.steps[0].step_id(), "dir:create:build");
//! ```
//!
//! # Manifest Locations
//!
//! 1. `--config <FILE>` when given
//! 2. `converge.yml` in the project root
//! 3. `.converge/config.yml` in the project root

pub mod loader;
pub mod schema;
pub mod validator;

pub use loader::{
    find_config, find_project_root, load_config, load_config_file, parse_config,
    CONFIG_CANDIDATES,
};
pub use schema::{ConvergeConfig, Settings, StepConfig, StepKind};
pub use validator::{validate, validate_config, ValidationError};
