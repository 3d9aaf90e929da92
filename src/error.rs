//! Error types for converge operations.
//!
//! This module defines [`ConvergeError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `ConvergeError` for structural and planning errors that need distinct handling
//! - Step implementations return `anyhow::Result`; the engine wraps those errors
//!   with the offending step ID when they abort planning
//! - Apply and rollback errors never surface here, they are captured per step in
//!   [`StepResult`](crate::engine::StepResult) and
//!   [`RollbackResult`](crate::engine::RollbackResult)

use std::path::PathBuf;
use thiserror::Error;

use crate::engine::StepId;

/// Core error type for converge operations.
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// A step was added with an empty identifier.
    #[error("Step identifier must not be empty")]
    EmptyStepId,

    /// Two steps share the same identifier.
    #[error("Duplicate step: {id}")]
    DuplicateStep { id: StepId },

    /// A step declares a dependency that is not part of the graph.
    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    MissingDependency { step: StepId, dependency: StepId },

    /// Step dependency cycle detected.
    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// Inspecting current state failed; planning was aborted.
    #[error("Check failed for step '{step}': {source:#}")]
    CheckFailed {
        step: StepId,
        source: anyhow::Error,
    },

    /// Computing the diff for a step failed; planning was aborted.
    #[error("Planning failed for step '{step}': {source:#}")]
    PlanFailed {
        step: StepId,
        source: anyhow::Error,
    },

    /// The run was cancelled before it could finish planning.
    #[error("Run cancelled")]
    Cancelled,

    /// Manifest not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse the manifest.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid manifest structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// Shell command could not be started.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for converge operations.
pub type Result<T> = std::result::Result<T, ConvergeError>;
