//! Manifest validation rules.
//!
//! - Every step kind carries its required fields
//! - Step identifiers are non-empty and unique
//! - `depends_on` references existing steps and never the step itself
//!
//! Cycles are left to the step graph, which reports the full cycle path.

use crate::config::schema::{ConvergeConfig, StepConfig, StepKind};
use crate::error::{ConvergeError, Result};
use std::collections::HashSet;

/// Validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
    /// Step identifier if the error is step-specific
    pub step: Option<String>,
}

impl ValidationError {
    fn for_step(rule: &str, step: &str, message: String) -> Self {
        Self {
            rule: rule.to_string(),
            message,
            step: Some(step.to_string()),
        }
    }
}

/// Validate a manifest and return all errors.
///
/// Collects every problem rather than stopping at the first.
pub fn validate_config(config: &ConvergeConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_fields(config));
    errors.extend(validate_ids(config));
    errors.extend(validate_dependencies(config));

    errors
}

/// Required fields per step kind.
fn validate_fields(config: &ConvergeConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (index, step) in config.steps.iter().enumerate() {
        let label = step_label(index, step);
        for field in missing_fields(&step.kind) {
            errors.push(ValidationError::for_step(
                "missing-field",
                &label,
                format!(
                    "Step '{}' ({}) is missing required field '{}'",
                    label,
                    step.kind.type_name(),
                    field
                ),
            ));
        }
    }

    errors
}

fn missing_fields(kind: &StepKind) -> Vec<&'static str> {
    let required: Vec<(&str, &'static str)> = match kind {
        StepKind::Directory { path } => vec![(path.as_str(), "path")],
        StepKind::File { path, .. } => vec![(path.as_str(), "path")],
        StepKind::Link { source, target, .. } => {
            vec![(source.as_str(), "source"), (target.as_str(), "target")]
        }
        StepKind::Command {
            name, check, apply, ..
        } => vec![
            (name.as_str(), "name"),
            (check.as_str(), "check"),
            (apply.as_str(), "apply"),
        ],
    };

    let mut missing: Vec<&'static str> = required
        .into_iter()
        .filter(|(value, _)| value.trim().is_empty())
        .map(|(_, field)| field)
        .collect();

    // Empty content is a valid empty file; only an absent key is missing.
    if let StepKind::File { content: None, .. } = kind {
        missing.push("content");
    }

    missing
}

/// Identifiers must be non-empty and unique.
fn validate_ids(config: &ConvergeConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, step) in config.steps.iter().enumerate() {
        if step.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            errors.push(ValidationError::for_step(
                "empty-id",
                &step_label(index, step),
                format!("Step #{} has an empty 'id'", index + 1),
            ));
            continue;
        }

        let id = step.step_id();
        if !seen.insert(id.clone()) {
            errors.push(ValidationError::for_step(
                "duplicate-id",
                &id,
                format!("Step '{}' is declared more than once", id),
            ));
        }
    }

    errors
}

/// Dependencies must name other declared steps.
fn validate_dependencies(config: &ConvergeConfig) -> Vec<ValidationError> {
    let ids: HashSet<String> = config.steps.iter().map(StepConfig::step_id).collect();
    let mut errors = Vec::new();

    for step in &config.steps {
        let id = step.step_id();
        for dep in &step.depends_on {
            if dep == &id {
                errors.push(ValidationError::for_step(
                    "self-dependency",
                    &id,
                    format!("Step '{}' depends on itself", id),
                ));
            } else if !ids.contains(dep) {
                errors.push(ValidationError::for_step(
                    "unknown-step",
                    &id,
                    format!("Step '{}' depends on '{}' which does not exist", id, dep),
                ));
            }
        }
    }

    errors
}

fn step_label(index: usize, step: &StepConfig) -> String {
    let id = step.step_id();
    if id.trim().is_empty() || id.ends_with(':') {
        format!("#{}", index + 1)
    } else {
        id
    }
}

/// Validate and return Result (for convenience).
///
/// # Errors
///
/// Returns `ConfigValidationError` if any validation rules fail.
pub fn validate(config: &ConvergeConfig) -> Result<()> {
    let errors = validate_config(config);

    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
        Err(ConvergeError::ConfigValidationError {
            message: messages.join("; "),
        })
    }
}
