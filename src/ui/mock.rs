//! Mock UI implementation for testing.
//!
//! `MockUI` implements the `UserInterface` trait and captures all
//! interactions for later assertion.

use crate::engine::{Diff, StepStatus};

use super::{OutputMode, UserInterface};

/// One captured step line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLine {
    /// Status marker shown.
    pub status: StepStatus,
    /// Text after the marker.
    pub text: String,
    /// Diff shown under the line, if any.
    pub diff: Option<Diff>,
}

/// Mock UI implementation for testing.
#[derive(Debug, Default)]
pub struct MockUI {
    mode: OutputMode,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    headers: Vec<String>,
    steps: Vec<StepLine>,
    outputs: Vec<String>,
}

impl MockUI {
    /// Create a new MockUI with Normal output mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new MockUI with a specific output mode.
    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Get all captured messages.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Get all captured success messages.
    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    /// Get all captured warnings.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Get all captured errors.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Get all captured headers.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Get all captured step lines.
    pub fn steps(&self) -> &[StepLine] {
        &self.steps
    }

    /// Get all machine-readable output.
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Check if a message containing the given text was shown anywhere.
    pub fn has_message(&self, text: &str) -> bool {
        self.messages
            .iter()
            .chain(&self.successes)
            .chain(&self.warnings)
            .chain(&self.errors)
            .chain(&self.headers)
            .chain(&self.outputs)
            .any(|m| m.contains(text))
            || self.steps.iter().any(|s| s.text.contains(text))
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn show_step(&mut self, status: StepStatus, text: &str, diff: Option<&Diff>) {
        self.steps.push(StepLine {
            status,
            text: text.to_string(),
            diff: diff.cloned(),
        });
    }

    fn output(&mut self, text: &str) {
        self.outputs.push(text.to_string());
    }
}
