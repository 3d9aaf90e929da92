//! The step contract.
//!
//! A [`Step`] describes one idempotent piece of desired system state. The
//! engine drives it through `check` → `plan` → `apply`, and optionally
//! `rollback` when the step also exposes the [`Rollback`] capability.

use super::{Diff, RunContext, StepId, StepStatus};

/// One idempotent unit of desired state.
pub trait Step: Send + Sync {
    /// Stable identity of this step.
    fn id(&self) -> StepId;

    /// Steps that must be attempted before this one.
    ///
    /// The absence of an edge means there is no ordering requirement; it does
    /// not mean the steps run concurrently.
    fn depends_on(&self) -> Vec<StepId> {
        Vec::new()
    }

    /// Inspect current state without side effects.
    ///
    /// Returns [`StepStatus::Satisfied`] if no change is needed and
    /// [`StepStatus::NeedsApply`] otherwise. An error aborts planning.
    fn check(&self, ctx: &RunContext) -> anyhow::Result<StepStatus>;

    /// Describe the change `apply` would make.
    ///
    /// Only called after `check` returned `NeedsApply`. Must not mutate state.
    fn plan(&self, ctx: &RunContext) -> anyhow::Result<Diff>;

    /// Perform the change.
    fn apply(&self, ctx: &RunContext) -> anyhow::Result<()>;

    /// User-facing rationale for this step.
    fn explain(&self, ctx: &ExplainContext) -> Explanation;

    /// Optional rollback capability.
    ///
    /// Steps that can undo their own `apply` return `Some(self)`. Returning
    /// `None` is not an error: the rollback sweep records such steps as not
    /// attempted.
    fn as_rollback(&self) -> Option<&dyn Rollback> {
        None
    }
}

/// Optional extension for steps that can undo a successful `apply`.
pub trait Rollback {
    /// Whether a rollback is possible right now.
    fn can_rollback(&self) -> bool;

    /// Undo the effects of the last successful `apply`.
    fn rollback(&self, ctx: &RunContext) -> anyhow::Result<()>;
}

/// Options for [`Step::explain`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplainContext {
    verbose: bool,
}

impl ExplainContext {
    /// Default, terse explanations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a copy requesting more detail.
    pub fn with_verbose(self, verbose: bool) -> Self {
        Self { verbose }
    }

    /// Whether detailed explanations were requested.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Title, description and reference links explaining a step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Explanation {
    /// One-line title.
    pub title: String,

    /// Longer description of what the step does and why.
    pub description: String,

    /// Reference links.
    pub links: Vec<String>,
}

impl Explanation {
    /// Create an explanation without links.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            links: Vec::new(),
        }
    }

    /// Append a reference link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.links.push(link.into());
        self
    }

    /// Append several reference links.
    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links.extend(links.into_iter().map(Into::into));
        self
    }
}
