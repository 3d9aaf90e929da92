//! Command provider.
//!
//! Delegates state inspection and changes to shell commands: `check` exits 0
//! when the desired state already holds, `apply` establishes it, and an
//! optional `rollback` command undoes it.

use std::path::PathBuf;

use anyhow::bail;

use super::StepMeta;
use crate::engine::{
    Diff, ExplainContext, Explanation, Rollback, RunContext, Step, StepId, StepStatus,
};
use crate::shell::{execute, CommandOptions, CommandResult};

/// State managed through shell commands.
#[derive(Debug, Clone)]
pub struct CommandStep {
    meta: StepMeta,
    name: String,
    category: String,
    version: Option<String>,
    check: String,
    apply: String,
    rollback: Option<String>,
    cwd: Option<PathBuf>,
}

impl CommandStep {
    /// Create a command step with the default `command` category.
    pub fn new(
        meta: StepMeta,
        name: impl Into<String>,
        check: impl Into<String>,
        apply: impl Into<String>,
    ) -> Self {
        Self {
            meta,
            name: name.into(),
            category: "command".to_string(),
            version: None,
            check: check.into(),
            apply: apply.into(),
            rollback: None,
            cwd: None,
        }
    }

    /// Category shown in diffs.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Desired version shown in diffs.
    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    /// Command that undoes `apply`.
    pub fn with_rollback(mut self, rollback: Option<String>) -> Self {
        self.rollback = rollback.filter(|cmd| !cmd.trim().is_empty());
        self
    }

    /// Working directory for all commands.
    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    fn run(&self, command: &str, ctx: Option<&RunContext>) -> anyhow::Result<CommandResult> {
        let options = CommandOptions {
            cwd: self.cwd.clone(),
            context: ctx.cloned(),
            ..Default::default()
        };
        Ok(execute(command, &options)?)
    }
}

impl Step for CommandStep {
    fn id(&self) -> StepId {
        self.meta.id.clone()
    }

    fn depends_on(&self) -> Vec<StepId> {
        self.meta.depends_on.clone()
    }

    fn check(&self, ctx: &RunContext) -> anyhow::Result<StepStatus> {
        let result = self.run(&self.check, Some(ctx))?;
        if result.interrupted {
            bail!("check `{}` was interrupted", self.check);
        }

        if result.success {
            Ok(StepStatus::Satisfied)
        } else {
            tracing::debug!(
                "check `{}` for {} reported {}",
                self.check,
                self.meta.id,
                result.failure_reason()
            );
            Ok(StepStatus::NeedsApply)
        }
    }

    fn plan(&self, _ctx: &RunContext) -> anyhow::Result<Diff> {
        let desired = self.version.clone().unwrap_or_else(|| self.apply.clone());
        Ok(Diff::add(&self.category, &self.name, desired))
    }

    fn apply(&self, ctx: &RunContext) -> anyhow::Result<()> {
        let result = self.run(&self.apply, Some(ctx))?;
        if !result.success {
            bail!("`{}` failed: {}", self.apply, result.failure_reason());
        }
        Ok(())
    }

    fn explain(&self, ctx: &ExplainContext) -> Explanation {
        let mut details = vec![
            format!("Check: {}", self.check),
            format!("Apply: {}", self.apply),
        ];
        if let Some(rollback) = &self.rollback {
            details.push(format!("Rollback: {}", rollback));
        }

        let target = match &self.version {
            Some(version) => format!("{} {} ({})", self.category, self.name, version),
            None => format!("{} {}", self.category, self.name),
        };

        self.meta.explain(
            ctx,
            format!("Ensure {}", target),
            format!(
                "Runs `{}` when `{}` does not succeed.",
                self.apply, self.check
            ),
            &details,
        )
    }

    fn as_rollback(&self) -> Option<&dyn Rollback> {
        self.rollback.as_ref().map(|_| self as &dyn Rollback)
    }
}

impl Rollback for CommandStep {
    fn can_rollback(&self) -> bool {
        self.rollback.is_some()
    }

    /// Runs without the run's cancellation, so an undo is never cut short.
    fn rollback(&self, _ctx: &RunContext) -> anyhow::Result<()> {
        let Some(command) = &self.rollback else {
            return Ok(());
        };

        let result = self.run(command, None)?;
        if !result.success {
            bail!("`{}` failed: {}", command, result.failure_reason());
        }
        Ok(())
    }
}
