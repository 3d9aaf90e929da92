//! Directory provider.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context};

use super::{lock, missing_dirs, remove_created_dirs, StepMeta};
use crate::engine::{
    Diff, ExplainContext, Explanation, Rollback, RunContext, Step, StepId, StepStatus,
};

/// Ensures a directory exists.
#[derive(Debug)]
pub struct DirectoryStep {
    meta: StepMeta,
    display: String,
    path: PathBuf,
    /// Directories this run created, outermost first.
    created: Mutex<Vec<PathBuf>>,
}

impl DirectoryStep {
    /// `display` is the path as written in the manifest; `path` is resolved.
    pub fn new(meta: StepMeta, display: impl Into<String>, path: PathBuf) -> Self {
        Self {
            meta,
            display: display.into(),
            path,
            created: Mutex::new(Vec::new()),
        }
    }

    /// Resolved directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Step for DirectoryStep {
    fn id(&self) -> StepId {
        self.meta.id.clone()
    }

    fn depends_on(&self) -> Vec<StepId> {
        self.meta.depends_on.clone()
    }

    fn check(&self, _ctx: &RunContext) -> anyhow::Result<StepStatus> {
        if self.path.is_dir() {
            Ok(StepStatus::Satisfied)
        } else {
            Ok(StepStatus::NeedsApply)
        }
    }

    fn plan(&self, _ctx: &RunContext) -> anyhow::Result<Diff> {
        if self.path.exists() {
            Ok(Diff::modify("directory", &self.display, "file", "directory"))
        } else {
            Ok(Diff::add("directory", &self.display, ""))
        }
    }

    fn apply(&self, _ctx: &RunContext) -> anyhow::Result<()> {
        if self.path.exists() && !self.path.is_dir() {
            bail!(
                "{} exists and is not a directory; refusing to replace it",
                self.path.display()
            );
        }

        let missing = missing_dirs(&self.path);
        fs::create_dir_all(&self.path)
            .with_context(|| format!("Failed to create directory {}", self.path.display()))?;

        tracing::debug!("Created {} director(ies) for {}", missing.len(), self.display);
        *lock(&self.created) = missing;
        Ok(())
    }

    fn explain(&self, ctx: &ExplainContext) -> Explanation {
        self.meta.explain(
            ctx,
            format!("Create directory {}", self.display),
            format!(
                "Ensures the directory {} exists, creating missing parents.",
                self.display
            ),
            &[
                format!("Resolved path: {}", self.path.display()),
                "Rollback removes directories this run created, if they are still empty."
                    .to_string(),
            ],
        )
    }

    fn as_rollback(&self) -> Option<&dyn Rollback> {
        Some(self)
    }
}

impl Rollback for DirectoryStep {
    fn can_rollback(&self) -> bool {
        !lock(&self.created).is_empty()
    }

    fn rollback(&self, _ctx: &RunContext) -> anyhow::Result<()> {
        remove_created_dirs(&mut lock(&self.created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn step(root: &Path, rel: &str) -> DirectoryStep {
        DirectoryStep::new(
            StepMeta::new(format!("dir:create:{}", rel)),
            rel,
            root.join(rel),
        )
    }

    #[test]
    fn check_reports_missing_directory() {
        let temp = TempDir::new().unwrap();
        let step = step(temp.path(), "a/b");
        let ctx = RunContext::new();

        assert_eq!(step.check(&ctx).unwrap(), StepStatus::NeedsApply);
        assert_eq!(step.plan(&ctx).unwrap(), Diff::add("directory", "a/b", ""));
    }

    #[test]
    fn apply_creates_nested_directories() {
        let temp = TempDir::new().unwrap();
        let step = step(temp.path(), "a/b");
        let ctx = RunContext::new();

        step.apply(&ctx).unwrap();

        assert!(temp.path().join("a/b").is_dir());
        assert_eq!(step.check(&ctx).unwrap(), StepStatus::Satisfied);
    }

    #[test]
    fn rollback_removes_created_directories() {
        let temp = TempDir::new().unwrap();
        let step = step(temp.path(), "a/b");
        let ctx = RunContext::new();

        assert!(!step.can_rollback());
        step.apply(&ctx).unwrap();
        assert!(step.can_rollback());

        step.rollback(&ctx).unwrap();
        assert!(!temp.path().join("a").exists());
        assert!(temp.path().exists());
    }

    #[test]
    fn rollback_fails_on_non_empty_directory() {
        let temp = TempDir::new().unwrap();
        let step = step(temp.path(), "a");
        let ctx = RunContext::new();

        step.apply(&ctx).unwrap();
        fs::write(temp.path().join("a/keep.txt"), "x").unwrap();

        let err = step.rollback(&ctx).unwrap_err();
        assert!(err.to_string().contains("not empty"));
        assert!(temp.path().join("a/keep.txt").exists());
    }

    #[test]
    fn apply_refuses_to_replace_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "file").unwrap();
        let step = step(temp.path(), "a");
        let ctx = RunContext::new();

        assert_eq!(step.check(&ctx).unwrap(), StepStatus::NeedsApply);
        assert_eq!(
            step.plan(&ctx).unwrap(),
            Diff::modify("directory", "a", "file", "directory")
        );
        let err = step.apply(&ctx).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn explain_mentions_path() {
        let temp = TempDir::new().unwrap();
        let step = step(temp.path(), "cache");
        let explanation = step.explain(&ExplainContext::new());
        assert_eq!(explanation.title, "Create directory cache");
    }
}
