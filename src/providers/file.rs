//! File provider.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use sha2::{Digest, Sha256};

use super::{lock, missing_dirs, remove_created_dirs, StepMeta};
use crate::engine::{
    Diff, ExplainContext, Explanation, Rollback, RunContext, Step, StepId, StepStatus,
};

/// What was at the path before `apply` ran.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Previous {
    /// No file; holds the parent directories the write created, outermost first.
    Absent(Vec<PathBuf>),
    Contents(Vec<u8>),
}

/// Ensures a file exists with exact contents.
#[derive(Debug)]
pub struct FileStep {
    meta: StepMeta,
    display: String,
    path: PathBuf,
    content: Vec<u8>,
    previous: Mutex<Option<Previous>>,
}

impl FileStep {
    /// `display` is the path as written in the manifest; `path` is resolved.
    pub fn new(
        meta: StepMeta,
        display: impl Into<String>,
        path: PathBuf,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            meta,
            display: display.into(),
            path,
            content: content.into(),
            previous: Mutex::new(None),
        }
    }

    /// Resolved file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_current(&self) -> anyhow::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }
}

/// Short content fingerprint shown in diffs.
pub fn fingerprint(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    format!("sha256:{}", hex::encode(&hash[..6]))
}

/// Replace `path` with `content` through a temp file in the same directory.
fn write_atomic(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = parent.join(format!(".{}.converge-tmp", file_name));

    fs::write(&temp, content).with_context(|| format!("Failed to write {}", temp.display()))?;
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }
    Ok(())
}

impl Step for FileStep {
    fn id(&self) -> StepId {
        self.meta.id.clone()
    }

    fn depends_on(&self) -> Vec<StepId> {
        self.meta.depends_on.clone()
    }

    fn check(&self, _ctx: &RunContext) -> anyhow::Result<StepStatus> {
        match self.read_current()? {
            Some(current) if current == self.content => Ok(StepStatus::Satisfied),
            _ => Ok(StepStatus::NeedsApply),
        }
    }

    fn plan(&self, _ctx: &RunContext) -> anyhow::Result<Diff> {
        let desired = fingerprint(&self.content);
        match self.read_current()? {
            Some(current) => Ok(Diff::modify(
                "file",
                &self.display,
                fingerprint(&current),
                desired,
            )),
            None => Ok(Diff::add("file", &self.display, desired)),
        }
    }

    fn apply(&self, _ctx: &RunContext) -> anyhow::Result<()> {
        let previous = match self.read_current()? {
            Some(bytes) => Previous::Contents(bytes),
            None => Previous::Absent(
                self.path.parent().map(missing_dirs).unwrap_or_default(),
            ),
        };

        write_atomic(&self.path, &self.content)?;
        tracing::debug!("Wrote {} bytes to {}", self.content.len(), self.path.display());

        *lock(&self.previous) = Some(previous);
        Ok(())
    }

    fn explain(&self, ctx: &ExplainContext) -> Explanation {
        self.meta.explain(
            ctx,
            format!("Write file {}", self.display),
            format!("Ensures {} has the declared contents.", self.display),
            &[
                format!("Resolved path: {}", self.path.display()),
                format!(
                    "Desired contents: {} bytes ({})",
                    self.content.len(),
                    fingerprint(&self.content)
                ),
                "Rollback restores the previous contents or removes a file this run created, along with any parent directories it made."
                    .to_string(),
            ],
        )
    }

    fn as_rollback(&self) -> Option<&dyn Rollback> {
        Some(self)
    }
}

impl Rollback for FileStep {
    fn can_rollback(&self) -> bool {
        lock(&self.previous).is_some()
    }

    fn rollback(&self, _ctx: &RunContext) -> anyhow::Result<()> {
        let mut previous = lock(&self.previous);

        match previous.take() {
            Some(Previous::Absent(mut created)) => {
                match fs::remove_file(&self.path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(e)
                            .with_context(|| format!("Failed to remove {}", self.path.display()))
                    }
                }
                remove_created_dirs(&mut created)
            }
            Some(Previous::Contents(bytes)) => write_atomic(&self.path, &bytes),
            None => Ok(()),
        }
    }
}
