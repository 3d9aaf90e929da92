//! Built-in step providers.
//!
//! Each provider turns one manifest entry into a [`Step`]:
//!
//! - [`DirectoryStep`] ensures a directory exists
//! - [`FileStep`] ensures a file has exact contents
//! - [`LinkStep`] ensures a symlink points at a source
//! - [`CommandStep`] delegates check/apply/rollback to shell commands
//!
//! All of them support rollback of their own `apply`, except command steps
//! without a configured `rollback` command.

pub mod command;
pub mod directory;
pub mod file;
pub mod link;

pub use command::CommandStep;
pub use directory::DirectoryStep;
pub use file::FileStep;
pub use link::LinkStep;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Context};

use crate::config::{validate, ConvergeConfig, StepConfig, StepKind};
use crate::engine::{ExplainContext, Explanation, Step, StepGraph, StepId};
use crate::error::Result;

/// Identity and documentation shared by every provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMeta {
    /// Registered identifier.
    pub id: StepId,
    /// Declared dependencies.
    pub depends_on: Vec<StepId>,
    /// Manifest description, if any.
    pub description: Option<String>,
    /// Reference links.
    pub links: Vec<String>,
}

impl StepMeta {
    /// Metadata for a step declared without a manifest.
    pub fn new(id: impl Into<StepId>) -> Self {
        Self {
            id: id.into(),
            depends_on: Vec::new(),
            description: None,
            links: Vec::new(),
        }
    }

    /// Metadata taken from a manifest entry.
    pub fn from_config(config: &StepConfig) -> Self {
        Self {
            id: StepId::new(config.step_id()),
            depends_on: config.depends_on.iter().map(StepId::new).collect(),
            description: config.description.clone(),
            links: config.links.clone(),
        }
    }

    /// Build an explanation, preferring the manifest description.
    ///
    /// Verbose explanations append `details` after the description.
    pub(crate) fn explain(
        &self,
        ctx: &ExplainContext,
        title: String,
        fallback: String,
        details: &[String],
    ) -> Explanation {
        let mut description = self.description.clone().unwrap_or(fallback);
        if ctx.is_verbose() {
            for line in details {
                description.push('\n');
                description.push_str(line);
            }
        }
        Explanation::new(title, description).with_links(self.links.iter().cloned())
    }
}

/// Expand `~` and resolve relative paths against the project root.
pub fn expand_path(raw: &str, project_root: &Path) -> PathBuf {
    let expanded = if raw == "~" {
        dirs::home_dir()
    } else {
        raw.strip_prefix("~/")
            .and_then(|rest| dirs::home_dir().map(|home| home.join(rest)))
    };

    let path = expanded.unwrap_or_else(|| PathBuf::from(raw));
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}

/// Construct the step for one manifest entry.
pub fn build_step(config: &StepConfig, project_root: &Path) -> Box<dyn Step> {
    let meta = StepMeta::from_config(config);

    match &config.kind {
        StepKind::Directory { path } => Box::new(DirectoryStep::new(
            meta,
            path.clone(),
            expand_path(path, project_root),
        )),
        StepKind::File { path, content } => Box::new(FileStep::new(
            meta,
            path.clone(),
            expand_path(path, project_root),
            content.clone().unwrap_or_default().into_bytes(),
        )),
        StepKind::Link {
            source,
            target,
            force,
        } => Box::new(
            LinkStep::new(
                meta,
                target.clone(),
                expand_path(source, project_root),
                expand_path(target, project_root),
            )
            .with_force(*force),
        ),
        StepKind::Command {
            name,
            category,
            version,
            check,
            apply,
            rollback,
        } => Box::new(
            CommandStep::new(meta, name.clone(), check.clone(), apply.clone())
                .with_category(category.clone())
                .with_version(version.clone())
                .with_rollback(rollback.clone())
                .with_cwd(project_root.to_path_buf()),
        ),
    }
}

/// Construct every step declared in a manifest, in manifest order.
pub fn build_steps(config: &ConvergeConfig, project_root: &Path) -> Vec<Box<dyn Step>> {
    config
        .steps
        .iter()
        .map(|step| build_step(step, project_root))
        .collect()
}

/// Validate a manifest and register its steps in a graph.
///
/// # Errors
///
/// Returns `ConfigValidationError` for manifest problems, or a graph error
/// if the steps cannot be registered.
pub fn build_graph(config: &ConvergeConfig, project_root: &Path) -> Result<StepGraph> {
    validate(config)?;

    let mut graph = StepGraph::new();
    for step in build_steps(config, project_root) {
        graph.add_boxed(step)?;
    }

    tracing::debug!("Built graph with {} step(s)", graph.len());
    Ok(graph)
}

/// Lock rollback bookkeeping, recovering the data after a panic elsewhere.
pub(crate) fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Directories `create_dir_all(path)` would create, outermost first.
pub(crate) fn missing_dirs(path: &Path) -> Vec<PathBuf> {
    let mut missing: Vec<PathBuf> = path
        .ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && fs::symlink_metadata(p).is_err())
        .map(Path::to_path_buf)
        .collect();
    missing.reverse();
    missing
}

/// Remove directories recorded by [`missing_dirs`], innermost first.
///
/// A directory that is no longer empty aborts the walk and is left in place.
pub(crate) fn remove_created_dirs(created: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    while let Some(dir) = created.pop() {
        let is_empty = match fs::read_dir(&dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to inspect {}", dir.display()))
            }
        };

        if !is_empty {
            created.clear();
            bail!("{} is not empty; left in place", dir.display());
        }

        fs::remove_dir(&dir)
            .with_context(|| format!("Failed to remove directory {}", dir.display()))?;
    }

    Ok(())
}
