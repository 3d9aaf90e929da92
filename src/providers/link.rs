//! Symlink provider.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context};

use super::{lock, StepMeta};
use crate::engine::{
    Diff, ExplainContext, Explanation, Rollback, RunContext, Step, StepId, StepStatus,
};

/// Suffix for files moved aside by a forced link.
pub const BACKUP_SUFFIX: &str = ".converge-backup";

/// What occupies the target path right now.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Occupant {
    Nothing,
    Link(PathBuf),
    File,
    Directory,
}

/// What `apply` displaced, for rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Previous {
    Absent,
    Link(PathBuf),
    BackedUp(PathBuf),
}

/// Ensures `target` is a symlink pointing at `source`.
#[derive(Debug)]
pub struct LinkStep {
    meta: StepMeta,
    display: String,
    source: PathBuf,
    target: PathBuf,
    force: bool,
    previous: Mutex<Option<Previous>>,
}

impl LinkStep {
    /// `display` is the target as written in the manifest.
    pub fn new(meta: StepMeta, display: impl Into<String>, source: PathBuf, target: PathBuf) -> Self {
        Self {
            meta,
            display: display.into(),
            source,
            target,
            force: false,
            previous: Mutex::new(None),
        }
    }

    /// Allow replacing an existing regular file or directory.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Where the link points.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Where the link lives.
    pub fn target(&self) -> &Path {
        &self.target
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.target.as_os_str().to_os_string();
        name.push(BACKUP_SUFFIX);
        PathBuf::from(name)
    }

    fn occupant(&self) -> anyhow::Result<Occupant> {
        let metadata = match fs::symlink_metadata(&self.target) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Occupant::Nothing),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to inspect {}", self.target.display()))
            }
        };

        if metadata.file_type().is_symlink() {
            let dest = fs::read_link(&self.target)
                .with_context(|| format!("Failed to read link {}", self.target.display()))?;
            Ok(Occupant::Link(dest))
        } else if metadata.is_dir() {
            Ok(Occupant::Directory)
        } else {
            Ok(Occupant::File)
        }
    }

    fn link(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        symlink(&self.source, &self.target).with_context(|| {
            format!(
                "Failed to link {} -> {}",
                self.target.display(),
                self.source.display()
            )
        })
    }

    /// Return the target to the state `apply` found it in.
    fn restore(&self, state: Previous) -> anyhow::Result<()> {
        if let Occupant::Link(_) = self.occupant()? {
            fs::remove_file(&self.target)
                .with_context(|| format!("Failed to remove link {}", self.target.display()))?;
        }

        match state {
            Previous::Absent => Ok(()),
            Previous::Link(dest) => symlink(&dest, &self.target)
                .with_context(|| format!("Failed to restore link {}", self.target.display())),
            Previous::BackedUp(backup) => fs::rename(&backup, &self.target)
                .with_context(|| format!("Failed to restore {}", self.target.display())),
        }
    }
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, target)
    } else {
        std::os::windows::fs::symlink_file(source, target)
    }
}

impl Step for LinkStep {
    fn id(&self) -> StepId {
        self.meta.id.clone()
    }

    fn depends_on(&self) -> Vec<StepId> {
        self.meta.depends_on.clone()
    }

    fn check(&self, _ctx: &RunContext) -> anyhow::Result<StepStatus> {
        match self.occupant()? {
            Occupant::Link(dest) if dest == self.source => Ok(StepStatus::Satisfied),
            _ => Ok(StepStatus::NeedsApply),
        }
    }

    fn plan(&self, _ctx: &RunContext) -> anyhow::Result<Diff> {
        let source = self.source.display().to_string();
        let diff = match self.occupant()? {
            Occupant::Nothing => Diff::add("link", &self.display, source),
            Occupant::Link(dest) => {
                Diff::modify("link", &self.display, dest.display().to_string(), source)
            }
            Occupant::File => Diff::modify("link", &self.display, "file", source),
            Occupant::Directory => Diff::modify("link", &self.display, "directory", source),
        };
        Ok(diff)
    }

    fn apply(&self, _ctx: &RunContext) -> anyhow::Result<()> {
        let previous = match self.occupant()? {
            Occupant::Nothing => Previous::Absent,
            Occupant::Link(dest) => {
                fs::remove_file(&self.target).with_context(|| {
                    format!("Failed to remove old link {}", self.target.display())
                })?;
                Previous::Link(dest)
            }
            Occupant::File | Occupant::Directory if !self.force => {
                bail!(
                    "{} already exists and is not a symlink; set `force: true` to replace it",
                    self.target.display()
                );
            }
            Occupant::File | Occupant::Directory => {
                let backup = self.backup_path();
                if fs::symlink_metadata(&backup).is_ok() {
                    bail!("Backup path {} already exists", backup.display());
                }
                fs::rename(&self.target, &backup).with_context(|| {
                    format!("Failed to move {} aside", self.target.display())
                })?;
                tracing::info!("Moved {} to {}", self.target.display(), backup.display());
                Previous::BackedUp(backup)
            }
        };

        // Put back what was displaced if the new link cannot be made.
        if let Err(error) = self.link() {
            if let Err(restore_error) = self.restore(previous) {
                tracing::warn!(
                    "Could not restore {}: {:#}",
                    self.target.display(),
                    restore_error
                );
            }
            return Err(error);
        }

        *lock(&self.previous) = Some(previous);
        Ok(())
    }

    fn explain(&self, ctx: &ExplainContext) -> Explanation {
        let replace = if self.force {
            format!(
                "An existing file is moved to {} first.",
                self.backup_path().display()
            )
        } else {
            "An existing regular file blocks the link.".to_string()
        };

        self.meta.explain(
            ctx,
            format!("Link {}", self.display),
            format!(
                "Points {} at {}.",
                self.display,
                self.source.display()
            ),
            &[
                format!("Resolved target: {}", self.target.display()),
                replace,
                "Rollback restores whatever was at the target before.".to_string(),
            ],
        )
    }

    fn as_rollback(&self) -> Option<&dyn Rollback> {
        Some(self)
    }
}

impl Rollback for LinkStep {
    fn can_rollback(&self) -> bool {
        lock(&self.previous).is_some()
    }

    fn rollback(&self, _ctx: &RunContext) -> anyhow::Result<()> {
        let Some(state) = lock(&self.previous).take() else {
            return Ok(());
        };
        self.restore(state)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::engine::DiffType;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            fs::write(temp.path().join("source.txt"), "dotfile").unwrap();
            Self { temp }
        }

        fn source(&self) -> PathBuf {
            self.temp.path().join("source.txt")
        }

        fn target(&self) -> PathBuf {
            self.temp.path().join("home/.rc")
        }

        fn step(&self) -> LinkStep {
            LinkStep::new(
                StepMeta::new("link:create:home/.rc"),
                "home/.rc",
                self.source(),
                self.target(),
            )
        }
    }

    #[test]
    fn missing_link_plans_add() {
        let fx = Fixture::new();
        let step = fx.step();
        let ctx = RunContext::new();

        assert_eq!(step.check(&ctx).unwrap(), StepStatus::NeedsApply);
        let diff = step.plan(&ctx).unwrap();
        assert_eq!(diff.diff_type, DiffType::Add);
        assert_eq!(diff.new_value, fx.source().display().to_string());
    }

    #[test]
    fn apply_creates_link_and_parents() {
        let fx = Fixture::new();
        let step = fx.step();
        let ctx = RunContext::new();

        step.apply(&ctx).unwrap();

        assert_eq!(fs::read_link(fx.target()).unwrap(), fx.source());
        assert_eq!(step.check(&ctx).unwrap(), StepStatus::Satisfied);
    }

    #[test]
    fn apply_replaces_link_and_rollback_restores_it() {
        let fx = Fixture::new();
        let other = fx.temp.path().join("other.txt");
        fs::write(&other, "other").unwrap();
        fs::create_dir_all(fx.target().parent().unwrap()).unwrap();
        symlink(&other, &fx.target()).unwrap();

        let step = fx.step();
        let ctx = RunContext::new();
        assert_eq!(
            step.plan(&ctx).unwrap().old_value,
            other.display().to_string()
        );

        step.apply(&ctx).unwrap();
        assert_eq!(fs::read_link(fx.target()).unwrap(), fx.source());

        step.rollback(&ctx).unwrap();
        assert_eq!(fs::read_link(fx.target()).unwrap(), other);
    }

    #[test]
    fn apply_refuses_regular_file_without_force() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.target().parent().unwrap()).unwrap();
        fs::write(fx.target(), "mine").unwrap();

        let step = fx.step();
        let ctx = RunContext::new();
        assert_eq!(step.plan(&ctx).unwrap().old_value, "file");

        let err = step.apply(&ctx).unwrap_err();
        assert!(err.to_string().contains("force"));
        assert_eq!(fs::read_to_string(fx.target()).unwrap(), "mine");
        assert!(!step.can_rollback());
    }

    #[test]
    fn forced_apply_backs_up_and_rollback_restores() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.target().parent().unwrap()).unwrap();
        fs::write(fx.target(), "mine").unwrap();

        let step = fx.step().with_force(true);
        let ctx = RunContext::new();
        step.apply(&ctx).unwrap();

        let backup = fx.temp.path().join("home/.rc.converge-backup");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "mine");
        assert_eq!(fs::read_link(fx.target()).unwrap(), fx.source());

        step.rollback(&ctx).unwrap();
        assert_eq!(fs::read_to_string(fx.target()).unwrap(), "mine");
        assert!(!backup.exists());
    }

    #[test]
    fn failed_link_puts_backup_back() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let fx = Fixture::new();
        fs::create_dir_all(fx.target().parent().unwrap()).unwrap();
        fs::write(fx.target(), "mine").unwrap();

        // A NUL byte makes the symlink call itself fail.
        let unlinkable = PathBuf::from(OsStr::from_bytes(b"bad\0source"));
        let step = LinkStep::new(
            StepMeta::new("link:create:home/.rc"),
            "home/.rc",
            unlinkable,
            fx.target(),
        )
        .with_force(true);
        let ctx = RunContext::new();

        let err = step.apply(&ctx).unwrap_err();
        assert!(err.to_string().contains("Failed to link"));
        assert_eq!(fs::read_to_string(fx.target()).unwrap(), "mine");
        assert!(!fx.temp.path().join("home/.rc.converge-backup").exists());
        assert!(!step.can_rollback());
    }

    #[test]
    fn rollback_removes_new_link() {
        let fx = Fixture::new();
        let step = fx.step();
        let ctx = RunContext::new();

        step.apply(&ctx).unwrap();
        step.rollback(&ctx).unwrap();

        assert!(fs::symlink_metadata(fx.target()).is_err());
    }
}
