//! Manifest schema definitions.
//!
//! These structs map directly onto the YAML manifest format.

use serde::{Deserialize, Serialize};

use crate::engine::SkipPropagation;

/// Root structure of `converge.yml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergeConfig {
    /// Global settings
    pub settings: Settings,

    /// Step declarations, in manifest order
    pub steps: Vec<StepConfig>,
}

/// Defaults for `apply`, overridable from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Roll back applied steps when one fails
    #[serde(skip_serializing_if = "is_false")]
    pub rollback_on_failure: bool,

    /// How failures block dependent steps
    pub skip_propagation: SkipPropagation,

    /// Abort the run after this many seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn is_false(v: &bool) -> bool {
    !v
}

/// One declared step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Explicit identifier; derived from the kind when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Identifiers of steps that must run first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Longer text for `explain`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Reference links for `explain`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,

    /// What the step manages
    #[serde(flatten)]
    pub kind: StepKind,
}

impl StepConfig {
    /// Build a step declaration of the given kind with no extra metadata.
    pub fn new(kind: StepKind) -> Self {
        Self {
            id: None,
            depends_on: Vec::new(),
            description: None,
            links: Vec::new(),
            kind,
        }
    }

    /// The identifier this step is registered under.
    pub fn step_id(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => self.kind.default_id(),
        }
    }
}

/// The kinds of state a manifest can declare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// A directory that must exist
    Directory {
        /// Directory path
        #[serde(default)]
        path: String,
    },

    /// A file with exact contents
    File {
        /// File path
        #[serde(default)]
        path: String,

        /// Desired file contents
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },

    /// A symlink pointing at a source
    Link {
        /// Path the link points to
        #[serde(default)]
        source: String,

        /// Where the link is created
        #[serde(default)]
        target: String,

        /// Replace an existing non-link file, keeping a backup
        #[serde(default, skip_serializing_if = "is_false")]
        force: bool,
    },

    /// State managed through shell commands
    Command {
        /// Name of the managed thing (package, service, ...)
        #[serde(default)]
        name: String,

        /// Category shown in diffs
        #[serde(default = "default_category")]
        category: String,

        /// Desired version, shown in diffs
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,

        /// Exits 0 when the desired state holds
        #[serde(default)]
        check: String,

        /// Brings the system into the desired state
        #[serde(default)]
        apply: String,

        /// Undoes `apply`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rollback: Option<String>,
    },
}

fn default_category() -> String {
    "command".to_string()
}

impl StepKind {
    /// Short name of the kind, as written in the manifest.
    pub fn type_name(&self) -> &'static str {
        match self {
            StepKind::Directory { .. } => "directory",
            StepKind::File { .. } => "file",
            StepKind::Link { .. } => "link",
            StepKind::Command { .. } => "command",
        }
    }

    /// Identifier used when the manifest gives none.
    pub fn default_id(&self) -> String {
        match self {
            StepKind::Directory { path } => format!("dir:create:{}", path),
            StepKind::File { path, .. } => format!("file:write:{}", path),
            StepKind::Link { target, .. } => format!("link:create:{}", target),
            StepKind::Command { name, .. } => format!("command:run:{}", name),
        }
    }
}
