//! Proposed-change descriptions used for previews and reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change a step would make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffType {
    /// Something new would be created.
    Add,
    /// Something existing would be removed.
    Remove,
    /// Something existing would change.
    Modify,
    /// Nothing would change.
    #[default]
    NoOp,
}

impl DiffType {
    /// Single-character marker for plain-text previews.
    pub fn symbol(&self) -> char {
        match self {
            DiffType::Add => '+',
            DiffType::Remove => '-',
            DiffType::Modify => '~',
            DiffType::NoOp => ' ',
        }
    }
}

impl fmt::Display for DiffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiffType::Add => "add",
            DiffType::Remove => "remove",
            DiffType::Modify => "modify",
            DiffType::NoOp => "no_op",
        };
        write!(f, "{}", s)
    }
}

/// A structured description of a proposed change.
///
/// The zero value (`Diff::default()`) is a `NoOp` with empty fields and means
/// "nothing to show".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Diff {
    /// What kind of change this is.
    #[serde(rename = "type")]
    pub diff_type: DiffType,

    /// Resource category, e.g. `package`, `file`, `link`.
    pub category: String,

    /// Resource name within the category.
    pub name: String,

    /// Current value (empty when the resource does not exist yet).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub old_value: String,

    /// Desired value (empty when the resource would be removed).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub new_value: String,
}

impl Diff {
    /// Create a diff with every field spelled out.
    pub fn new(
        diff_type: DiffType,
        category: impl Into<String>,
        name: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            diff_type,
            category: category.into(),
            name: name.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }

    /// A resource that would be created.
    pub fn add(
        category: impl Into<String>,
        name: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self::new(DiffType::Add, category, name, "", new_value)
    }

    /// A resource that would be removed.
    pub fn remove(
        category: impl Into<String>,
        name: impl Into<String>,
        old_value: impl Into<String>,
    ) -> Self {
        Self::new(DiffType::Remove, category, name, old_value, "")
    }

    /// A resource whose value would change.
    pub fn modify(
        category: impl Into<String>,
        name: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self::new(DiffType::Modify, category, name, old_value, new_value)
    }

    /// Whether there is anything to show.
    pub fn is_empty(&self) -> bool {
        self.diff_type == DiffType::NoOp
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }

        write!(f, "{} {} {}", self.diff_type.symbol(), self.category, self.name)?;
        match (self.old_value.is_empty(), self.new_value.is_empty()) {
            (true, true) => Ok(()),
            (true, false) => write!(f, " ({})", self.new_value),
            (false, true) => write!(f, " ({})", self.old_value),
            (false, false) => write!(f, " ({} -> {})", self.old_value, self.new_value),
        }
    }
}
