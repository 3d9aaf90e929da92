//! Visual theme and styling.

use console::Style;

use crate::engine::{Diff, DiffType, StepStatus};

/// Converge's visual theme.
#[derive(Debug, Clone)]
pub struct ConvergeTheme {
    /// Style for success messages (green).
    pub success: Style,
    /// Style for warning messages (orange).
    pub warning: Style,
    /// Style for error messages (red bold).
    pub error: Style,
    /// Style for informational elements (cyan).
    pub info: Style,
    /// Style for dim/secondary text.
    pub dim: Style,
    /// Style for highlighted/important text (bold).
    pub highlight: Style,
    /// Style for headers (cyan bold).
    pub header: Style,
    /// Style for additions in diffs (green).
    pub added: Style,
    /// Style for removals in diffs (red).
    pub removed: Style,
    /// Style for modifications in diffs (yellow).
    pub modified: Style,
}

impl Default for ConvergeTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvergeTheme {
    /// Create the default theme.
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().cyan(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().cyan(),
            added: Style::new().green(),
            removed: Style::new().red(),
            modified: Style::new().yellow(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
            added: Style::new(),
            removed: Style::new(),
            modified: Style::new(),
        }
    }

    /// Format a success message (icon + text in green).
    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    /// Format a warning message (icon + text in orange).
    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    /// Format an error message (icon + text in red bold).
    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    /// Format a header banner.
    pub fn format_header(&self, title: &str) -> String {
        format!(
            "{} {}",
            self.header.apply_to("◆"),
            self.highlight.apply_to(title)
        )
    }

    /// Style for a step status marker.
    pub fn status_style(&self, status: StepStatus) -> &Style {
        match status {
            StepStatus::Satisfied => &self.success,
            StepStatus::NeedsApply => &self.info,
            StepStatus::Failed => &self.error,
            StepStatus::Skipped => &self.warning,
            StepStatus::Unknown => &self.dim,
        }
    }

    /// Format a status marker followed by text.
    pub fn format_status(&self, status: StepStatus, text: &str) -> String {
        format!(
            "{} {}",
            self.status_style(status).apply_to(status.display_char()),
            text
        )
    }

    /// Format a diff, coloured by its kind.
    pub fn format_diff(&self, diff: &Diff) -> String {
        let style = match diff.diff_type {
            DiffType::Add => &self.added,
            DiffType::Remove => &self.removed,
            DiffType::Modify => &self.modified,
            DiffType::NoOp => &self.dim,
        };
        format!("{}", style.apply_to(diff))
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_formats_messages() {
        let theme = ConvergeTheme::plain();
        assert_eq!(theme.format_success("Complete"), "✓ Complete");
        assert_eq!(theme.format_warning("Caution"), "⚠ Caution");
        assert_eq!(theme.format_error("Failed"), "✗ Failed");
        assert_eq!(theme.format_header("Plan"), "◆ Plan");
    }

    #[test]
    fn theme_formats_status() {
        let theme = ConvergeTheme::plain();
        assert_eq!(
            theme.format_status(StepStatus::NeedsApply, "dir:create:a"),
            "○ dir:create:a"
        );
        assert_eq!(theme.format_status(StepStatus::Satisfied, "x"), "✓ x");
    }

    #[test]
    fn theme_formats_diff() {
        let theme = ConvergeTheme::plain();
        let diff = Diff::add("package", "git", "2.43.0");
        assert_eq!(theme.format_diff(&diff), diff.to_string());
    }

    #[test]
    fn default_impl_matches_new() {
        let default = ConvergeTheme::default();
        let new = ConvergeTheme::new();
        assert_eq!(default.format_success("test"), new.format_success("test"));
    }
}
