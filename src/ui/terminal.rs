//! Terminal UI.

use console::Term;
use std::io::Write;

use crate::engine::{Diff, StepStatus};

use super::{should_use_colors, ConvergeTheme, OutputMode, UserInterface};

/// Terminal UI implementation.
///
/// Status goes to stdout, warnings and errors to stderr.
pub struct TerminalUI {
    out: Term,
    err: Term,
    theme: ConvergeTheme,
    mode: OutputMode,
}

impl TerminalUI {
    /// Create a new terminal UI.
    pub fn new(mode: OutputMode) -> Self {
        let theme = if should_use_colors() {
            ConvergeTheme::new()
        } else {
            ConvergeTheme::plain()
        };

        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            theme,
            mode,
        }
    }

    /// Create a terminal UI that never emits colour codes.
    pub fn plain(mode: OutputMode) -> Self {
        Self {
            theme: ConvergeTheme::plain(),
            ..Self::new(mode)
        }
    }
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.out, "{}", msg).ok();
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.out, "{}", self.theme.format_success(msg)).ok();
        }
    }

    fn warning(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.theme.format_warning(msg)).ok();
    }

    fn error(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.theme.format_error(msg)).ok();
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_status() {
            writeln!(self.out, "\n{}\n", self.theme.format_header(title)).ok();
        }
    }

    fn show_step(&mut self, status: StepStatus, text: &str, diff: Option<&Diff>) {
        if !self.mode.shows_status() {
            return;
        }

        writeln!(self.out, "  {}", self.theme.format_status(status, text)).ok();
        if let Some(diff) = diff.filter(|d| !d.is_empty()) {
            writeln!(self.out, "      {}", self.theme.format_diff(diff)).ok();
        }
    }

    fn output(&mut self, text: &str) {
        writeln!(self.out, "{}", text).ok();
    }
}

/// Create the UI for a command-line run.
pub fn create_ui(mode: OutputMode, color: bool) -> Box<dyn UserInterface> {
    if color {
        Box::new(TerminalUI::new(mode))
    } else {
        Box::new(TerminalUI::plain(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_ui_output_mode() {
        let ui = TerminalUI::new(OutputMode::Quiet);
        assert_eq!(ui.output_mode(), OutputMode::Quiet);
    }

    #[test]
    fn create_ui_respects_mode() {
        let ui = create_ui(OutputMode::Verbose, false);
        assert_eq!(ui.output_mode(), OutputMode::Verbose);
    }
}
