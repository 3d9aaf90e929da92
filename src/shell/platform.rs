//! Platform-specific shell detection.

use std::path::PathBuf;

/// Environment variable that overrides the shell used for step commands.
pub const SHELL_OVERRIDE_VAR: &str = "CONVERGE_SHELL";

/// Information about the shell used to run step commands.
#[derive(Debug, Clone)]
pub struct ShellInfo {
    /// Shell executable path.
    pub executable: PathBuf,

    /// Shell flavour.
    pub name: ShellType,
}

impl ShellInfo {
    /// Flag that makes the shell run a single command string.
    pub fn command_flag(&self) -> &'static str {
        match self.name {
            ShellType::Cmd => "/C",
            ShellType::PowerShell => "-Command",
            _ => "-c",
        }
    }
}

/// Known shell types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    Sh,
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Cmd,
    Unknown,
}

impl ShellType {
    /// Parse shell type from executable name.
    pub fn from_executable(exe: &str) -> Self {
        let name = std::path::Path::new(exe)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match name.as_str() {
            "sh" | "dash" => ShellType::Sh,
            "bash" => ShellType::Bash,
            "zsh" => ShellType::Zsh,
            "fish" => ShellType::Fish,
            "powershell" | "pwsh" => ShellType::PowerShell,
            "cmd" => ShellType::Cmd,
            _ => ShellType::Unknown,
        }
    }
}

/// Detect the shell for step commands.
///
/// Step commands run non-interactively, so the user's login shell is not
/// used; `CONVERGE_SHELL` selects a different one.
pub fn detect_shell() -> ShellInfo {
    let executable = std::env::var_os(SHELL_OVERRIDE_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_shell);
    let name = ShellType::from_executable(&executable.to_string_lossy());

    ShellInfo { executable, name }
}

fn default_shell() -> PathBuf {
    if cfg!(target_os = "windows") {
        std::env::var("COMSPEC")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("cmd.exe"))
    } else {
        PathBuf::from("/bin/sh")
    }
}
