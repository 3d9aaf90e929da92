//! Shell command execution.

use crate::engine::RunContext;
use crate::error::{ConvergeError, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::platform::detect_shell;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Result of executing a shell command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,

    /// Whether the command was killed because the run was cancelled.
    pub interrupted: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            stdout,
            stderr,
            duration,
            success: true,
            interrupted: false,
        }
    }

    /// Create a failure result.
    pub fn failure(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            success: false,
            interrupted: false,
        }
    }

    /// Short description of why the command failed, for error messages.
    pub fn failure_reason(&self) -> String {
        if self.interrupted {
            return "interrupted".to_string();
        }

        let status = match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            status
        } else {
            format!("{}: {}", status, stderr)
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with system env).
    pub env: HashMap<String, String>,

    /// Kill the command once this context is cancelled or past its deadline.
    pub context: Option<RunContext>,
}

/// Execute a shell command, capturing its output.
///
/// # Errors
///
/// Returns `CommandFailed` if the shell cannot be started. A command that
/// runs and exits non-zero is an `Ok` result with `success == false`.
pub fn execute(command: &str, options: &CommandOptions) -> Result<CommandResult> {
    let start = Instant::now();
    let shell = detect_shell();

    let mut cmd = Command::new(&shell.executable);
    cmd.arg(shell.command_flag())
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    // Own process group so cancellation can kill grandchildren too.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    tracing::debug!("Running `{}` with {}", command, shell.executable.display());

    let mut child = cmd.spawn().map_err(|e| {
        tracing::debug!("Failed to spawn `{}`: {}", command, e);
        ConvergeError::CommandFailed {
            command: command.to_string(),
            code: None,
        }
    })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let (status, interrupted) = wait(&mut child, options.context.as_ref()).map_err(|e| {
        tracing::debug!("Failed waiting on `{}`: {}", command, e);
        ConvergeError::CommandFailed {
            command: command.to_string(),
            code: None,
        }
    })?;

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();
    let duration = start.elapsed();

    match status {
        Some(status) if status.success() && !interrupted => {
            Ok(CommandResult::success(stdout, stderr, duration))
        }
        status => {
            let mut result = CommandResult::failure(
                status.and_then(|s| s.code()),
                stdout,
                stderr,
                duration,
            );
            result.interrupted = interrupted;
            Ok(result)
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Wait for the child, killing it if the context is cancelled first.
fn wait(
    child: &mut Child,
    ctx: Option<&RunContext>,
) -> std::io::Result<(Option<std::process::ExitStatus>, bool)> {
    let Some(ctx) = ctx else {
        return child.wait().map(|status| (Some(status), false));
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((Some(status), false));
        }

        if ctx.is_cancelled() {
            tracing::debug!("Killing command {} after cancellation", child.id());
            kill(child);
            let status = child.wait().ok();
            return Ok((status, true));
        }

        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn kill(child: &mut Child) {
    // SAFETY: kill(2) with a negated pid signals the process group created
    // for this child in `execute`; it touches no memory.
    let rc = unsafe { libc::kill(-(child.id() as libc::pid_t), libc::SIGKILL) };
    if rc != 0 {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill(child: &mut Child) {
    let _ = child.kill();
}
