//! Run-wide ambient configuration: cancellation and dry-run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{ConvergeError, Result};

/// Cooperative cancellation flag shared by every clone.
///
/// Setting the flag is async-signal-safe (a single atomic store), which lets a
/// signal handler cancel a run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Ambient configuration threaded through every step call.
///
/// Immutable: every `with_*` method returns a derived copy. Copies share the
/// cancellation token, so cancelling the original cancels the derived
/// contexts too.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    dry_run: bool,
}

impl RunContext {
    /// A fresh context: not cancelled, no deadline, not a dry run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a copy with the dry-run flag set.
    pub fn with_dry_run(&self, dry_run: bool) -> Self {
        Self {
            dry_run,
            ..self.clone()
        }
    }

    /// Derive a copy observing the given cancellation token.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            token,
            ..self.clone()
        }
    }

    /// Derive a copy that counts as cancelled once `deadline` has passed.
    ///
    /// An earlier existing deadline is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    /// Derive a copy that counts as cancelled after `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Whether this run only previews changes.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The shared cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether the run was cancelled or its deadline passed.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Return `Err(Cancelled)` if the run was cancelled.
    ///
    /// Long-running steps may call this between their own sub-operations.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ConvergeError::Cancelled)
        } else {
            Ok(())
        }
    }
}
