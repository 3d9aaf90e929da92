//! Interrupt handling.
//!
//! SIGINT and SIGTERM cancel the shared [`CancellationToken`] so the current
//! run stops between steps and running shell commands are killed. A second
//! signal falls through to the default action and terminates the process.

use std::sync::OnceLock;

use crate::engine::CancellationToken;

static INTERRUPT: OnceLock<CancellationToken> = OnceLock::new();

/// Install the interrupt handler and return the token it cancels.
///
/// Calling this more than once returns the same token.
pub fn install_interrupt_handler() -> CancellationToken {
    let token = INTERRUPT.get_or_init(CancellationToken::new).clone();

    #[cfg(unix)]
    {
        let handler = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
        for sig in [libc::SIGINT, libc::SIGTERM] {
            // SAFETY: the handler only performs an atomic store and resets
            // its own disposition, both async-signal-safe.
            let previous = unsafe { libc::signal(sig, handler) };
            if previous == libc::SIG_ERR {
                tracing::warn!("Could not install handler for signal {}", sig);
            }
        }
    }

    token
}

#[cfg(unix)]
extern "C" fn on_interrupt(sig: libc::c_int) {
    if let Some(token) = INTERRUPT.get() {
        token.cancel();
    }
    // SAFETY: signal(2) is async-signal-safe.
    unsafe {
        libc::signal(sig, libc::SIG_DFL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_returns_shared_token() {
        let first = install_interrupt_handler();
        let second = install_interrupt_handler();

        first.cancel();
        assert!(second.is_cancelled());
    }
}
