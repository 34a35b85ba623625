//! Interrupt disposition for the shell and its children.
//!
//! The shell itself ignores `SIGINT` so that `Ctrl-C` never kills the session. An ignored
//! disposition survives `exec`, so every child puts the default back before replacing its
//! image; a foreground program can then be interrupted on its own.

use crate::error::{Result, ShellError};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

fn set_interrupt_handler(handler: SigHandler) -> nix::Result<()> {
    let action = SigAction::new(handler, SaFlags::empty(), SigSet::empty());
    // SAFETY: only SIG_IGN / SIG_DFL are installed, no handler code runs.
    unsafe { sigaction(Signal::SIGINT, &action) }?;
    Ok(())
}

/// Ignore `SIGINT` in the controlling process. Called once at session start.
pub fn ignore_interrupt() -> Result<()> {
    set_interrupt_handler(SigHandler::SigIgn).map_err(ShellError::Signal)
}

/// Restore the default `SIGINT` disposition. Called in a forked child before `exec`, so
/// it reports the bare errno and allocates nothing.
pub fn default_interrupt() -> nix::Result<()> {
    set_interrupt_handler(SigHandler::SigDfl)
}
