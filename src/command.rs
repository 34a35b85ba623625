use crate::env::Environment;
use anyhow::Result;
use nix::sys::wait::WaitStatus;
use std::fmt;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// How the most recently completed process ended.
///
/// Launched programs report completion through the usual exit-code / terminating-signal
/// convention; this is the decoded form the `status` built-in prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The process called `exit` with this code.
    Exited(ExitCode),
    /// The process was killed by this signal number.
    Signaled(i32),
}

impl ExitStatus {
    /// Decode a `waitpid` result. Returns `None` for states that are not a termination
    /// (still alive, stopped, continued).
    pub fn from_wait(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(ExitStatus::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(ExitStatus::Signaled(signal as i32)),
            _ => None,
        }
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        ExitStatus::Exited(0)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit value {}", code),
            ExitStatus::Signaled(signal) => write!(f, "terminated by signal {}", signal),
        }
    }
}

/// Object-safe trait for a command the shell runs in-process.
pub trait ExecutableCommand {
    /// Executes the command, writing any user-visible text to `stdout`.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment)
    -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;
    use nix::unistd::Pid;

    #[test]
    fn test_decode_exit_and_signal() {
        let pid = Pid::from_raw(42);
        assert_eq!(
            ExitStatus::from_wait(WaitStatus::Exited(pid, 3)),
            Some(ExitStatus::Exited(3))
        );
        assert_eq!(
            ExitStatus::from_wait(WaitStatus::Signaled(pid, Signal::SIGTERM, false)),
            Some(ExitStatus::Signaled(15))
        );
        assert_eq!(ExitStatus::from_wait(WaitStatus::StillAlive), None);
    }

    #[test]
    fn test_display_matches_status_report() {
        assert_eq!(ExitStatus::Exited(0).to_string(), "exit value 0");
        assert_eq!(ExitStatus::Signaled(9).to_string(), "terminated by signal 9");
        assert_eq!(ExitStatus::default(), ExitStatus::Exited(0));
    }
}
