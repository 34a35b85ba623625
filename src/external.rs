//! Launching programs that are not built-ins.

use crate::command::ExitStatus;
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::error::{Result, ShellError};
use crate::jobs::ExecMode;
use crate::redirect::Redirections;
use crate::signals;
use nix::errno::Errno;
use nix::fcntl::{OFlag, open};
use nix::libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::sys::stat::Mode;
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid, close, dup2, execvp, fork, pipe2};
use std::ffi::{CStr, CString};
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use tracing::debug;

/// Exit code of a child that could not run its program.
const EXEC_FAILURE: i32 = 1;

/// Size of a [`ChildFailure`] on the status pipe: stage tag plus errno.
const REPORT_LEN: usize = 5;

/// Step of the child's setup that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Stage {
    Interrupt = 1,
    Redirect = 2,
    Exec = 3,
}

/// Setup failure sent from the child to the parent over the close-on-exec status pipe.
///
/// The child only writes these fixed bytes; the parent turns them into the user-visible
/// diagnostic, so the message reaches the shell's own output even when the child's
/// stdout is a file or the null device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChildFailure {
    stage: Stage,
    errno: Errno,
}

impl ChildFailure {
    fn encode(self) -> [u8; REPORT_LEN] {
        let mut buf = [0u8; REPORT_LEN];
        buf[0] = self.stage as u8;
        buf[1..].copy_from_slice(&(self.errno as i32).to_ne_bytes());
        buf
    }

    fn decode(buf: &[u8]) -> Option<Self> {
        let (&tag, errno) = buf.split_first()?;
        let stage = match tag {
            1 => Stage::Interrupt,
            2 => Stage::Redirect,
            3 => Stage::Exec,
            _ => return None,
        };
        let errno: [u8; 4] = errno.try_into().ok()?;
        Some(Self {
            stage,
            errno: Errno::from_raw(i32::from_ne_bytes(errno)),
        })
    }

    fn message(&self, program: &CStr) -> String {
        let program = program.to_string_lossy();
        match self.stage {
            Stage::Interrupt => format!(
                "{}: cannot restore interrupt handling: {}",
                program,
                self.errno.desc()
            ),
            Stage::Redirect => format!("{}: cannot redirect: {}", program, self.errno.desc()),
            Stage::Exec => format!("{}: {}", program, self.errno.desc()),
        }
    }
}

/// A program ready to be forked: everything the child needs is prepared in the parent so
/// that the child does no more than rebind descriptors and exec.
pub(crate) struct ExternalCommand {
    argv: Vec<CString>,
    redirections: Redirections,
    mode: ExecMode,
    null_device: CString,
}

impl ExternalCommand {
    pub(crate) fn new(
        redirections: Redirections,
        mode: ExecMode,
        config: &ShellConfig,
    ) -> Result<Self> {
        let argv = redirections
            .argv
            .iter()
            .map(|word| {
                CString::new(word.as_str()).map_err(|_| ShellError::NulInArgument(word.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        let null_device = CString::new(config.null_device.as_os_str().as_bytes())
            .map_err(|_| ShellError::NulInArgument(config.null_device.display().to_string()))?;
        Ok(Self {
            argv,
            redirections,
            mode,
            null_device,
        })
    }

    /// Fork and exec the program.
    ///
    /// In the foreground this blocks until the child terminates and records its status.
    /// In the background it announces the pid, hands it to the job table and returns.
    /// Either way a child that fails to start has its reason printed on `out`.
    pub(crate) fn spawn(self, env: &mut Environment, out: &mut dyn Write) -> Result<()> {
        if self.argv.is_empty() {
            return Ok(());
        }

        // Anything still buffered would otherwise be written twice.
        out.flush()?;
        io::stdout().flush()?;

        let (report_rx, report_tx) = pipe2(OFlag::O_CLOEXEC).map_err(ShellError::Pipe)?;

        // SAFETY: the child only rebinds descriptors, execs, and exits, without allocating.
        match unsafe { fork() }.map_err(ShellError::Fork)? {
            ForkResult::Child => self.exec_child(File::from(report_tx)),
            ForkResult::Parent { child } => {
                drop(report_tx);
                debug!(pid = %child, program = ?self.argv[0], mode = ?self.mode, "forked");

                // EOF on the pipe means the exec succeeded or the child exited early
                let failure = read_failure(File::from(report_rx))?;
                let diagnostic = failure.map(|failure| failure.message(&self.argv[0]));
                let mode = self.mode;
                // closes the parent's copies of the redirection files
                drop(self);

                if mode == ExecMode::Background {
                    writeln!(out, "background pid is {}", child)?;
                    env.jobs.register(child);
                }
                if let Some(diagnostic) = diagnostic {
                    writeln!(out, "{}", diagnostic)?;
                }
                out.flush()?;

                if mode == ExecMode::Foreground {
                    let status = wait_foreground(child)?;
                    debug!(pid = %child, %status, "foreground job finished");
                    env.last_status = status;
                    if let ExitStatus::Signaled(_) = status {
                        writeln!(out, "{}", status)?;
                        out.flush()?;
                    }
                }
                Ok(())
            }
        }
    }

    fn exec_child(&self, report: File) -> ! {
        if self.redirections.failed() {
            exit_child(EXEC_FAILURE);
        }

        if let Err(errno) = signals::default_interrupt() {
            report_and_exit(&report, Stage::Interrupt, errno);
        }

        if let Err(errno) = self.bind_streams() {
            report_and_exit(&report, Stage::Redirect, errno);
        }

        let errno = match execvp(&self.argv[0], &self.argv) {
            Ok(never) => match never {},
            Err(errno) => errno,
        };
        report_and_exit(&report, Stage::Exec, errno)
    }

    /// Point fd 0 and fd 1 at the redirection targets. Background jobs that were not
    /// redirected get the null device so they never touch the terminal.
    fn bind_streams(&self) -> nix::Result<()> {
        match (&self.redirections.input, self.mode) {
            (Some(file), _) => {
                let fd = file.as_raw_fd();
                dup2(fd, STDIN_FILENO)?;
                if fd != STDIN_FILENO {
                    close(fd)?;
                }
            }
            (None, ExecMode::Background) => {
                bind_null_device(&self.null_device, OFlag::O_RDONLY, STDIN_FILENO)?
            }
            (None, ExecMode::Foreground) => {}
        }

        match (&self.redirections.output, self.mode) {
            (Some(file), _) => {
                dup2(file.as_raw_fd(), STDOUT_FILENO)?;
            }
            (None, ExecMode::Background) => {
                bind_null_device(&self.null_device, OFlag::O_WRONLY, STDOUT_FILENO)?
            }
            (None, ExecMode::Foreground) => {}
        }
        Ok(())
    }
}

fn bind_null_device(path: &CStr, flags: OFlag, target: RawFd) -> nix::Result<()> {
    let fd = open(path, flags, Mode::empty())?;
    dup2(fd, target)?;
    close(fd)?;
    Ok(())
}

fn report_and_exit(mut report: &File, stage: Stage, errno: Errno) -> ! {
    let _ = report.write_all(&ChildFailure { stage, errno }.encode());
    exit_child(EXEC_FAILURE)
}

fn exit_child(code: i32) -> ! {
    // SAFETY: `_exit` ends the forked child without running the parent's atexit handlers
    // or flushing stdio buffers that belong to the parent.
    unsafe { nix::libc::_exit(code) }
}

fn read_failure(mut pipe: File) -> Result<Option<ChildFailure>> {
    let mut buf = Vec::with_capacity(REPORT_LEN);
    pipe.read_to_end(&mut buf)?;
    Ok(ChildFailure::decode(&buf))
}

fn wait_foreground(pid: Pid) -> Result<ExitStatus> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(status) = ExitStatus::from_wait(status) {
                    return Ok(status);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(source) => {
                return Err(ShellError::Wait {
                    pid: pid.as_raw(),
                    source,
                });
            }
        }
    }
}
