//! Bookkeeping for background children.

use crate::command::ExitStatus;
use crate::env::Environment;
use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, waitpid};
use nix::unistd::Pid;
use std::io::{self, Write};
use tracing::{debug, warn};

/// Whether a child blocks the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Foreground,
    Background,
}

impl ExecMode {
    pub fn from_background(background: bool) -> Self {
        if background {
            ExecMode::Background
        } else {
            ExecMode::Foreground
        }
    }
}

/// A tracked child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    pub pid: Pid,
    pub mode: ExecMode,
}

/// A background job that has terminated and been reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub pid: Pid,
    pub status: ExitStatus,
}

/// Background jobs in launch order.
///
/// Entries are removed as soon as their termination has been observed, so the table only
/// ever holds children that may still be running.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
}

impl JobTable {
    pub fn register(&mut self, pid: Pid) {
        if self.contains(pid) {
            warn!(%pid, "background job registered twice");
            return;
        }
        debug!(%pid, "registered background job");
        self.jobs.push(Job {
            pid,
            mode: ExecMode::Background,
        });
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.jobs.iter().any(|job| job.pid == pid)
    }

    /// One non-blocking pass over the registered jobs.
    ///
    /// Returns the oldest job that has terminated and removes it from the table, or `None`
    /// if every job is still running. Never blocks.
    pub fn poll_once(&mut self) -> Option<Completion> {
        let mut index = 0;
        while index < self.jobs.len() {
            let pid = self.jobs[index].pid;
            match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(status) => {
                    if let Some(status) = ExitStatus::from_wait(status) {
                        self.jobs.remove(index);
                        debug!(%pid, %status, "reaped background job");
                        return Some(Completion { pid, status });
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(err) => {
                    warn!(%pid, %err, "dropping background job that cannot be waited for");
                    self.jobs.remove(index);
                    continue;
                }
            }
            index += 1;
        }
        None
    }
}

/// Report every background job that has finished since the last call.
///
/// Each completion becomes the session's last status and is announced on `out`.
pub fn reap(env: &mut Environment, out: &mut dyn Write) -> io::Result<()> {
    while let Some(done) = env.jobs.poll_once() {
        env.last_status = done.status;
        writeln!(out, "background pid {} is done: {}", done.pid, done.status)?;
        out.flush()?;
    }
    Ok(())
}
