use crate::command::ExitStatus;
use crate::jobs::JobTable;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable state of one shell session.
///
/// The environment contains:
/// - `vars`: a snapshot of the process environment (only `HOME` is consulted).
/// - `current_dir`: the working directory children inherit.
/// - `should_exit`: set by the `exit` built-in; the read loop stops when it is true.
/// - `last_status`: how the most recently completed process ended.
/// - `background_requested`: whether the line being dispatched ended with `&`.
/// - `jobs`: background children that have not been reported yet.
///
/// `last_status` is written in exactly two places: the launcher after a foreground wait
/// and the job tracker when it reaps a background child.
#[derive(Debug)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub should_exit: bool,
    pub last_status: ExitStatus,
    pub background_requested: bool,
    pub jobs: JobTable,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
            last_status: ExitStatus::default(),
            background_requested: false,
            jobs: JobTable::default(),
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override a variable in `self.vars`. The process environment is untouched.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
