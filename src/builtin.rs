use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process. They never touch the session's last
/// exit status.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "status" or "cd".
    fn name() -> &'static str;

    /// Executes the command.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match <T as BuiltinCommand>::execute(*self, stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                debug!(builtin = T::name(), error = %e, "builtin failed");
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.output.trim_end())?;
        stdout.flush()?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted. Further words are ignored.
    pub args: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    /// Failures are not shown to the user; the directory simply stays the same.
    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = match self.args.first() {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => match env.get_var("HOME") {
                Some(home) => PathBuf::from(home),
                None => return Err(anyhow::anyhow!("cd: no target and HOME not set")),
            },
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: can't canonicalize {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;
        debug!(dir = %canonical.display(), "changed directory");
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Leave the shell. Background jobs are left running.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print how the last foreground or reaped background process ended.
pub struct Status {
    #[argh(positional, greedy)]
    /// ignored
    pub _args: Vec<String>,
}

impl BuiltinCommand for Status {
    fn name() -> &'static str {
        "status"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.last_status)?;
        stdout.flush()?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ExitStatus;
    use std::sync::Mutex;

    /// `cd` changes the process-wide directory; serialize the tests that do it.
    static CWD_LOCK: Mutex<()> = Mutex::new(());

    fn run<T: BuiltinCommand + 'static>(
        args: &[&str],
        env: &mut Environment,
    ) -> (ExitCode, String) {
        let cmd = Factory::<T>::default()
            .try_create(env, T::name(), args)
            .expect("factory must accept its own name");
        let mut out = Vec::new();
        let code = cmd.execute(&mut out, env).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_factory_ignores_other_names() {
        let env = Environment::new();
        assert!(Factory::<Cd>::default().try_create(&env, "ls", &[]).is_none());
        assert!(Factory::<Status>::default().try_create(&env, "statu", &[]).is_none());
    }

    #[test]
    fn test_exit_sets_flag() {
        let mut env = Environment::new();
        let (code, out) = run::<Exit>(&[], &mut env);
        assert_eq!(code, 0);
        assert!(out.is_empty());
        assert!(env.should_exit);
    }

    #[test]
    fn test_status_reports_without_changing() {
        let mut env = Environment::new();
        let (_, out) = run::<Status>(&[], &mut env);
        assert_eq!(out, "exit value 0\n");

        env.last_status = ExitStatus::Signaled(2);
        let (code, out) = run::<Status>(&[], &mut env);
        assert_eq!(code, 0);
        assert_eq!(out, "terminated by signal 2\n");
        assert_eq!(env.last_status, ExitStatus::Signaled(2));
    }

    #[test]
    fn test_status_ignores_extra_arguments() {
        let mut env = Environment::new();
        env.last_status = ExitStatus::Exited(3);
        let (code, out) = run::<Status>(&["extra", "words"], &mut env);
        assert_eq!(code, 0);
        assert_eq!(out, "exit value 3\n");
    }

    #[test]
    fn test_help_prints_usage() {
        let mut env = Environment::new();
        let (code, out) = run::<Status>(&["--help"], &mut env);
        assert_eq!(code, 0);
        assert!(out.starts_with("Usage: status"), "{:?}", out);
    }

    #[test]
    fn test_cd_uses_first_argument_only() {
        let _guard = CWD_LOCK.lock().unwrap();
        let before = env::current_dir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let mut env = Environment::new();

        let path = target.path().to_string_lossy().into_owned();
        let (code, out) = run::<Cd>(&[path.as_str(), "/nonexistent/ignored"], &mut env);

        let now = env::current_dir().unwrap();
        env::set_current_dir(&before).unwrap();
        assert_eq!(code, 0);
        assert!(out.is_empty());
        assert_eq!(now, fs::canonicalize(target.path()).unwrap());
    }

    #[test]
    fn test_cd_without_argument_goes_home() {
        let _guard = CWD_LOCK.lock().unwrap();
        let before = env::current_dir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let mut env = Environment::new();
        env.set_var("HOME", home.path().to_string_lossy());

        let (code, _) = run::<Cd>(&[], &mut env);

        let expected = fs::canonicalize(home.path()).unwrap();
        let now = env::current_dir().unwrap();
        env::set_current_dir(&before).unwrap();
        assert_eq!(code, 0);
        assert_eq!(now, expected);
        assert_eq!(env.current_dir, expected);
    }

    #[test]
    fn test_cd_to_missing_directory_is_silent() {
        let _guard = CWD_LOCK.lock().unwrap();
        let before = env::current_dir().unwrap();
        let mut env = Environment::new();

        let (code, out) = run::<Cd>(&["/nonexistent/definitely/not/here"], &mut env);

        assert_eq!(code, 1);
        assert!(out.is_empty());
        assert_eq!(env::current_dir().unwrap(), before);
    }
}
