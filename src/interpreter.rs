use crate::command::{CommandFactory, ExecutableCommand, ExitStatus};
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::external::ExternalCommand;
use crate::jobs::{self, ExecMode};
use crate::lexer::{self, CommandLine};
use crate::redirect;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, IsTerminal, Write};
use tracing::debug;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only the builtins defined in this crate are created this way.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// What the read loop should do after a line has been dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Show the next prompt.
    Continue,
    /// `exit` was run; stop without prompting again.
    Exit,
}

/// An interactive shell session.
///
/// The interpreter owns the session [`Environment`] and a list of [`CommandFactory`]
/// objects that are queried for built-ins. Any first word no factory accepts is launched
/// as an external program. See [`Default`] for the built-ins included out of the box.
///
/// Example
/// ```
/// use smallsh::{Flow, Interpreter};
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// assert_eq!(sh.dispatch("true", &mut out).unwrap(), Flow::Continue);
/// assert_eq!(sh.dispatch("exit", &mut out).unwrap(), Flow::Exit);
/// ```
pub struct Interpreter {
    env: Environment,
    config: ShellConfig,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of built-in factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            config: ShellConfig::default(),
            commands,
        }
    }

    /// Create an interpreter with the default built-ins and the given settings.
    pub fn with_config(config: ShellConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn last_status(&self) -> ExitStatus {
        self.env.last_status
    }

    /// Run one input line to completion.
    ///
    /// Blank lines, comments and lines that reduce to nothing are no-ops. Built-ins run
    /// in-process. Anything else is resolved for redirections and launched; a foreground
    /// program is waited for before this returns.
    pub fn dispatch(&mut self, line: &str, out: &mut dyn Write) -> anyhow::Result<Flow> {
        let Some(line) = lexer::split_into_tokens(line) else {
            return Ok(Flow::Continue);
        };
        self.env.background_requested = line.background;

        let Some(name) = line.name() else {
            return Ok(Flow::Continue);
        };
        if name.starts_with('#') {
            return Ok(Flow::Continue);
        }

        let args: Vec<&str> = line.words[1..].iter().map(String::as_str).collect();
        if let Some(builtin) = self.find_builtin(name, &args) {
            debug!(builtin = name, ?args, "running builtin");
            builtin.execute(out, &mut self.env)?;
        } else {
            self.launch(&line, out)?;
        }

        Ok(if self.env.should_exit {
            Flow::Exit
        } else {
            Flow::Continue
        })
    }

    fn find_builtin(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        self.commands
            .iter()
            .find_map(|factory| factory.try_create(&self.env, name, args))
    }

    fn launch(&mut self, line: &CommandLine, out: &mut dyn Write) -> anyhow::Result<()> {
        jobs::reap(&mut self.env, out)?;

        let redirections = redirect::resolve(&line.words);
        for err in &redirections.errors {
            writeln!(out, "{}", err)?;
        }
        out.flush()?;
        if redirections.argv.is_empty() {
            if redirections.failed() {
                self.env.last_status = ExitStatus::Exited(1);
            }
            return Ok(());
        }

        let mode = ExecMode::from_background(line.background);
        debug!(argv = ?redirections.argv, ?mode, "launching");
        ExternalCommand::new(redirections, mode, &self.config)?.spawn(&mut self.env, out)?;
        Ok(())
    }

    /// Dispatch a line, reporting failures instead of ending the session.
    fn cycle(&mut self, line: &str, out: &mut dyn Write) -> io::Result<Flow> {
        match self.dispatch(line, out) {
            Ok(flow) => Ok(flow),
            Err(err) => {
                writeln!(out, "smallsh: {:#}", err)?;
                out.flush()?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Prompt, read and dispatch lines from `input` until `exit` or end of input.
    ///
    /// Finished background jobs are reported before every prompt.
    pub fn run_lines<R: BufRead>(
        &mut self,
        input: R,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let mut lines = input.lines();
        loop {
            jobs::reap(&mut self.env, out)?;
            write!(out, "{}", self.config.prompt)?;
            out.flush()?;

            let Some(line) = lines.next() else {
                break;
            };
            if self.cycle(&line?, out)? == Flow::Exit {
                break;
            }
        }
        Ok(())
    }

    /// Interactive Read-Eval-Print Loop on the process's standard streams.
    ///
    /// A terminal gets the `rustyline` editor; anything else is read line by line.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let mut stdout = io::stdout();
        if !io::stdin().is_terminal() {
            return self.run_lines(io::stdin().lock(), &mut stdout);
        }

        let mut rl = DefaultEditor::new()?;
        loop {
            jobs::reap(&mut self.env, &mut stdout)?;
            match rl.readline(&self.config.prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    if self.cycle(&line, &mut stdout)? == Flow::Exit {
                        break;
                    }
                }
                // the shell ignores interrupts; drop the half-typed line
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `exit`, `cd`, `status`
    /// - everything else is launched as an external program
    fn default() -> Self {
        use crate::builtin::*;
        Self::new(vec![
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Status>::default()),
        ])
    }
}
