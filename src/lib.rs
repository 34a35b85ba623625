//! A small interactive shell with foreground and background job control.
//!
//! This crate reads command lines, runs the built-ins `exit`, `cd` and `status` in-process,
//! and launches everything else as a child process with optional `<`/`>` redirection.
//! A trailing `&` runs the program in the background; finished background jobs are reaped
//! and reported before every prompt.
//!
//! The main entry point is [`Interpreter`], which owns the session state and can be driven
//! either interactively ([`Interpreter::repl`]) or from any line source
//! ([`Interpreter::run_lines`]). The public modules [`command`] and [`env`] expose the
//! exit status type and the session context.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
mod external;
mod interpreter;
mod io_adapters;
pub mod jobs;
pub mod lexer;
pub mod redirect;
pub mod signals;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::{Flow, Interpreter};
pub use io_adapters::MemWriter;
