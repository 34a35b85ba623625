//! Resolving `<` and `>` operators into open files.

use nix::unistd::{AccessFlags, access};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const INPUT_OPERATOR: &str = "<";
pub const OUTPUT_OPERATOR: &str = ">";

/// Permissions for files created by `>`.
const OUTPUT_MODE: u32 = 0o644;

/// Which standard stream a redirection binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    fn operator(self) -> &'static str {
        match self {
            Direction::Input => INPUT_OPERATOR,
            Direction::Output => OUTPUT_OPERATOR,
        }
    }
}

/// A redirection that could not be set up. The command it belongs to must not run.
#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("cannot open {path} for input")]
    Input {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot open {path} for output")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("missing file name after {}", .0.operator())]
    MissingTarget(Direction),
}

/// Result of scanning one command line for redirections.
#[derive(Debug, Default)]
pub struct Redirections {
    /// Argument vector with every operator and file name removed.
    pub argv: Vec<String>,
    /// File to become the child's standard input.
    pub input: Option<File>,
    /// File to become the child's standard output.
    pub output: Option<File>,
    /// Every redirection that failed, in the order encountered.
    pub errors: Vec<RedirectError>,
}

impl Redirections {
    /// True when any redirection failed and the program must not be executed.
    pub fn failed(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Scan `words` left to right, opening redirection targets.
///
/// Failures do not stop the scan, so every operator and its file name are consumed
/// regardless. A later redirection of the same direction replaces (and closes) an
/// earlier one.
pub fn resolve(words: &[String]) -> Redirections {
    let mut result = Redirections::default();
    let mut iter = words.iter();

    while let Some(word) = iter.next() {
        let direction = match word.as_str() {
            INPUT_OPERATOR => Direction::Input,
            OUTPUT_OPERATOR => Direction::Output,
            _ => {
                result.argv.push(word.clone());
                continue;
            }
        };

        let Some(path) = iter.next() else {
            result.errors.push(RedirectError::MissingTarget(direction));
            break;
        };

        match direction {
            Direction::Input => match open_input(path) {
                Ok(file) => result.input = Some(file),
                Err(source) => result.errors.push(RedirectError::Input {
                    path: path.clone(),
                    source,
                }),
            },
            Direction::Output => match open_output(path) {
                Ok(file) => result.output = Some(file),
                Err(source) => result.errors.push(RedirectError::Output {
                    path: path.clone(),
                    source,
                }),
            },
        }
    }

    debug!(
        argv = ?result.argv,
        input = result.input.is_some(),
        output = result.output.is_some(),
        errors = result.errors.len(),
        "resolved redirections"
    );
    result
}

fn open_input(path: &str) -> std::io::Result<File> {
    access(Path::new(path), AccessFlags::R_OK).map_err(std::io::Error::from)?;
    File::open(path)
}

fn open_output(path: &str) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(OUTPUT_MODE)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_owned).collect()
    }

    #[test]
    fn test_output_redirection_is_removed_from_argv() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let line = format!("ls -l > {}", out.display());

        let mut r = resolve(&words(&line));

        assert_eq!(r.argv, ["ls", "-l"]);
        assert!(!r.failed());
        assert!(r.input.is_none());
        r.output.as_mut().unwrap().write_all(b"data").unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "data");
    }

    #[test]
    fn test_output_redirection_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        std::fs::write(&out, "old contents").unwrap();

        let r = resolve(&words(&format!("true > {}", out.display())));

        assert!(!r.failed());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "");
    }

    #[test]
    fn test_input_redirection_opens_for_reading() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        std::fs::write(&input, "hello").unwrap();

        let mut r = resolve(&words(&format!("wc -c < {}", input.display())));

        assert_eq!(r.argv, ["wc", "-c"]);
        let mut buf = String::new();
        r.input.as_mut().unwrap().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hello");
    }

    #[test]
    fn test_missing_input_is_reported_and_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing_file.txt");

        let r = resolve(&words(&format!("cat < {} -n", missing.display())));

        assert!(r.failed());
        assert_eq!(r.argv, ["cat", "-n"]);
        assert!(r.input.is_none());
        assert_eq!(
            r.errors[0].to_string(),
            format!("cannot open {} for input", missing.display())
        );
    }

    #[test]
    fn test_unwritable_output_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("no_such_dir").join("out.txt");

        let r = resolve(&words(&format!("ls > {}", bad.display())));

        assert!(r.failed());
        assert!(matches!(r.errors[0], RedirectError::Output { .. }));
        assert_eq!(r.argv, ["ls"]);
    }

    #[test]
    fn test_both_directions_and_last_one_wins() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        std::fs::write(&input, "x").unwrap();
        let line = format!(
            "sort < {} > {} > {}",
            input.display(),
            first.display(),
            second.display()
        );

        let mut r = resolve(&words(&line));

        assert_eq!(r.argv, ["sort"]);
        assert!(r.input.is_some());
        r.output.as_mut().unwrap().write_all(b"y").unwrap();
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "");
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "y");
    }

    #[test]
    fn test_operator_without_target() {
        let r = resolve(&words("cat <"));
        assert!(r.failed());
        assert_eq!(r.argv, ["cat"]);
        assert_eq!(r.errors[0].to_string(), "missing file name after <");
    }

    #[test]
    fn test_failure_keeps_scanning() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let out = dir.path().join("out.txt");

        let r = resolve(&words(&format!(
            "cat < {} > {}",
            missing.display(),
            out.display()
        )));

        assert_eq!(r.errors.len(), 1);
        assert!(r.output.is_some());
        assert!(out.exists());
    }
}
