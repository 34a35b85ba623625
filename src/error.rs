use thiserror::Error;

/// Failures of the process-control layer.
///
/// None of these end the session; the interpreter reports them and goes back to the
/// prompt.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),

    #[error("cannot create status pipe: {0}")]
    Pipe(#[source] nix::Error),

    #[error("waiting for pid {pid} failed: {source}")]
    Wait {
        pid: i32,
        #[source]
        source: nix::Error,
    },

    #[error("cannot install interrupt disposition: {0}")]
    Signal(#[source] nix::Error),

    #[error("argument contains a NUL byte: {0:?}")]
    NulInArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;
