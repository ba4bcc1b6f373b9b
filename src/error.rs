use std::io;

use thiserror::Error;

/// Everything the interpreter can report for a single input line.
///
/// None of these end the session; the caller prints the error and reads the
/// next line.
#[derive(Debug, Error)]
pub enum ShellError {
    /// A pipeline stage has no words (leading `|`, `||`, trailing `|`).
    #[error("syntax error: empty command in pipeline")]
    EmptyStage,

    #[error("syntax error: expected filename after '{0}'")]
    MissingRedirectTarget(char),

    /// Rendered before fork; the child appends `strerror(errno)`.
    #[error("{path}")]
    RedirectOpenFailed { path: String },

    #[error("cannot fork stage {stage}: {reason}")]
    ForkFailed { stage: usize, reason: io::Error },

    /// Rendered before fork; the child appends `strerror(errno)`.
    #[error("{program}")]
    ExecFailed { program: String },

    #[error("cannot signal process {pid}: {reason}")]
    SignalFailed { pid: i32, reason: io::Error },

    #[error("no processes left")]
    NoChildren,

    #[error("invalid numeric PID: {0}")]
    InvalidPid(String),

    #[error("wait for process {pid} failed: {reason}")]
    WaitFailed { pid: i32, reason: io::Error },

    #[error("argument contains a NUL byte: {0:?}")]
    InteriorNul(String),

    #[error("input line longer than {limit} bytes discarded")]
    LineTooLong { limit: usize },

    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ShellError {
    /// Parse-time errors abort the whole line before anything is spawned.
    pub fn is_syntax(&self) -> bool {
        matches!(self, ShellError::EmptyStage | ShellError::MissingRedirectTarget(_))
    }
}

pub type Result<T, E = ShellError> = std::result::Result<T, E>;
