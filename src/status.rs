use std::fmt;

/// How a child process changed state, as reported by `waitpid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(i32),
    Signaled(i32),
    /// Not terminal: a `continue` puts the process back to running.
    Stopped(i32),
    Unknown,
}

impl ExitOutcome {
    /// Classify a raw wait status.
    pub fn from_wait_status(raw_status: libc::c_int) -> Self {
        if unsafe { libc::WIFEXITED(raw_status) } {
            ExitOutcome::Exited(unsafe { libc::WEXITSTATUS(raw_status) })
        } else if unsafe { libc::WIFSIGNALED(raw_status) } {
            ExitOutcome::Signaled(unsafe { libc::WTERMSIG(raw_status) })
        } else if unsafe { libc::WIFSTOPPED(raw_status) } {
            ExitOutcome::Stopped(unsafe { libc::WSTOPSIG(raw_status) })
        } else {
            ExitOutcome::Unknown
        }
    }

    /// Shell-style exit code: signals map to `128 + signal`.
    pub fn code(self) -> i32 {
        match self {
            ExitOutcome::Exited(code) => code,
            ExitOutcome::Signaled(signal) | ExitOutcome::Stopped(signal) => 128 + signal,
            ExitOutcome::Unknown => 1,
        }
    }

    /// Whether the process is gone (and its table entry released by the wait).
    pub fn is_terminal(self) -> bool {
        matches!(self, ExitOutcome::Exited(_) | ExitOutcome::Signaled(_))
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exited with status {code}"),
            ExitOutcome::Signaled(signal) => write!(f, "killed by signal {signal}"),
            ExitOutcome::Stopped(signal) => write!(f, "stopped by signal {signal}"),
            ExitOutcome::Unknown => write!(f, "changed to an unknown state"),
        }
    }
}
