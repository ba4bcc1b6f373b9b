use std::io;

use tracing::{debug, warn};

use crate::error::{Result, ShellError};
use crate::status::ExitOutcome;

/// A forked child and the pipeline stage it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildProcess {
    pub pid: libc::pid_t,
    pub stage: usize,
}

/// Job-control requests that can be sent to any PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Terminate,
    Suspend,
    Resume,
}

impl SignalKind {
    fn raw(self) -> libc::c_int {
        match self {
            SignalKind::Terminate => libc::SIGKILL,
            SignalKind::Suspend => libc::SIGSTOP,
            SignalKind::Resume => libc::SIGCONT,
        }
    }

    /// Past-tense verb used in the confirmation line.
    pub fn verb(self) -> &'static str {
        match self {
            SignalKind::Terminate => "killed",
            SignalKind::Suspend => "stopped",
            SignalKind::Resume => "continued",
        }
    }
}

/// Parse a PID argument. Only positive decimal numbers are accepted, so
/// process groups (`-pgid`) and "every process" (`-1`) cannot be addressed.
pub fn parse_pid(arg: &str) -> Result<libc::pid_t> {
    match arg.parse::<libc::pid_t>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(ShellError::InvalidPid(arg.to_string())),
    }
}

/// Send a job-control signal. Never blocks and never reaps.
pub fn signal(pid: libc::pid_t, kind: SignalKind) -> Result<()> {
    let rc = unsafe { libc::kill(pid, kind.raw()) };
    if rc < 0 {
        let reason = io::Error::last_os_error();
        return Err(ShellError::SignalFailed { pid, reason });
    }
    debug!(pid, ?kind, "signal delivered");
    Ok(())
}

/// Block until `pid` exits, is killed, or stops.
pub fn wait_for(pid: libc::pid_t) -> Result<ExitOutcome> {
    let mut raw_status: libc::c_int = 0;

    loop {
        let rc = unsafe { libc::waitpid(pid, &mut raw_status, libc::WUNTRACED) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(ShellError::WaitFailed { pid, reason: err });
        }

        let outcome = ExitOutcome::from_wait_status(raw_status);
        debug!(pid, %outcome, "wait returned");
        return Ok(outcome);
    }
}

/// Block until any child changes state.
///
/// `NoChildren` is the normal answer once everything has been reaped.
pub fn wait_any() -> Result<(libc::pid_t, ExitOutcome)> {
    let mut raw_status: libc::c_int = 0;

    loop {
        let pid = unsafe { libc::waitpid(-1, &mut raw_status, libc::WUNTRACED) };
        if pid < 0 {
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(code) if code == libc::EINTR => continue,
                Some(code) if code == libc::ECHILD => return Err(ShellError::NoChildren),
                _ => return Err(ShellError::WaitFailed { pid: -1, reason: err }),
            }
        }

        let outcome = ExitOutcome::from_wait_status(raw_status);
        debug!(pid, %outcome, "wait returned");
        return Ok((pid, outcome));
    }
}

/// Children spawned for one pipeline that still have to be waited on.
///
/// Dropping the set waits on whatever was not drained, so a launch failure
/// partway through a pipeline cannot leave zombies behind.
#[derive(Debug, Default)]
pub struct SpawnedSet {
    children: Vec<ChildProcess>,
}

impl SpawnedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, child: ChildProcess) {
        self.children.push(child);
    }

    /// Wait on every child in spawn order.
    pub fn wait_all(mut self) -> Vec<(ChildProcess, Result<ExitOutcome>)> {
        std::mem::take(&mut self.children)
            .into_iter()
            .map(|child| (child, wait_for(child.pid)))
            .collect()
    }

    /// Hand the children over to a later `wait` without waiting now.
    pub fn detach(mut self) -> Vec<ChildProcess> {
        std::mem::take(&mut self.children)
    }
}

impl Drop for SpawnedSet {
    fn drop(&mut self) {
        for child in self.children.drain(..) {
            if let Err(e) = wait_for(child.pid) {
                warn!(pid = child.pid, "could not reap child: {e}");
            }
        }
    }
}
