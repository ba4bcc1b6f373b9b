use std::ffi::{CStr, CString};
use std::io;
use std::os::fd::RawFd;

use tracing::debug;

use crate::ast::Stage;
use crate::error::{Result, ShellError};
use crate::job_control::ChildProcess;
use crate::pipes::StageWiring;
use crate::redirect::{PreparedRedirect, Slot};

/// Exit status of a child whose program could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit status of a child whose program was found but could not run.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// Which side of a `fork` we are on.
enum Fork {
    Parent(libc::pid_t),
    Child,
}

fn fork() -> io::Result<Fork> {
    match unsafe { libc::fork() } {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(Fork::Child),
        pid => Ok(Fork::Parent(pid)),
    }
}

fn write_raw(fd: RawFd, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        let n = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        if n < 0 {
            if io::Error::last_os_error().raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return;
        }
        bytes = &bytes[n as usize..];
    }
}

/// Print `prefix` + `strerror(errno)` on stderr without allocating.
/// Meant for forked children, where the heap may be locked by another thread.
pub(crate) fn report_in_child(prefix: &[u8], errno: libc::c_int) {
    write_raw(libc::STDERR_FILENO, prefix);
    let reason = unsafe { CStr::from_ptr(libc::strerror(errno)) };
    write_raw(libc::STDERR_FILENO, reason.to_bytes());
    write_raw(libc::STDERR_FILENO, b"\n");
}

/// Duplicate `src` onto `dst`, retrying on `EINTR`.
fn dup_onto(src: RawFd, dst: RawFd) -> io::Result<()> {
    loop {
        if unsafe { libc::dup2(src, dst) } >= 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EINTR) {
            return Err(err);
        }
    }
}

/// Replace `dst` with `src` and close `src`.
///
/// `dst` always ends up inheritable across `execvp`; when `src` already sits
/// in that slot its close-on-exec flag is cleared instead.
pub(crate) fn move_fd(src: RawFd, dst: RawFd) -> io::Result<()> {
    if src == dst {
        let flags = unsafe { libc::fcntl(src, libc::F_GETFD) };
        if flags < 0 || unsafe { libc::fcntl(src, libc::F_SETFD, flags & !libc::FD_CLOEXEC) } < 0 {
            return Err(io::Error::last_os_error());
        }
        return Ok(());
    }
    dup_onto(src, dst)?;
    unsafe { libc::close(src) };
    Ok(())
}

/// A stage converted to C strings ahead of the fork.
///
/// `argv_ptrs` points into `argv` and ends with the null sentinel `execvp`
/// expects; the struct must not outlive or reorder `argv`.
#[derive(Debug)]
pub struct PreparedStage {
    index: usize,
    program: String,
    argv: Vec<CString>,
    argv_ptrs: Vec<*const libc::c_char>,
    input: Option<PreparedRedirect>,
    output: Option<PreparedRedirect>,
    exec_error_prefix: Vec<u8>,
}

impl PreparedStage {
    pub fn new(index: usize, stage: &Stage) -> Result<Self> {
        let program = stage.program().ok_or(ShellError::EmptyStage)?.to_string();
        let argv = stage
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_str()).map_err(|_| ShellError::InteriorNul(arg.clone())))
            .collect::<Result<Vec<_>>>()?;
        let argv_ptrs = argv
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(std::ptr::null()))
            .collect();
        let input = stage
            .input
            .as_deref()
            .map(|path| PreparedRedirect::new(path, Slot::Stdin))
            .transpose()?;
        let output = stage
            .output
            .as_deref()
            .map(|path| PreparedRedirect::new(path, Slot::Stdout))
            .transpose()?;
        let failure = ShellError::ExecFailed { program: program.clone() };

        Ok(Self {
            index,
            exec_error_prefix: format!("pish: {failure}: ").into_bytes(),
            program,
            argv,
            argv_ptrs,
            input,
            output,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Fork one stage.
///
/// In the parent this returns the child's identity. In the child it wires
/// descriptors, applies the stage's redirects, and replaces the process
/// image; it never returns there.
///
/// `close_in_child` lists every pipe descriptor of the pipeline; the child
/// closes them all after duplicating its own ends onto stdin/stdout.
pub fn spawn(
    stage: &PreparedStage,
    wiring: StageWiring,
    close_in_child: &[RawFd],
) -> Result<ChildProcess> {
    let side = fork().map_err(|reason| ShellError::ForkFailed { stage: stage.index, reason })?;
    match side {
        Fork::Parent(pid) => {
            debug!(pid, stage = stage.index, program = %stage.program, "stage started");
            Ok(ChildProcess { pid, stage: stage.index })
        }
        Fork::Child => exec_child(stage, wiring, close_in_child),
    }
}

fn exec_child(stage: &PreparedStage, wiring: StageWiring, close_in_child: &[RawFd]) -> ! {
    unsafe {
        // Ignored dispositions survive exec; the program expects defaults.
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        libc::signal(libc::SIGTSTP, libc::SIG_DFL);
    }

    for (end, slot) in [(wiring.stdin, Slot::Stdin), (wiring.stdout, Slot::Stdout)] {
        if let Some(fd) = end {
            if let Err(e) = dup_onto(fd, slot.fd()) {
                report_in_child(b"pish: cannot attach pipe: ", e.raw_os_error().unwrap_or(0));
            }
        }
    }
    for &fd in close_in_child {
        if fd > libc::STDERR_FILENO {
            unsafe { libc::close(fd) };
        }
    }

    // Explicit redirects win over the pipe ends wired above.
    if let Some(input) = &stage.input {
        input.apply_or_report();
    }
    if let Some(output) = &stage.output {
        output.apply_or_report();
    }

    unsafe { libc::execvp(stage.argv[0].as_ptr(), stage.argv_ptrs.as_ptr()) };

    let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
    report_in_child(&stage.exec_error_prefix, errno);
    let status = if errno == libc::ENOENT {
        EXIT_NOT_FOUND
    } else {
        EXIT_NOT_EXECUTABLE
    };
    unsafe { libc::_exit(status) }
}
