use std::ffi::CString;
use std::io;
use std::os::fd::RawFd;

use crate::error::{Result, ShellError};
use crate::spawn::report_in_child;

/// Which standard descriptor a redirect replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Stdin,
    Stdout,
}

impl Slot {
    pub fn fd(self) -> RawFd {
        match self {
            Slot::Stdin => libc::STDIN_FILENO,
            Slot::Stdout => libc::STDOUT_FILENO,
        }
    }

    fn open_flags(self) -> libc::c_int {
        match self {
            Slot::Stdin => libc::O_RDONLY | libc::O_CLOEXEC,
            Slot::Stdout => libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC | libc::O_CLOEXEC,
        }
    }
}

/// A file redirect converted into what a forked child needs, so applying it
/// does not allocate.
#[derive(Debug)]
pub struct PreparedRedirect {
    path: CString,
    slot: Slot,
    error_prefix: Vec<u8>,
}

impl PreparedRedirect {
    pub fn new(path: &str, slot: Slot) -> Result<Self> {
        let c_path =
            CString::new(path).map_err(|_| ShellError::InteriorNul(path.to_string()))?;
        let failure = ShellError::RedirectOpenFailed { path: path.to_string() };
        Ok(Self {
            path: c_path,
            slot,
            error_prefix: format!("pish: {failure}: ").into_bytes(),
        })
    }

    /// Open the target with the mode its slot calls for (`0666` before umask
    /// when creating).
    pub fn open(&self) -> io::Result<RawFd> {
        loop {
            let fd = unsafe {
                libc::open(self.path.as_ptr(), self.slot.open_flags(), 0o666 as libc::c_uint)
            };
            if fd >= 0 {
                return Ok(fd);
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EINTR) {
                return Err(err);
            }
        }
    }

    /// Open the target and move it onto the slot. Call only in a forked child.
    ///
    /// On failure the slot keeps whatever it was wired to before.
    pub fn apply(&self) -> io::Result<()> {
        let fd = self.open()?;
        let result = crate::spawn::move_fd(fd, self.slot.fd());
        if result.is_err() {
            unsafe { libc::close(fd) };
        }
        result
    }

    /// `apply`, reporting a failure on stderr and carrying on.
    pub fn apply_or_report(&self) {
        if let Err(e) = self.apply() {
            report_in_child(&self.error_prefix, e.raw_os_error().unwrap_or(0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pish_redirect_{}_{name}", std::process::id()))
    }

    #[test]
    fn stdout_target_is_created_and_truncated() {
        let path = temp_path("truncate");
        std::fs::write(&path, "a much longer previous content").unwrap();

        let redirect = PreparedRedirect::new(path.to_str().unwrap(), Slot::Stdout).unwrap();
        let fd = redirect.open().unwrap();
        let written = unsafe { libc::write(fd, b"new".as_ptr().cast(), 3) };
        unsafe { libc::close(fd) };

        assert_eq!(written, 3);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn stdout_target_is_created_when_missing() {
        let path = temp_path("create");
        let _ = std::fs::remove_file(&path);

        let redirect = PreparedRedirect::new(path.to_str().unwrap(), Slot::Stdout).unwrap();
        let fd = redirect.open().unwrap();
        unsafe { libc::close(fd) };

        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_stdin_target_fails_with_os_reason() {
        let path = temp_path("does_not_exist");
        let redirect = PreparedRedirect::new(path.to_str().unwrap(), Slot::Stdin).unwrap();
        let err = redirect.open().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn error_prefix_names_the_path() {
        let redirect = PreparedRedirect::new("in.txt", Slot::Stdin).unwrap();
        assert_eq!(redirect.error_prefix, b"pish: in.txt: ");
        assert_eq!(redirect.slot.fd(), libc::STDIN_FILENO);
    }

    #[test]
    fn nul_in_path_is_rejected() {
        let err = PreparedRedirect::new("bad\0path", Slot::Stdout).unwrap_err();
        assert!(matches!(err, ShellError::InteriorNul(_)));
    }
}
