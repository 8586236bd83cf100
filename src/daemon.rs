//! Detaching from the controlling terminal
//!
//! Must run before any threads exist, which in practice means before the tokio
//! runtime is built.

use std::io;

use crate::error::ForkError;

/// Turns the calling process into a daemon.
///
/// The process forks and the parent exits, the child starts a new session and
/// clears its umask, then forks once more so the survivor is not a session
/// leader and can never reacquire a terminal. The working directory becomes
/// `/` and stdio is pointed at `/dev/null`. Relative paths are meaningless after
/// this returns.
#[cfg(unix)]
pub fn detach() -> Result<(), ForkError> {
    fork_and_exit_parent()?;

    if unsafe { libc::setsid() } < 0 {
        return Err(ForkError(io::Error::last_os_error()));
    }
    unsafe { libc::umask(0) };

    fork_and_exit_parent()?;

    std::env::set_current_dir("/").map_err(ForkError)?;
    redirect_stdio()
}

#[cfg(not(unix))]
pub fn detach() -> Result<(), ForkError> {
    Err(ForkError(io::Error::new(
        io::ErrorKind::Unsupported,
        "daemon mode requires a Unix platform",
    )))
}

#[cfg(unix)]
fn fork_and_exit_parent() -> Result<(), ForkError> {
    match unsafe { libc::fork() } {
        -1 => Err(ForkError(io::Error::last_os_error())),
        0 => Ok(()),
        _ => unsafe { libc::_exit(0) },
    }
}

#[cfg(unix)]
fn redirect_stdio() -> Result<(), ForkError> {
    use std::fs::OpenOptions;
    use std::os::unix::io::AsRawFd;

    let devnull = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(ForkError)?;

    for target in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        if unsafe { libc::dup2(devnull.as_raw_fd(), target) } < 0 {
            return Err(ForkError(io::Error::last_os_error()));
        }
    }
    Ok(())
}
