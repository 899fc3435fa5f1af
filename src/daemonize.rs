//! Daemonization primitive: double-fork, detach, redirect standard streams.

use std::{fs::OpenOptions, io, os::unix::io::IntoRawFd};

/// Detaches the current process from the controlling terminal. Everything
/// after this call executes in the detached process; the caller's original
/// process exits.
pub fn daemonize() -> io::Result<()> {
    if unsafe { libc::fork() } > 0 {
        std::process::exit(0);
    }

    unsafe {
        libc::setsid();
    }

    if unsafe { libc::fork() } > 0 {
        std::process::exit(0);
    }

    unsafe {
        libc::setpgid(0, 0);
    }

    std::env::set_current_dir("/")?;
    // Read-write so the fd is valid as stdout/stderr, not just stdin.
    let devnull = OpenOptions::new().read(true).write(true).open("/dev/null")?;
    let fd = devnull.into_raw_fd();
    unsafe {
        let _ = libc::dup2(fd, libc::STDIN_FILENO);
        let _ = libc::dup2(fd, libc::STDOUT_FILENO);
        let _ = libc::dup2(fd, libc::STDERR_FILENO);
        libc::close(fd);
    }

    Ok(())
}
