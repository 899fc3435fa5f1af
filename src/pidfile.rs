//! PID file persistence and liveness probing.
//!
//! The PID file is a plain-text file holding the decimal process id of the
//! currently running supervisor instance. Absence means "not running"; a file
//! naming a dead process is stale and safe to overwrite. No locking is used:
//! correctness relies on signals only ever being sent to a validated pid.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use nix::{errno::Errno, sys::signal, unistd::Pid};

use crate::{
    constants::{PID_FILE_NAME, STATE_DIR},
    error::PidFileError,
};

/// Handle to the supervisor PID file at a configured path.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Creates a handle for the given path. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the user state directory.
    pub fn default_path() -> PathBuf {
        let home = env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));
        home.join(STATE_DIR).join(PID_FILE_NAME)
    }

    /// The configured path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists the decimal process id, overwriting any existing content.
    pub fn write(&self, pid: Pid) -> Result<(), PidFileError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(PidFileError::WriteError)?;
        }
        fs::write(&self.path, format!("{}\n", pid.as_raw()))
            .map_err(PidFileError::WriteError)
    }

    /// Returns the stored process id, or `None` when the file is missing or
    /// its content is unparsable. Never checks whether the process is alive.
    pub fn read(&self) -> Option<Pid> {
        let contents = fs::read_to_string(&self.path).ok()?;
        let raw = contents.trim().parse::<i32>().ok()?;
        if raw <= 0 {
            return None;
        }
        Some(Pid::from_raw(raw))
    }

    /// Removes the file. Idempotent: an already-absent file is not an error.
    pub fn clear(&self) -> Result<(), PidFileError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PidFileError::ClearError(err)),
        }
    }
}

/// Returns whether a process with the given id is alive, using the null
/// signal. `EPERM` means the process exists but belongs to another user, so it
/// still counts as alive.
pub fn process_alive(pid: Pid) -> bool {
    match signal::kill(pid, None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}
