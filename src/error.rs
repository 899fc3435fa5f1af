//! Error handling for keeper.
use thiserror::Error;

use crate::constants::{
    EXIT_FAILURE, EXIT_NO_RUNNING_INSTANCE, EXIT_OPERATION_REJECTED,
    EXIT_SINGLETON_CONFLICT,
};

/// Defines all possible errors that can occur in the supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Another live instance already holds the PID file.
    #[error("Have running instance (PID: {pid}). Nothing to do.")]
    SingletonConflict {
        /// Process id of the conflicting instance.
        pid: i32,
    },

    /// Nothing is running and no force flag was given to `restart`.
    #[error("No instance can be restarted")]
    OperationRejected,

    /// `stop` was invoked but no PID file exists.
    #[error("No running instance")]
    NoRunningInstance,

    /// Error reading or writing the PID file.
    #[error("PID file error: {0}")]
    PidFile(#[from] PidFileError),

    /// Error forking a child worker.
    #[error("Failed to spawn worker '{label}': {source}")]
    Spawn {
        /// The worker label that failed to spawn.
        label: String,
        /// The underlying OS error.
        #[source]
        source: nix::errno::Errno,
    },

    /// A worker command contains a NUL byte and cannot be executed.
    #[error("Worker command contains a NUL byte")]
    InvalidCommand,

    /// Raw OS error from signal or wait plumbing.
    #[error(transparent)]
    Errno(#[from] nix::errno::Errno),

    /// I/O failure outside the PID file (daemonizing, signal setup, manifest read).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error parsing the YAML worker manifest.
    #[error("Invalid YAML format: {0}")]
    ManifestParse(#[from] serde_yaml::Error),
}

impl SupervisorError {
    /// Maps this error to its stable process exit code.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::SingletonConflict { .. } => EXIT_SINGLETON_CONFLICT,
            Self::OperationRejected => EXIT_OPERATION_REJECTED,
            Self::NoRunningInstance => EXIT_NO_RUNNING_INSTANCE,
            _ => EXIT_FAILURE,
        }
    }
}

/// Error type for PID file operations.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// Error writing the PID file.
    #[error("Failed to write PID file: {0}")]
    WriteError(std::io::Error),

    /// Error removing the PID file.
    #[error("Failed to remove PID file: {0}")]
    ClearError(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_and_stable() {
        let conflict = SupervisorError::SingletonConflict { pid: 42 };
        assert_eq!(conflict.exit_code(), 1);
        assert_eq!(SupervisorError::OperationRejected.exit_code(), 2);
        assert_eq!(SupervisorError::NoRunningInstance.exit_code(), 4);
        assert_eq!(SupervisorError::InvalidCommand.exit_code(), 70);
    }

    #[test]
    fn conflict_message_names_the_pid() {
        let err = SupervisorError::SingletonConflict { pid: 1234 };
        assert!(err.to_string().contains("1234"));
    }
}
