//! The abstract unit of executable work.

use std::{ffi::CString, fmt};

use crate::error::SupervisorError;

/// A unit of executable work with a single required capability.
///
/// The supervisor runs itself through this trait; child workers run inside a
/// freshly forked OS process. The core never inspects what `run` does.
pub trait Process {
    /// Executes the work. For child workers the returned error only decides
    /// the child's exit status; the parent never sees it.
    fn run(&mut self) -> Result<(), SupervisorError>;
}

/// Specification for one supervised child: identity, the work to run, and the
/// supervision policy applied when it exits.
pub struct ChildSpec {
    label: String,
    process: Box<dyn Process>,
    respawn: bool,
}

impl ChildSpec {
    /// Creates a spec that respawns the child on unexpected exit.
    pub fn new(label: impl Into<String>, process: impl Process + 'static) -> Self {
        Self {
            label: label.into(),
            process: Box::new(process),
            respawn: true,
        }
    }

    /// Overrides the respawn-on-unexpected-exit policy.
    pub fn respawn(mut self, respawn: bool) -> Self {
        self.respawn = respawn;
        self
    }

    /// Identity label used in logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn process_mut(&mut self) -> &mut dyn Process {
        self.process.as_mut()
    }

    pub(crate) fn should_respawn(&self) -> bool {
        self.respawn
    }
}

impl fmt::Debug for ChildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSpec")
            .field("label", &self.label)
            .field("respawn", &self.respawn)
            .finish_non_exhaustive()
    }
}

/// Worker that replaces the forked child with a shell command.
///
/// This is the concrete worker the `keeperd` binary supervises; the exec also
/// restores default signal dispositions in the child.
#[derive(Debug, Clone)]
pub struct CommandWorker {
    command: String,
}

impl CommandWorker {
    /// Wraps a shell command line.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Process for CommandWorker {
    fn run(&mut self) -> Result<(), SupervisorError> {
        let argv = [
            CString::new("sh").map_err(|_| SupervisorError::InvalidCommand)?,
            CString::new("-c").map_err(|_| SupervisorError::InvalidCommand)?,
            CString::new(self.command.as_str())
                .map_err(|_| SupervisorError::InvalidCommand)?,
        ];
        nix::unistd::execvp(&argv[0], &argv)?;
        Ok(())
    }
}
