//! Child process registry: spawning, reaping, and fan-out control.
//!
//! The controller exclusively owns its registry. Children are separate OS
//! processes referenced by pid only; the OS owns their memory and resources.

use std::collections::HashMap;

use nix::{
    errno::Errno,
    sys::{
        signal::{self, Signal},
        wait::{WaitPidFlag, WaitStatus, waitpid},
    },
    unistd::{ForkResult, Pid, fork},
};
use tracing::{debug, error, info, warn};

use crate::{error::SupervisorError, process::ChildSpec};

/// Callback fired once, after `terminate` empties the registry.
type TerminatedCallback = Box<dyn FnOnce()>;

/// Owns the registry of child specifications, spawns and monitors them, reaps
/// exited children, and fans out reload/reopen operations.
pub struct ProcessController {
    specs: Vec<ChildSpec>,
    /// Live children: pid to index into `specs`. Every spawned child has
    /// exactly one entry until it is reaped.
    children: HashMap<Pid, usize>,
    /// Suppresses respawn while `terminate`/`reopen` tear children down.
    tearing_down: bool,
    terminated: Vec<TerminatedCallback>,
}

impl ProcessController {
    /// Creates an empty controller.
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            children: HashMap::new(),
            tearing_down: false,
            terminated: Vec::new(),
        }
    }

    /// Adds a child specification to the registry. Safe to call multiple
    /// times before `bootstrap`; has no effect on already-spawned children.
    pub fn register_process(&mut self, spec: ChildSpec) {
        debug!("Registered worker '{}'", spec.label());
        self.specs.push(spec);
    }

    /// Registers a callback invoked exactly once after `terminate` has
    /// emptied the registry.
    pub fn terminated(&mut self, callback: impl FnOnce() + 'static) {
        self.terminated.push(Box::new(callback));
    }

    /// Spawns every registered, not-yet-spawned child as a separate OS
    /// process, recording its pid.
    pub fn bootstrap(&mut self) -> Result<(), SupervisorError> {
        for index in 0..self.specs.len() {
            if !self.children.values().any(|&spawned| spawned == index) {
                self.spawn(index)?;
            }
        }
        Ok(())
    }

    /// Number of live children currently tracked.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Pids of all live children.
    pub fn child_pids(&self) -> Vec<Pid> {
        self.children.keys().copied().collect()
    }

    /// Reaps every tracked child that has exited, removing its registry entry
    /// and spawning a replacement from the same spec unless the controller is
    /// tearing down or the spec opted out of respawning.
    pub fn reap(&mut self) -> Result<(), SupervisorError> {
        let mut exited = Vec::new();
        for (&pid, &index) in &self.children {
            match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => {}
                Ok(WaitStatus::Exited(_, code)) => {
                    debug!(
                        "Worker '{}' (pid {pid}) exited with code {code}",
                        self.specs[index].label()
                    );
                    exited.push((pid, index));
                }
                Ok(WaitStatus::Signaled(_, sig, _)) => {
                    debug!(
                        "Worker '{}' (pid {pid}) was terminated by {sig}",
                        self.specs[index].label()
                    );
                    exited.push((pid, index));
                }
                Ok(_) => {}
                Err(Errno::ECHILD) => {
                    // Already reaped elsewhere; drop the entry.
                    exited.push((pid, index));
                }
                Err(err) => return Err(err.into()),
            }
        }

        for (pid, index) in exited {
            self.children.remove(&pid);
            if !self.tearing_down && self.specs[index].should_respawn() {
                warn!(
                    "Worker '{}' exited unexpectedly; respawning",
                    self.specs[index].label()
                );
                self.spawn(index)?;
            }
        }
        Ok(())
    }

    /// Sends a graceful-stop signal to every live child, waits for all of
    /// them to exit with respawn suppressed, then fires every registered
    /// `terminated` callback once the registry is empty.
    pub fn terminate(&mut self) -> Result<(), SupervisorError> {
        info!("Terminating {} worker(s)", self.children.len());
        self.tearing_down = true;
        self.shutdown_children();
        for callback in std::mem::take(&mut self.terminated) {
            callback();
        }
        Ok(())
    }

    /// Terminates every child and spawns fresh replacements from the same
    /// specs. New process identities, same work.
    pub fn reopen(&mut self) -> Result<(), SupervisorError> {
        info!("Reopening workers");
        self.tearing_down = true;
        self.shutdown_children();
        self.tearing_down = false;
        self.bootstrap()
    }

    /// Sends a reload signal to every live child in place; identities remain
    /// unchanged. Workers that cannot reload in place may exit instead, in
    /// which case the respawn policy takes over.
    pub fn reload(&mut self) -> Result<(), SupervisorError> {
        info!("Reloading {} worker(s) in place", self.children.len());
        for &pid in self.children.keys() {
            if let Err(err) = signal::kill(pid, Signal::SIGUSR1) {
                if err != Errno::ESRCH {
                    warn!("Failed to send reload signal to pid {pid}: {err}");
                }
            }
        }
        Ok(())
    }

    /// Forks one child from the spec at `index` and records its pid.
    fn spawn(&mut self, index: usize) -> Result<(), SupervisorError> {
        let label = self.specs[index].label().to_string();

        // SAFETY: the child branch resets signal dispositions, runs the
        // worker, and exits without returning to the supervisor's state.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                reset_signal_dispositions();
                let code = match self.specs[index].process_mut().run() {
                    Ok(()) => 0,
                    Err(err) => {
                        error!("Worker '{label}' failed: {err}");
                        1
                    }
                };
                std::process::exit(code);
            }
            Ok(ForkResult::Parent { child }) => {
                info!("Spawned worker '{label}' (pid {child})");
                self.children.insert(child, index);
                Ok(())
            }
            Err(source) => Err(SupervisorError::Spawn { label, source }),
        }
    }

    /// Signals all live children with SIGTERM and blocks until each has been
    /// reaped. Entries are removed as children exit.
    fn shutdown_children(&mut self) {
        for &pid in self.children.keys() {
            if let Err(err) = signal::kill(pid, Signal::SIGTERM) {
                if err != Errno::ESRCH {
                    warn!("Failed to signal pid {pid}: {err}");
                }
            }
        }

        let pids: Vec<Pid> = self.children.keys().copied().collect();
        for pid in pids {
            wait_for_exit(pid);
            self.children.remove(&pid);
        }
    }
}

impl Default for ProcessController {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocks until the given child has exited and been reaped.
fn wait_for_exit(pid: Pid) {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => return,
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            // ECHILD: already reaped elsewhere.
            Err(_) => return,
        }
    }
}

/// The forked child inherits the supervisor's signal registrations; restore
/// default dispositions before handing control to the worker.
fn reset_signal_dispositions() {
    for sig in [
        libc::SIGTERM,
        libc::SIGINT,
        libc::SIGUSR1,
        libc::SIGUSR2,
        libc::SIGCHLD,
    ] {
        unsafe {
            libc::signal(sig, libc::SIG_DFL);
        }
    }
}
