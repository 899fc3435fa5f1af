//! Top-level supervisor: singleton enforcement, the startup sequence, and the
//! signal dispatch loop.
//!
//! One supervisor instance exists per OS process. All signal handling happens
//! on the calling thread through a blocking signal iterator: at most one
//! handler runs at a time, and a signal arriving mid-handler is queued until
//! the current dispatch returns. Relative ordering between different signal
//! kinds arriving close together follows OS delivery order.

use std::{io, mem, thread, time::Instant};

use nix::{
    errno::Errno,
    sys::signal::{self, Signal as NixSignal},
    unistd::{self, Pid},
};
use signal_hook::{
    consts::signal::{SIGCHLD, SIGINT, SIGTERM, SIGUSR1, SIGUSR2},
    iterator::Signals,
};
use tracing::{debug, info, warn};

use crate::{
    constants::{INSTANCE_SHUTDOWN_TIMEOUT, SHUTDOWN_POLL_INTERVAL},
    controller::ProcessController,
    daemonize::daemonize,
    error::SupervisorError,
    pidfile::{PidFile, process_alive},
    process::{ChildSpec, Process},
};

/// Hook run during the prepare or terminate phase. Hooks run in registration
/// order; a failing hook aborts the remaining hooks in its batch.
pub type LifecycleHook = Box<dyn FnOnce(&mut Supervisor) -> Result<(), SupervisorError>>;

/// Owns a daemon's lifecycle: enforces that only one instance runs per
/// PID-file path, registers and monitors child workers, and reacts to OS
/// signals to terminate, reload, reopen, restart, or stop the tree.
pub struct Supervisor {
    pid_file: PidFile,
    daemonize: bool,
    running: bool,
    /// Created lazily on first child registration; `None` means no children
    /// were ever registered.
    controller: Option<ProcessController>,
    prepared: Vec<LifecycleHook>,
    terminating: Vec<LifecycleHook>,
    on_preparing: Option<LifecycleHook>,
    /// Present between signal installation and the event loop taking over, so
    /// child registration during the prepare phase can add SIGCHLD lazily.
    signals: Option<Signals>,
}

impl Supervisor {
    /// Creates a supervisor bound to the given PID file.
    pub fn new(pid_file: PidFile) -> Self {
        Self {
            pid_file,
            daemonize: false,
            running: false,
            controller: None,
            prepared: Vec::new(),
            terminating: Vec::new(),
            on_preparing: None,
            signals: None,
        }
    }

    /// Whether startup should detach from the terminal first.
    pub fn set_daemon(&mut self, daemonize: bool) {
        self.daemonize = daemonize;
    }

    /// Sets the prepare hook, typically where children are registered. Runs
    /// once, after signal bindings are installed and before the `prepared`
    /// queue drains.
    pub fn on_preparing(
        &mut self,
        hook: impl FnOnce(&mut Supervisor) -> Result<(), SupervisorError> + 'static,
    ) {
        self.on_preparing = Some(Box::new(hook));
    }

    /// Queues a callback to run after the prepare hook, in registration order,
    /// before the supervisor is marked running.
    pub fn push_prepared_callback(
        &mut self,
        hook: impl FnOnce(&mut Supervisor) -> Result<(), SupervisorError> + 'static,
    ) {
        self.prepared.push(Box::new(hook));
    }

    /// Queues a callback to run when the terminate signal arrives, in
    /// registration order. Terminating callbacks run at most once.
    pub fn push_terminating_callback(
        &mut self,
        hook: impl FnOnce(&mut Supervisor) -> Result<(), SupervisorError> + 'static,
    ) {
        self.terminating.push(Box::new(hook));
    }

    /// Whether startup completed and no terminate signal has been handled.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The controller, once at least one child has been registered.
    pub fn controller(&self) -> Option<&ProcessController> {
        self.controller.as_ref()
    }

    /// Registers a child worker. The first registration creates the
    /// controller, binds the child-exit signal, and queues the hooks that
    /// bootstrap the controller at the end of preparation and tear it down on
    /// terminate. Deferring the bootstrap guarantees that all children
    /// registered during preparation are known before any is spawned.
    pub fn register_child_process(
        &mut self,
        spec: ChildSpec,
    ) -> Result<(), SupervisorError> {
        if self.controller.is_none() {
            let mut controller = ProcessController::new();
            let pid_file = self.pid_file.clone();
            controller.terminated(move || {
                if let Err(err) = pid_file.clear() {
                    warn!("Failed to clear PID file after teardown: {err}");
                }
            });
            self.controller = Some(controller);

            if let Some(signals) = &self.signals {
                signals.add_signal(SIGCHLD)?;
            }

            self.push_prepared_callback(|sup| match sup.controller.as_mut() {
                Some(controller) => controller.bootstrap(),
                None => Ok(()),
            });
            self.push_terminating_callback(|sup| match sup.controller.as_mut() {
                Some(controller) => controller.terminate(),
                None => Ok(()),
            });
        }

        if let Some(controller) = self.controller.as_mut() {
            controller.register_process(spec);
        }
        Ok(())
    }

    /// Starts the supervisor: enforces the singleton guarantee, optionally
    /// daemonizes, persists the PID file, installs signal bindings, runs the
    /// prepare phase, then blocks dispatching signals until terminated.
    pub fn run(&mut self) -> Result<(), SupervisorError> {
        let signals = self.startup()?;
        self.event_loop(signals)
    }

    /// Everything up to and including marking the supervisor running. The
    /// singleton check must come first: every later step mutates state that
    /// would corrupt a live instance.
    fn startup(&mut self) -> Result<Signals, SupervisorError> {
        self.single_guarantee()?;

        if self.daemonize {
            daemonize()?;
        }

        self.fresh_pid_file()?;

        let signals = Signals::new([SIGTERM, SIGINT, SIGUSR1, SIGUSR2])?;
        if self.controller.is_some() {
            signals.add_signal(SIGCHLD)?;
        }
        self.signals = Some(signals);

        if let Some(prepare) = self.on_preparing.take() {
            prepare(self)?;
        }
        for hook in mem::take(&mut self.prepared) {
            hook(self)?;
        }

        self.running = true;
        info!("Supervisor running (pid {})", unistd::getpid());

        self.signals
            .take()
            .ok_or_else(|| io::Error::other("signal bindings missing").into())
    }

    /// Blocks on the signal iterator, dispatching one signal at a time until
    /// a terminate dispatch clears `running`.
    fn event_loop(&mut self, mut signals: Signals) -> Result<(), SupervisorError> {
        while self.running {
            for signal in signals.wait() {
                self.dispatch(signal)?;
                if !self.running {
                    break;
                }
            }
        }

        info!("Supervisor stopped");
        Ok(())
    }

    /// Routes one delivered signal to its handler.
    fn dispatch(&mut self, signal: i32) -> Result<(), SupervisorError> {
        match signal {
            SIGTERM | SIGINT => self.on_terminating(),
            SIGUSR1 => self.on_reopen(),
            SIGUSR2 => self.on_reload(),
            SIGCHLD => self.on_child_exit(),
            other => {
                debug!("Ignoring unexpected signal {other}");
                Ok(())
            }
        }
    }

    /// Graceful shutdown. Fires only while running, so duplicate terminate
    /// signals after shutdown are no-ops. When no controller was ever created
    /// the PID file is cleared here, since nothing else will.
    fn on_terminating(&mut self) -> Result<(), SupervisorError> {
        if !self.running {
            return Ok(());
        }
        info!("Terminate signal received; shutting down");

        for hook in mem::take(&mut self.terminating) {
            hook(self)?;
        }

        if self.controller.is_none() {
            self.pid_file.clear()?;
        }

        self.running = false;
        Ok(())
    }

    /// Hard restart of workers: new process identities, supervisor untouched.
    fn on_reopen(&mut self) -> Result<(), SupervisorError> {
        match self.controller.as_mut() {
            Some(controller) => controller.reopen(),
            None => {
                debug!("Reopen requested but no workers are registered");
                Ok(())
            }
        }
    }

    /// In-place reload of workers; identities unchanged.
    fn on_reload(&mut self) -> Result<(), SupervisorError> {
        match self.controller.as_mut() {
            Some(controller) => controller.reload(),
            None => {
                debug!("Reload requested but no workers are registered");
                Ok(())
            }
        }
    }

    fn on_child_exit(&mut self) -> Result<(), SupervisorError> {
        match self.controller.as_mut() {
            Some(controller) => controller.reap(),
            None => Ok(()),
        }
    }

    /// Fails with `SingletonConflict` when a live process holds the PID
    /// file's pid. A stale pid (dead process) is treated as not running and
    /// its file is safe to overwrite.
    pub fn single_guarantee(&self) -> Result<(), SupervisorError> {
        if let Some(pid) = self.pid_file.read() {
            if process_alive(pid) {
                return Err(SupervisorError::SingletonConflict { pid: pid.as_raw() });
            }
            debug!("Ignoring stale PID file for dead pid {pid}");
        }
        Ok(())
    }

    /// Persists this process id, overwriting any stale file.
    fn fresh_pid_file(&self) -> Result<(), SupervisorError> {
        self.pid_file.write(unistd::getpid())?;
        Ok(())
    }

    /// Restarts the supervisor. A live instance is torn down and startup
    /// re-runs in this process; with nothing running, `force` is required to
    /// proceed to a fresh start instead of rejecting the operation.
    pub fn restart(&mut self, force: bool) -> Result<(), SupervisorError> {
        match self.single_guarantee() {
            Ok(()) => {
                self.pid_file.clear()?;
                if !force {
                    return Err(SupervisorError::OperationRejected);
                }
                self.run()
            }
            Err(SupervisorError::SingletonConflict { pid }) => {
                self.shutdown_instance(Pid::from_raw(pid))?;
                self.pid_file.clear()?;
                self.run()
            }
            Err(err) => Err(err),
        }
    }

    /// Signals the running instance to terminate. Reports `NoRunningInstance`
    /// when no PID file exists or the recorded process is dead (a stale file
    /// means "not running"); does not wait for shutdown to complete.
    pub fn stop(&self) -> Result<(), SupervisorError> {
        match self.pid_file.read() {
            Some(pid) if process_alive(pid) => {
                info!("Sending terminate signal to pid {pid}");
                match signal::kill(pid, NixSignal::SIGTERM) {
                    Ok(()) => Ok(()),
                    // The instance exited between the liveness probe and the kill.
                    Err(Errno::ESRCH) => Err(SupervisorError::NoRunningInstance),
                    Err(err) => Err(err.into()),
                }
            }
            Some(pid) => {
                debug!("Ignoring stale PID file for dead pid {pid}");
                Err(SupervisorError::NoRunningInstance)
            }
            None => Err(SupervisorError::NoRunningInstance),
        }
    }

    /// Sends the terminate signal to a displaced instance and waits for it to
    /// exit so the relaunch cannot race its teardown.
    fn shutdown_instance(&self, pid: Pid) -> Result<(), SupervisorError> {
        info!("Stopping running instance (pid {pid})");
        signal::kill(pid, NixSignal::SIGTERM)?;

        let deadline = Instant::now() + INSTANCE_SHUTDOWN_TIMEOUT;
        while process_alive(pid) {
            if Instant::now() >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("instance {pid} did not exit"),
                )
                .into());
            }
            thread::sleep(SHUTDOWN_POLL_INTERVAL);
        }
        Ok(())
    }
}

impl Process for Supervisor {
    fn run(&mut self) -> Result<(), SupervisorError> {
        Supervisor::run(self)
    }
}
