//! Keeper is a single-instance daemon supervisor for Unix-like operating
//! systems. It guarantees that only one supervisor runs per PID-file path,
//! registers and monitors child worker processes, and reacts to OS signals to
//! terminate, reload, reopen, restart, or stop the whole process tree.

/// CLI interface.
pub mod cli;

/// Worker manifest parsing.
pub mod config;

/// Constants and exit codes.
pub mod constants;

/// Child process registry and fan-out control.
pub mod controller;

/// Daemonization primitive.
pub mod daemonize;

/// Error handling.
pub mod error;

/// PID file persistence and liveness probing.
pub mod pidfile;

/// The abstract unit of executable work.
pub mod process;

/// Top-level supervisor runtime.
pub mod supervisor;
