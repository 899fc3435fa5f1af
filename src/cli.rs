//! Command-line interface for keeperd.
use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        let level = match trimmed.to_ascii_lowercase().as_str() {
            "0" | "off" => LevelFilter::OFF,
            "1" | "error" | "err" => LevelFilter::ERROR,
            "2" | "warn" | "warning" => LevelFilter::WARN,
            "3" | "info" => LevelFilter::INFO,
            "4" | "debug" => LevelFilter::DEBUG,
            "5" | "trace" => LevelFilter::TRACE,
            _ => return Err(format!("invalid log level '{trimmed}' (names or 0-5)")),
        };
        Ok(LogLevelArg(level))
    }
}

/// Command-line interface for keeperd.
#[derive(Parser)]
#[command(name = "keeperd", version, author)]
#[command(about = "A single-instance daemon supervisor", long_about = None)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for keeperd.
#[derive(Subcommand)]
pub enum Commands {
    /// Start the supervisor with the given worker manifest.
    Run {
        /// Path to the worker manifest (defaults to `keeper.yaml`).
        #[arg(short, long, default_value = "keeper.yaml")]
        config: String,

        /// Detach from the terminal and run in the background.
        #[arg(long)]
        daemonize: bool,

        /// Override the PID file location.
        #[arg(long, value_name = "PATH")]
        pid_file: Option<String>,
    },

    /// Restart the running supervisor, or start fresh with --force.
    Restart {
        /// Path to the worker manifest (defaults to `keeper.yaml`).
        #[arg(short, long, default_value = "keeper.yaml")]
        config: String,

        /// Detach from the terminal and run in the background.
        #[arg(long)]
        daemonize: bool,

        /// Proceed with a fresh start even when nothing is running.
        #[arg(long)]
        force: bool,

        /// Override the PID file location.
        #[arg(long, value_name = "PATH")]
        pid_file: Option<String>,
    },

    /// Signal the running supervisor to terminate.
    Stop {
        /// Override the PID file location.
        #[arg(long, value_name = "PATH")]
        pid_file: Option<String>,
    },
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
