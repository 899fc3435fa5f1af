//! Constants and exit codes for the keeper supervisor.
//!
//! Exit codes are a compatibility surface: init scripts distinguish conflict
//! vs. rejection vs. missing-instance by numeric value, so they must stay
//! stable across releases.

use std::time::Duration;

/// Exit code when another live instance already holds the PID file.
pub const EXIT_SINGLETON_CONFLICT: i32 = 1;

/// Exit code when `restart` finds nothing to restart and no force flag was given.
pub const EXIT_OPERATION_REJECTED: i32 = 2;

/// Exit code when `stop` finds no PID file.
pub const EXIT_NO_RUNNING_INSTANCE: i32 = 4;

/// Exit code for fatal errors outside the control-flow taxonomy (EX_SOFTWARE).
pub const EXIT_FAILURE: i32 = 70;

/// File name of the supervisor PID file inside the state directory.
pub const PID_FILE_NAME: &str = "keeper.pid";

/// State directory under `$HOME` where runtime files live.
pub const STATE_DIR: &str = ".local/share/keeper";

/// Poll interval while waiting for a process that has not exited yet.
pub const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long `restart` waits for a displaced instance to exit before giving up.
pub const INSTANCE_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
