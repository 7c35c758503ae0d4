use std::time::Duration;

use crate::collection::processes::Pid;

// Refresh and rescan rates.
pub const DEFAULT_REFRESH_RATE_IN_MILLISECONDS: u64 = 500;
pub const MIN_REFRESH_RATE_IN_MILLISECONDS: u64 = 100;
/// By default, argument vectors are re-read every this many refreshes.
pub const DEFAULT_RESCAN_MULTIPLIER: u32 = 60;

/// How long the loop may block on input before checking in again, even when no refresh
/// is due. Keeps a frozen app responsive to termination signals.
pub const MAX_POLL_DURATION: Duration = Duration::from_millis(250);

// Well-known pids.
pub const INIT_PID: Pid = 1;
/// The kernel thread reaper on Linux. Everything under it is a kernel thread.
pub const KTHREADD_PID: Pid = 2;

/// The indentation added per tree level.
pub const INDENT: &str = "    ";

/// Placeholder substituted with the selected pid in external tool commands.
pub const PID_PLACEHOLDER: &str = "{pid}";

// Config and logging
pub const DEFAULT_CONFIG_DIR: &str = "utop";
pub const DEFAULT_CONFIG_FILE_NAME: &str = "utop.toml";

/// The environment variable set for shells spawned on a process.
pub const PID_ENV_VAR: &str = "UTOP_PID";
