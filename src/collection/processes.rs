//! Process snapshots and the platform collectors that produce them.
//!
//! For Linux, this is handled by reading `/proc` directly.
//! For other Unix-likes, this is handled by sysinfo.
//! A captured `ps` listing can stand in for either.

use std::{sync::Arc, time::Duration};

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(target_os = "linux")] {
        pub mod linux;
        pub use self::linux::LinuxCollector as NativeCollector;
    } else {
        pub mod generic;
        pub use self::generic::GenericCollector as NativeCollector;
    }
}

pub mod listing;
pub mod unix;

pub use self::unix::UserTable;

/// A UNIX process ID.
pub type Pid = libc::pid_t;

/// A UNIX user ID.
pub type Uid = libc::uid_t;

/// A UNIX group ID.
pub type Gid = libc::gid_t;

/// The scheduling state of a process, normalized across platforms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProcessState {
    Running,
    #[default]
    Sleeping,
    DiskWait,
    Stopped,
    Zombie,
    Dead,
    Traced,
    Other,
}

impl ProcessState {
    /// Every state, in histogram order.
    pub const ALL: [ProcessState; 8] = [
        ProcessState::Running,
        ProcessState::Sleeping,
        ProcessState::DiskWait,
        ProcessState::Stopped,
        ProcessState::Zombie,
        ProcessState::Dead,
        ProcessState::Traced,
        ProcessState::Other,
    ];

    /// Maps a `ps`/`/proc` state letter.
    pub fn from_char(c: char) -> Self {
        match c {
            'R' => ProcessState::Running,
            'S' | 'I' => ProcessState::Sleeping,
            'D' | 'U' => ProcessState::DiskWait,
            'T' => ProcessState::Stopped,
            't' => ProcessState::Traced,
            'Z' => ProcessState::Zombie,
            'X' | 'x' => ProcessState::Dead,
            _ => ProcessState::Other,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            ProcessState::Running => 'R',
            ProcessState::Sleeping => 'S',
            ProcessState::DiskWait => 'D',
            ProcessState::Stopped => 'T',
            ProcessState::Zombie => 'Z',
            ProcessState::Dead => 'X',
            ProcessState::Traced => 't',
            ProcessState::Other => '?',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProcessState::Running => "running",
            ProcessState::Sleeping => "sleeping",
            ProcessState::DiskWait => "disk wait",
            ProcessState::Stopped => "stopped",
            ProcessState::Zombie => "zombie",
            ProcessState::Dead => "dead",
            ProcessState::Traced => "traced",
            ProcessState::Other => "other",
        }
    }

    /// Position of this state in [`ProcessState::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// The raw fields a collector reports for one process at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSnapshot {
    pub pid: Pid,

    /// The parent PID of the process. A `ppid` of 0 means there is no parent.
    pub ppid: Pid,

    /// This is the *effective* user ID of the process.
    pub uid: Uid,
    pub gid: Gid,

    /// The resolved user name, or the uid as text if it has no passwd entry.
    pub user: Arc<str>,
    pub group: Arc<str>,

    /// The container or jail the process runs in, on platforms that have one.
    pub jail_id: Option<i32>,

    pub state: ProcessState,

    /// The controlling terminal, e.g. `pts/3`.
    pub tty: Option<String>,

    pub nice: i32,

    /// CPU usage as a percentage.
    pub cpu_percent: f32,

    /// Time scheduled in user mode.
    pub utime: Duration,

    /// Time scheduled in kernel mode.
    pub stime: Duration,

    /// User time of waited-for children.
    pub cutime: Duration,

    /// Kernel time of waited-for children.
    pub cstime: Duration,

    /// Resident memory in bytes.
    pub mem_bytes: u64,

    /// The argument vector. `None` if it was not read this time; `Some` but empty if the
    /// process has none (kernel threads and zombies).
    pub argv: Option<Vec<String>>,

    /// The short executable name the kernel keeps for the process.
    pub comm: String,

    pub is_kernel_thread: bool,
}

impl ProcessSnapshot {
    /// A snapshot with only identity filled in. Everything else takes a neutral value.
    pub fn new(pid: Pid, ppid: Pid, comm: impl Into<String>) -> Self {
        ProcessSnapshot {
            pid,
            ppid,
            uid: 0,
            gid: 0,
            user: Arc::from("root"),
            group: Arc::from("root"),
            jail_id: None,
            state: ProcessState::Sleeping,
            tty: None,
            nice: 0,
            cpu_percent: 0.0,
            utime: Duration::ZERO,
            stime: Duration::ZERO,
            cutime: Duration::ZERO,
            cstime: Duration::ZERO,
            mem_bytes: 0,
            argv: None,
            comm: comm.into(),
            is_kernel_thread: false,
        }
    }

    /// Sets the argument vector by splitting a command line on whitespace.
    pub fn with_command(mut self, command: &str) -> Self {
        self.argv = Some(command.split_whitespace().map(str::to_string).collect());
        self
    }

    pub fn with_owner(mut self, uid: Uid, user: &str) -> Self {
        self.uid = uid;
        self.user = Arc::from(user);
        self
    }

    pub fn with_state(mut self, state: ProcessState) -> Self {
        self.state = state;
        self
    }
}
