use std::{ops::Range, sync::Arc, time::Duration};

use concat_string::concat_string;
use itertools::Itertools;

use crate::collection::processes::{Gid, Pid, ProcessSnapshot, ProcessState, Uid};

/// Everything known about one live process.
///
/// The parent link is only the `ppid`; the actual parent is found by looking it up in
/// the [`ProcessStore`](super::ProcessStore), which is also the only thing allowed to
/// change `ppid` or `children`.
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pid: Pid,
    ppid: Pid,
    children: Vec<Pid>,

    pub uid: Uid,
    pub gid: Gid,
    pub user: Arc<str>,
    pub group: Arc<str>,
    pub jail_id: Option<i32>,
    pub state: ProcessState,
    pub tty: Option<String>,
    pub nice: i32,
    pub cpu_percent: f32,
    pub utime: Duration,
    pub stime: Duration,
    pub cutime: Duration,
    pub cstime: Duration,
    pub mem_bytes: u64,
    pub comm: String,
    pub is_kernel_thread: bool,

    argv: Vec<String>,
    shell_cmd: String,
    basename: Range<usize>,
}

impl ProcessRecord {
    /// Builds a record from a full snapshot. A snapshot without arguments gets `[comm]`.
    pub fn from_snapshot(snapshot: ProcessSnapshot) -> Self {
        let mut record = ProcessRecord {
            pid: snapshot.pid,
            ppid: snapshot.ppid,
            children: Vec::new(),
            uid: 0,
            gid: 0,
            user: Arc::from(""),
            group: Arc::from(""),
            jail_id: None,
            state: ProcessState::Other,
            tty: None,
            nice: 0,
            cpu_percent: 0.0,
            utime: Duration::ZERO,
            stime: Duration::ZERO,
            cutime: Duration::ZERO,
            cstime: Duration::ZERO,
            mem_bytes: 0,
            comm: String::new(),
            is_kernel_thread: false,
            argv: Vec::new(),
            shell_cmd: String::new(),
            basename: 0..0,
        };
        record.apply(snapshot);

        if record.argv.is_empty() {
            record.set_argv(Vec::new());
        }

        record
    }

    /// Copies a fresh snapshot into this record. Identity, parent linkage, and children are
    /// left alone. The argument vector and the strings derived from it are only replaced
    /// if the snapshot carries one.
    pub fn apply(&mut self, snapshot: ProcessSnapshot) {
        let ProcessSnapshot {
            pid: _,
            ppid: _,
            uid,
            gid,
            user,
            group,
            jail_id,
            state,
            tty,
            nice,
            cpu_percent,
            utime,
            stime,
            cutime,
            cstime,
            mem_bytes,
            argv,
            comm,
            is_kernel_thread,
        } = snapshot;

        self.uid = uid;
        self.gid = gid;
        self.user = user;
        self.group = group;
        self.jail_id = jail_id;
        self.state = state;
        self.tty = tty;
        self.nice = nice;
        self.cpu_percent = cpu_percent;
        self.utime = utime;
        self.stime = stime;
        self.cutime = cutime;
        self.cstime = cstime;
        self.mem_bytes = mem_bytes;
        self.comm = comm;
        self.is_kernel_thread = is_kernel_thread;

        if let Some(argv) = argv {
            self.set_argv(argv);
        }
    }

    fn set_argv(&mut self, argv: Vec<String>) {
        self.argv = if argv.is_empty() {
            vec![concat_string!("[", self.comm, "]")]
        } else {
            argv
        };
        self.shell_cmd = self.argv.iter().join(" ");
        self.basename = basename_range(&self.argv[0]);
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn ppid(&self) -> Pid {
        self.ppid
    }

    pub(super) fn set_ppid(&mut self, ppid: Pid) {
        self.ppid = ppid;
    }

    /// Children in the order they were linked.
    pub fn children(&self) -> &[Pid] {
        &self.children
    }

    pub(super) fn children_mut(&mut self) -> &mut Vec<Pid> {
        &mut self.children
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// The arguments joined by single spaces.
    pub fn shell_cmd(&self) -> &str {
        &self.shell_cmd
    }

    /// The executable name inside the first argument, e.g. `sshd` for `/usr/sbin/sshd`.
    pub fn basename(&self) -> &str {
        &self.argv[0][self.basename.clone()]
    }

    /// Where [`ProcessRecord::basename`] sits inside [`ProcessRecord::shell_cmd`].
    pub fn basename_range(&self) -> Range<usize> {
        self.basename.clone()
    }

    /// Total CPU time, including waited-for children.
    pub fn total_cpu_time(&self) -> Duration {
        self.utime + self.stime + self.cutime + self.cstime
    }
}

/// Finds the executable name in the first argument: everything after the last `/`,
/// stopping at the first space or colon (`sshd: user@pts/0` names itself `sshd`).
/// Bracketed kernel names are kept whole.
fn basename_range(arg0: &str) -> Range<usize> {
    if arg0.starts_with('[') {
        return 0..arg0.len();
    }

    let end = arg0.find([' ', ':']).unwrap_or(arg0.len());
    let start = arg0[..end].rfind('/').map(|i| i + 1).unwrap_or(0);

    start..end
}
