//! Per-refresh summary counts.

use crate::{
    app::store::{ProcessRecord, ProcessStore},
    collection::{
        MachineStats,
        processes::{ProcessState, Uid},
    },
    constants::{INIT_PID, KTHREADD_PID},
};

/// Process counts over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub total: usize,
    /// Owned by the user running utop.
    pub owned: usize,
    /// Kernel threads and everything under the kernel thread reaper.
    pub kernel: usize,
    pub zombies: usize,
    /// Indexed by [`ProcessState::index`].
    pub per_state: [usize; ProcessState::ALL.len()],
}

impl ProcessSummary {
    pub fn count(&self, state: ProcessState) -> usize {
        self.per_state[state.index()]
    }
}

/// What the header shows after each refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemSnapshot {
    pub processes: ProcessSummary,
    pub machine: Option<MachineStats>,
}

/// Whether a record belongs to the kernel: the idle/reaper pids themselves, anything the
/// platform flags as a kernel thread, or anything linked under the reaper.
pub fn is_kernel_rooted(store: &ProcessStore, record: &ProcessRecord) -> bool {
    if record.pid() == 0 || record.pid() == KTHREADD_PID || record.is_kernel_thread {
        return true;
    }

    let mut current = store.parent_of(record.pid());
    while let Some(parent) = current {
        match parent.pid() {
            KTHREADD_PID => return true,
            INIT_PID => return false,
            _ => current = store.parent_of(parent.pid()),
        }
    }

    false
}

/// Counts the store as it stands.
pub fn summarize(store: &ProcessStore, current_uid: Uid) -> ProcessSummary {
    let mut summary = ProcessSummary::default();

    for record in store.iter() {
        summary.total += 1;
        summary.per_state[record.state.index()] += 1;

        if record.uid == current_uid {
            summary.owned += 1;
        }
        if record.state == ProcessState::Zombie {
            summary.zombies += 1;
        }
        if is_kernel_rooted(store, record) {
            summary.kernel += 1;
        }
    }

    summary
}

/// The groups of the alternative "type" display, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProcessType {
    Running,
    Zombie,
    Owned,
    Kernel,
    Other,
}

impl ProcessType {
    pub fn name(self) -> &'static str {
        match self {
            ProcessType::Running => "running",
            ProcessType::Zombie => "zombie",
            ProcessType::Owned => "owned",
            ProcessType::Kernel => "kern",
            ProcessType::Other => "other",
        }
    }

    /// The first group that applies wins.
    pub fn of(store: &ProcessStore, record: &ProcessRecord, current_uid: Uid) -> ProcessType {
        if record.state == ProcessState::Running {
            ProcessType::Running
        } else if record.state == ProcessState::Zombie {
            ProcessType::Zombie
        } else if record.uid == current_uid {
            ProcessType::Owned
        } else if is_kernel_rooted(store, record) {
            ProcessType::Kernel
        } else {
            ProcessType::Other
        }
    }
}
