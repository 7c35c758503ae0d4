//! The process store: every known process, keyed by pid and threaded into a forest.

mod record;

use indexmap::IndexMap;

pub use self::record::ProcessRecord;
use crate::{
    collection::processes::Pid,
    utils::error::{Result, UtopError},
};

/// Owns every [`ProcessRecord`].
///
/// Records are kept in discovery order. A record is linked into its parent's children
/// when the parent is known and linking would not form a cycle; otherwise it is a root.
/// Whichever of parent and child is seen first, the link is made once both exist.
#[derive(Debug, Default)]
pub struct ProcessStore {
    records: IndexMap<Pid, ProcessRecord>,
}

impl ProcessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.records.contains_key(&pid)
    }

    pub fn get(&self, pid: Pid) -> Option<&ProcessRecord> {
        self.records.get(&pid)
    }

    /// Mutable access to a record's fields. Linkage can only change through the store.
    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut ProcessRecord> {
        self.records.get_mut(&pid)
    }

    /// Every record in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.values()
    }

    /// A copy of every pid in discovery order, safe to hold across mutations.
    pub fn pids(&self) -> Vec<Pid> {
        self.records.keys().copied().collect()
    }

    /// The record's parent, if its `ppid` resolves and the two are linked.
    pub fn parent_of(&self, pid: Pid) -> Option<&ProcessRecord> {
        let record = self.records.get(&pid)?;

        self.records
            .get(&record.ppid())
            .filter(|parent| parent.children().contains(&pid))
    }

    pub fn children_of(&self, pid: Pid) -> &[Pid] {
        self.records
            .get(&pid)
            .map(ProcessRecord::children)
            .unwrap_or_default()
    }

    /// Records without a linked parent, in discovery order.
    pub fn roots(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records
            .values()
            .filter(|record| self.parent_of(record.pid()).is_none())
    }

    /// Adds a new record, links it under its parent if present, and adopts any roots that
    /// were waiting for it as their parent.
    pub fn insert(&mut self, record: ProcessRecord) -> Result<()> {
        let pid = record.pid();
        if self.records.contains_key(&pid) {
            return Err(UtopError::DuplicatePid(pid));
        }

        self.records.insert(pid, record);
        self.link(pid);
        self.adopt_waiting(pid);

        Ok(())
    }

    /// Unlinks a record from its parent, drops it, and returns it. Its children stay in the
    /// store as roots until their `ppid` resolves again.
    pub fn remove(&mut self, pid: Pid) -> Option<ProcessRecord> {
        self.detach(pid);

        let mut record = self.records.shift_remove(&pid)?;
        record.children_mut().clear();

        Some(record)
    }

    /// Moves a record to a new parent. It is detached from its current parent first.
    pub fn reparent(&mut self, pid: Pid, new_ppid: Pid) {
        let Some(record) = self.records.get(&pid) else {
            return;
        };

        if record.ppid() == new_ppid && self.parent_of(pid).is_some() {
            return;
        }

        self.detach(pid);
        if let Some(record) = self.records.get_mut(&pid) {
            record.set_ppid(new_ppid);
        }
        self.link(pid);

        // Moving this record may have broken a cycle that kept others waiting on it.
        self.adopt_waiting(pid);
    }

    /// Whether `ancestor` is `pid` itself or one of its linked ancestors.
    fn is_ancestor_or_self(&self, ancestor: Pid, pid: Pid) -> bool {
        let mut current = pid;
        loop {
            if current == ancestor {
                return true;
            }

            match self.parent_of(current) {
                Some(parent) => current = parent.pid(),
                None => return false,
            }
        }
    }

    /// Appends `pid` to its parent's children, if the parent exists and the link is
    /// acyclic.
    fn link(&mut self, pid: Pid) {
        let Some(ppid) = self.records.get(&pid).map(ProcessRecord::ppid) else {
            return;
        };

        if !self.records.contains_key(&ppid) || self.is_ancestor_or_self(pid, ppid) {
            return;
        }

        if let Some(parent) = self.records.get_mut(&ppid) {
            if !parent.children().contains(&pid) {
                parent.children_mut().push(pid);
            }
        }
    }

    fn detach(&mut self, pid: Pid) {
        let Some(ppid) = self.parent_of(pid).map(ProcessRecord::pid) else {
            return;
        };

        if let Some(parent) = self.records.get_mut(&ppid) {
            parent.children_mut().retain(|child| *child != pid);
        }
    }

    /// Links every root whose `ppid` is `pid`.
    fn adopt_waiting(&mut self, pid: Pid) {
        let waiting: Vec<Pid> = self
            .records
            .values()
            .filter(|record| record.ppid() == pid && record.pid() != pid)
            .map(ProcessRecord::pid)
            .filter(|child| self.parent_of(*child).is_none())
            .collect();

        for child in waiting {
            self.link(child);
        }
    }
}
