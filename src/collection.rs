//! Process collection.
//!
//! The engine never reads the OS itself. Everything it learns about processes comes
//! through a [`Collector`], which makes it easy to swap the live system for a captured
//! `ps` listing or a scripted table in tests.

pub mod error;
pub mod machine;
pub mod processes;

use std::path::Path;

pub use machine::MachineStats;

use self::{
    error::CollectionResult,
    processes::{NativeCollector, Pid, ProcessSnapshot, listing::ListingCollector},
};
use crate::app::store::ProcessRecord;

/// A source of process data.
pub trait Collector {
    /// A short name for logs.
    fn name(&self) -> &'static str;

    /// Per-cycle setup, called once before each sweep. An error here means the collector
    /// as a whole is broken.
    fn prepare(&mut self) -> CollectionResult<()> {
        Ok(())
    }

    /// Whether the process is still alive.
    fn exists(&self, pid: Pid) -> bool;

    /// Reads a full snapshot of a process. The argument vector is only read if `with_argv`
    /// is set; otherwise it is left as `None`.
    fn read(&mut self, pid: Pid, with_argv: bool) -> CollectionResult<ProcessSnapshot>;

    /// Refreshes a known record in place and returns the parent pid the platform now
    /// reports. The record's parent linkage is left to the store.
    fn update(&mut self, record: &mut ProcessRecord, rescan: bool) -> CollectionResult<Pid> {
        let snapshot = self.read(record.pid(), rescan)?;
        let ppid = snapshot.ppid;
        record.apply(snapshot);

        Ok(ppid)
    }

    /// Lists every pid currently in the process table.
    fn enumerate(&mut self) -> CollectionResult<Vec<Pid>>;

    /// Machine-wide stats, if this collector has any.
    fn machine_stats(&mut self) -> Option<MachineStats> {
        None
    }
}

/// Returns the collector for this run: a listing reader if a listing file was given,
/// otherwise the native one for this platform.
pub fn create_collector(listing: Option<&Path>) -> Box<dyn Collector> {
    match listing {
        Some(path) => Box::new(ListingCollector::new(path)),
        None => Box::new(NativeCollector::new()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A collector driven by a table the test edits between refreshes.

    use hashbrown::HashMap;
    use indexmap::IndexMap;

    use super::*;
    use crate::collection::error::CollectionError;

    #[derive(Default)]
    pub(crate) struct ScriptedCollector {
        pub(crate) table: IndexMap<Pid, ProcessSnapshot>,
        /// Pids whose reads fail even though they exist.
        pub(crate) unreadable: Vec<Pid>,
        pub(crate) fail_prepare: bool,
        pub(crate) reads: HashMap<Pid, usize>,
    }

    impl ScriptedCollector {
        pub(crate) fn with(snapshots: impl IntoIterator<Item = ProcessSnapshot>) -> Self {
            Self {
                table: snapshots.into_iter().map(|s| (s.pid, s)).collect(),
                ..Default::default()
            }
        }

        pub(crate) fn put(&mut self, snapshot: ProcessSnapshot) {
            self.table.insert(snapshot.pid, snapshot);
        }

        pub(crate) fn kill(&mut self, pid: Pid) {
            self.table.shift_remove(&pid);
        }
    }

    impl Collector for ScriptedCollector {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn prepare(&mut self) -> CollectionResult<()> {
            if self.fail_prepare {
                Err("scripted failure".into())
            } else {
                Ok(())
            }
        }

        fn exists(&self, pid: Pid) -> bool {
            self.table.contains_key(&pid)
        }

        fn read(&mut self, pid: Pid, with_argv: bool) -> CollectionResult<ProcessSnapshot> {
            *self.reads.entry(pid).or_default() += 1;

            if self.unreadable.contains(&pid) {
                return Err("scripted unreadable".into());
            }

            let mut snapshot = self
                .table
                .get(&pid)
                .cloned()
                .ok_or(CollectionError::NotFound(pid))?;

            if !with_argv {
                snapshot.argv = None;
            }

            Ok(snapshot)
        }

        fn enumerate(&mut self) -> CollectionResult<Vec<Pid>> {
            Ok(self.table.keys().copied().collect())
        }
    }
}
