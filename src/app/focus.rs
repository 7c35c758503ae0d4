//! Keeps the cursor on the same process across refreshes.

use crate::{app::forest::ForestIndex, collection::processes::Pid};

/// The identity of the process under the cursor, captured before a refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusTracker {
    captured: Option<(Pid, Pid)>,
}

impl FocusTracker {
    /// Remembers the `(pid, ppid)` at `cursor`. An empty tree captures nothing.
    pub fn capture(&mut self, index: &ForestIndex<'_>, cursor: usize) {
        self.captured = index
            .from_index(cursor)
            .map(|record| (record.pid(), record.ppid()));
    }

    /// Returns where the captured process is now, if it still exists with the same
    /// parent. Otherwise tracking is dropped for this cycle and the caller keeps its
    /// cursor where it was.
    pub fn restore(&mut self, index: &ForestIndex<'_>) -> Option<usize> {
        let (pid, ppid) = self.captured.take()?;

        index
            .store()
            .get(pid)
            .filter(|record| record.ppid() == ppid)
            .and_then(|_| index.to_index(pid))
    }
}
