//! Flattens the process forest into a depth-first list, and the viewport over it.

use std::ops::Range;

use hashbrown::HashMap;

use crate::{
    app::{
        store::{ProcessRecord, ProcessStore},
        summary::ProcessType,
    },
    collection::processes::{Pid, Uid},
    constants::{INIT_PID, KTHREADD_PID},
};

/// One visible row of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestEntry {
    pub pid: Pid,
    /// How deep the row is drawn. Hidden ancestors do not count.
    pub depth: usize,
}

/// A pre-order traversal of a [`ProcessStore`], with pid to position lookup both ways.
///
/// The index borrows the store, so it can never be used after the store changes.
pub struct ForestIndex<'a> {
    store: &'a ProcessStore,
    entries: Vec<ForestEntry>,
    positions: HashMap<Pid, usize>,
}

impl<'a> ForestIndex<'a> {
    /// Builds the traversal. Roots go in this order: init first, then the other roots
    /// without a parent (ppid 0) by ascending pid, then the rest in discovery order.
    /// Children follow their link order.
    ///
    /// Unless `show_kernel` is set, kernel threads are skipped but anything below them
    /// is still visited at their depth.
    pub fn build(store: &'a ProcessStore, show_kernel: bool) -> Self {
        let mut roots: Vec<&ProcessRecord> = store.roots().collect();
        roots.sort_by_key(|record| match (record.pid(), record.ppid()) {
            (INIT_PID, _) => (0, 0),
            (pid, 0) => (1, pid),
            _ => (2, 0),
        });

        let mut entries = Vec::with_capacity(store.len());
        let mut stack: Vec<(Pid, usize, bool)> = Vec::new();

        for root in roots {
            stack.push((root.pid(), 0, false));

            while let Some((pid, depth, under_kernel)) = stack.pop() {
                let Some(record) = store.get(pid) else {
                    continue;
                };

                let is_kernel = pid != INIT_PID
                    && (under_kernel
                        || pid == 0
                        || pid == KTHREADD_PID
                        || record.is_kernel_thread);
                let hidden = is_kernel && !show_kernel;

                let child_depth = if hidden {
                    depth
                } else {
                    entries.push(ForestEntry { pid, depth });
                    depth + 1
                };

                // Only the reaper passes kernel-ness down; a flagged thread's user-space
                // children are still shown.
                let children_under_kernel =
                    pid != INIT_PID && (under_kernel || pid == KTHREADD_PID);

                // Reversed so the first child is popped first.
                for child in record.children().iter().rev() {
                    stack.push((*child, child_depth, children_under_kernel));
                }
            }
        }

        Self::from_entries(store, entries)
    }

    /// Builds the flat "type" display: every visible process at depth 0, grouped by
    /// [`ProcessType`] and kept in tree order within each group.
    pub fn by_type(store: &'a ProcessStore, show_kernel: bool, current_uid: Uid) -> Self {
        let mut entries = Self::build(store, show_kernel).entries;
        for entry in &mut entries {
            entry.depth = 0;
        }
        entries.sort_by_cached_key(|entry| {
            store
                .get(entry.pid)
                .map(|record| ProcessType::of(store, record, current_uid))
        });

        Self::from_entries(store, entries)
    }

    fn from_entries(store: &'a ProcessStore, entries: Vec<ForestEntry>) -> Self {
        let positions = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.pid, i))
            .collect();

        ForestIndex {
            store,
            entries,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Where a pid sits in the traversal, if it is visible.
    pub fn to_index(&self, pid: Pid) -> Option<usize> {
        self.positions.get(&pid).copied()
    }

    /// The record at a position, or `None` past the end.
    pub fn from_index(&self, index: usize) -> Option<&'a ProcessRecord> {
        self.entries
            .get(index)
            .and_then(|entry| self.store.get(entry.pid))
    }

    pub fn depth(&self, index: usize) -> Option<usize> {
        self.entries.get(index).map(|entry| entry.depth)
    }

    pub fn entries(&self) -> &[ForestEntry] {
        &self.entries
    }

    pub fn store(&self) -> &'a ProcessStore {
        self.store
    }

    /// Rows in traversal order along with their records.
    pub fn rows(&self) -> impl DoubleEndedIterator<Item = (usize, ForestEntry, &'a ProcessRecord)> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, entry)| {
            self.store.get(entry.pid).map(|record| (i, *entry, record))
        })
    }
}

/// The window of rows shown on screen, and the cursor inside it.
///
/// Outside of a search preview, `top <= cursor < top + height` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub cursor: usize,
    pub top: usize,
    height: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport::new(1)
    }
}

impl Viewport {
    pub fn new(height: usize) -> Self {
        Viewport {
            cursor: 0,
            top: 0,
            height: height.max(1),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Resizes the window, keeping the cursor visible.
    pub fn set_height(&mut self, height: usize, total: usize) {
        self.height = height.max(1);
        self.move_cursor(self.cursor, total);
    }

    fn max_top(&self, total: usize) -> usize {
        total.saturating_sub(self.height)
    }

    /// Moves the cursor to `target`, clamped to the rows there are, and scrolls the window
    /// by as little as possible to keep it in view.
    pub fn move_cursor(&mut self, target: usize, total: usize) {
        self.cursor = target.min(total.saturating_sub(1));

        if self.cursor < self.top {
            self.top = self.cursor;
        } else if self.cursor >= self.top + self.height {
            self.top = self.cursor + 1 - self.height;
        }
    }

    /// Moves the cursor by `delta` rows.
    pub fn move_by(&mut self, delta: isize, total: usize) {
        self.move_cursor(self.cursor.saturating_add_signed(delta), total);
    }

    /// Scrolls the window by `delta` rows, dragging the cursor along only if it would
    /// otherwise leave the window.
    pub fn scroll_lines(&mut self, delta: isize, total: usize) {
        self.top = self
            .top
            .saturating_add_signed(delta)
            .min(self.max_top(total));

        let last = (self.top + self.height - 1).min(total.saturating_sub(1));
        self.cursor = self.cursor.clamp(self.top, last.max(self.top));
        self.move_cursor(self.cursor, total);
    }

    /// Moves both the window and the cursor by `delta` rows, as half-page jumps do.
    pub fn shift(&mut self, delta: isize, total: usize) {
        self.top = self
            .top
            .saturating_add_signed(delta)
            .min(self.max_top(total));
        self.move_by(delta, total);
    }

    pub fn page(&mut self, forward: bool, total: usize) {
        let height = self.height as isize;
        self.scroll_lines(if forward { height } else { -height }, total);
    }

    pub fn half_page(&mut self, forward: bool, total: usize) {
        let half = (self.height / 2).max(1) as isize;
        self.shift(if forward { half } else { -half }, total);
    }

    pub fn first_visible(&mut self, total: usize) {
        self.move_cursor(self.top, total);
    }

    pub fn last_visible(&mut self, total: usize) {
        self.move_cursor(self.visible(total).end.saturating_sub(1), total);
    }

    pub fn middle_visible(&mut self, total: usize) {
        let visible = self.visible(total);
        self.move_cursor(visible.start + visible.len().saturating_sub(1) / 2, total);
    }

    /// Shows `index` in the middle of the window without moving the cursor. Used to
    /// preview search matches.
    pub fn center_on(&mut self, index: usize) {
        self.top = index.saturating_sub(self.height / 2);
    }

    /// Keeps the cursor within the rows there are after the tree changed.
    pub fn clamp(&mut self, total: usize) {
        self.top = self.top.min(self.max_top(total));
        self.move_cursor(self.cursor, total);
    }

    /// The rows currently on screen.
    pub fn visible(&self, total: usize) -> Range<usize> {
        let start = self.top.min(total);
        start..(self.top + self.height).min(total)
    }
}
