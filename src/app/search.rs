//! Incremental search over the tree.

use crate::{
    app::{forest::ForestIndex, store::ProcessRecord},
    collection::processes::Pid,
    utils::{
        error::{Result, UtopError},
        strings::contains_ignore_case,
    },
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchDirection {
    #[default]
    Forward,
    Backward,
}

/// Whether a record's command matches a text query.
pub fn matches(record: &ProcessRecord, query: &str) -> bool {
    !query.is_empty() && contains_ignore_case(record.shell_cmd(), query)
}

/// A query made only of digits is a pid lookup.
pub fn is_pid_query(query: &str) -> bool {
    !query.is_empty() && query.bytes().all(|b| b.is_ascii_digit())
}

/// Finds the position of the `offset`-th match (0 being the first) in traversal order,
/// or in reverse traversal order when searching backward.
///
/// A pid query goes straight to the index and ignores the offset.
pub fn find(
    index: &ForestIndex<'_>, query: &str, offset: usize, direction: SearchDirection,
) -> Result<Option<usize>> {
    if query.is_empty() {
        return Ok(None);
    }

    if is_pid_query(query) {
        let pid: Pid = query
            .parse()
            .map_err(|_| UtopError::input(format!("'{query}' is not a valid pid")))?;

        return Ok(index.to_index(pid));
    }

    let mut hits = index
        .rows()
        .filter(|(_, _, record)| matches(record, query))
        .map(|(i, _, _)| i);

    Ok(match direction {
        SearchDirection::Forward => hits.nth(offset),
        SearchDirection::Backward => hits.rev().nth(offset),
    })
}

/// The state of a search being typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    /// Which match to show, counted in the search direction.
    pub offset: usize,
    pub direction: SearchDirection,
    /// Where the window was when the search started, restored on cancel.
    pub saved_top: usize,
    /// The pid of the match being previewed.
    pub found: Option<Pid>,
}

impl SearchState {
    pub fn new(direction: SearchDirection, saved_top: usize) -> Self {
        SearchState {
            direction,
            saved_top,
            ..Default::default()
        }
    }

    pub fn push(&mut self, c: char) {
        self.query.push(c);
        self.offset = 0;
    }

    pub fn pop(&mut self) {
        self.query.pop();
        self.offset = 0;
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.offset = 0;
    }

    /// Re-runs the search and returns the matching position.
    pub fn run(&mut self, index: &ForestIndex<'_>) -> Result<Option<usize>> {
        let position = find(index, &self.query, self.offset, self.direction);
        self.found = match &position {
            Ok(Some(i)) => index.from_index(*i).map(ProcessRecord::pid),
            _ => None,
        };

        position
    }

    /// Moves to the next (`forward`) or previous match. Stepping past the last match
    /// stays on it.
    pub fn step(&mut self, forward: bool, index: &ForestIndex<'_>) -> Result<Option<usize>> {
        let previous = self.offset;
        self.offset = if forward {
            self.offset + 1
        } else {
            self.offset.saturating_sub(1)
        };

        match self.run(index)? {
            None if self.offset > previous => {
                self.offset = previous;
                self.run(index)
            }
            found => Ok(found),
        }
    }
}
