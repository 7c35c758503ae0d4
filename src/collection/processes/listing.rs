//! Reads processes from a captured `ps` listing instead of the live system.
//!
//! The file is re-read on every refresh, so editing it between refreshes is a cheap
//! way to replay process churn. The header line decides which column is which; only
//! `PID`, `PPID` and a trailing command column are required.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, anyhow};
use indexmap::IndexMap;

use super::{Pid, ProcessSnapshot, ProcessState, Uid, UserTable};
use crate::{
    collection::{
        Collector,
        error::{CollectionError, CollectionResult},
    },
    multi_eq_ignore_ascii_case,
};

/// The columns we understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Pid,
    Ppid,
    User,
    Uid,
    State,
    Tty,
    Nice,
    Cpu,
    Rss,
    Command,
    Ignored,
}

impl Column {
    fn from_header(name: &str) -> Column {
        if multi_eq_ignore_ascii_case!(name, "PID") {
            Column::Pid
        } else if multi_eq_ignore_ascii_case!(name, "PPID") {
            Column::Ppid
        } else if multi_eq_ignore_ascii_case!(name, "USER" | "RUSER" | "EUSER") {
            Column::User
        } else if multi_eq_ignore_ascii_case!(name, "UID" | "EUID") {
            Column::Uid
        } else if multi_eq_ignore_ascii_case!(name, "STAT" | "S" | "STATE") {
            Column::State
        } else if multi_eq_ignore_ascii_case!(name, "TT" | "TTY") {
            Column::Tty
        } else if multi_eq_ignore_ascii_case!(name, "NI" | "NICE") {
            Column::Nice
        } else if multi_eq_ignore_ascii_case!(name, "%CPU" | "PCPU" | "C") {
            Column::Cpu
        } else if multi_eq_ignore_ascii_case!(name, "RSS" | "RSZ") {
            Column::Rss
        } else if multi_eq_ignore_ascii_case!(name, "COMMAND" | "CMD" | "ARGS") {
            Column::Command
        } else {
            Column::Ignored
        }
    }
}

/// The column layout, taken from the header line.
#[derive(Debug)]
struct Layout {
    /// Every column before the command, in order.
    fixed: Vec<Column>,
}

impl Layout {
    fn from_header(header: &str) -> CollectionResult<Layout> {
        let columns: Vec<Column> = header.split_whitespace().map(Column::from_header).collect();

        let Some((last, fixed)) = columns.split_last() else {
            return Err("the listing is empty".into());
        };

        if *last != Column::Command {
            return Err("the last column of the listing must be COMMAND, CMD or ARGS".into());
        }

        for required in [Column::Pid, Column::Ppid] {
            if !fixed.contains(&required) {
                return Err(CollectionError::General(anyhow!(
                    "the listing header is missing the {required:?} column"
                )));
            }
        }

        Ok(Layout {
            fixed: fixed.to_vec(),
        })
    }

    /// Parses one data line. Returns `None` if the line does not fit the layout.
    fn parse_line(&self, line: &str, users: &mut UserTable) -> Option<ProcessSnapshot> {
        let mut rest = line.trim();
        let mut fields = Vec::with_capacity(self.fixed.len());

        for _ in &self.fixed {
            let end = rest.find(char::is_whitespace)?;
            fields.push(&rest[..end]);
            rest = rest[end..].trim_start();
        }

        if rest.is_empty() {
            return None;
        }

        let mut snapshot = ProcessSnapshot::new(0, 0, "");
        let mut pid = None;
        let mut ppid = None;
        let mut user: Option<Arc<str>> = None;
        let mut uid: Option<Uid> = None;

        for (column, field) in self.fixed.iter().zip(fields) {
            match column {
                // Pids of zero or less are process groups to kill(2), never a row.
                Column::Pid => pid = field.parse::<Pid>().ok().filter(|pid| *pid > 0),
                Column::Ppid => ppid = field.parse::<Pid>().ok(),
                Column::User => {
                    user = Some(Arc::from(field));
                    if uid.is_none() {
                        uid = field.parse().ok().or_else(|| users.username_to_uid(field));
                    }
                }
                Column::Uid => uid = field.parse().ok().or(uid),
                Column::State => {
                    snapshot.state = field
                        .chars()
                        .next()
                        .map(ProcessState::from_char)
                        .unwrap_or_default()
                }
                Column::Tty => {
                    snapshot.tty = match field {
                        "?" | "-" | "??" => None,
                        tty => Some(tty.to_string()),
                    }
                }
                Column::Nice => snapshot.nice = field.parse().unwrap_or_default(),
                Column::Cpu => snapshot.cpu_percent = field.parse().unwrap_or_default(),
                Column::Rss => {
                    let kib = field.parse::<u64>().unwrap_or_default();
                    snapshot.mem_bytes = kib.saturating_mul(1024);
                }
                Column::Command | Column::Ignored => {}
            }
        }

        snapshot.pid = pid?;
        snapshot.ppid = ppid?;
        snapshot.uid = uid.unwrap_or(Uid::MAX);
        snapshot.user = match (user, uid) {
            (Some(user), _) => user,
            (None, Some(uid)) => users.user_or_uid(uid),
            (None, None) => Arc::from("?"),
        };

        // Kernel threads show up as "[kthreadd]" with no arguments.
        if let Some(name) = rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            snapshot.comm = name.to_string();
            snapshot.argv = Some(Vec::new());
            snapshot.is_kernel_thread = snapshot.ppid == crate::constants::KTHREADD_PID
                || snapshot.pid == crate::constants::KTHREADD_PID;
        } else {
            let argv: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
            snapshot.comm = argv
                .first()
                .map(|arg0| arg0.rsplit('/').next().unwrap_or(arg0).to_string())
                .unwrap_or_default();
            snapshot.argv = Some(argv);
        }

        Some(snapshot)
    }
}

/// Parses a whole listing, keeping rows in file order. Malformed rows are skipped.
fn parse_listing(
    contents: &str, users: &mut UserTable,
) -> CollectionResult<IndexMap<Pid, ProcessSnapshot>> {
    let mut lines = contents.lines().filter(|line| !line.trim().is_empty());
    let layout = Layout::from_header(lines.next().unwrap_or_default())?;

    let mut rows = IndexMap::new();
    for line in lines {
        match layout.parse_line(line, users) {
            Some(snapshot) => {
                rows.insert(snapshot.pid, snapshot);
            }
            None => log::warn!("skipping malformed listing line: {line:?}"),
        }
    }

    Ok(rows)
}

/// A [`Collector`] backed by a captured `ps` listing.
pub struct ListingCollector {
    path: PathBuf,
    rows: IndexMap<Pid, ProcessSnapshot>,
    user_table: UserTable,
}

impl ListingCollector {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            rows: IndexMap::new(),
            user_table: UserTable::default(),
        }
    }
}

impl Collector for ListingCollector {
    fn name(&self) -> &'static str {
        "listing"
    }

    fn prepare(&mut self) -> CollectionResult<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("could not read the listing at {:?}", self.path))?;
        self.rows = parse_listing(&contents, &mut self.user_table)?;

        Ok(())
    }

    fn exists(&self, pid: Pid) -> bool {
        self.rows.contains_key(&pid)
    }

    fn read(&mut self, pid: Pid, with_argv: bool) -> CollectionResult<ProcessSnapshot> {
        let mut snapshot = self
            .rows
            .get(&pid)
            .cloned()
            .ok_or(CollectionError::NotFound(pid))?;

        if !with_argv {
            snapshot.argv = None;
        }

        Ok(snapshot)
    }

    fn enumerate(&mut self) -> CollectionResult<Vec<Pid>> {
        Ok(self.rows.keys().copied().collect())
    }
}
