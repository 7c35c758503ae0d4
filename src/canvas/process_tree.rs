//! The process rows.

use std::ops::Range;

use concat_string::concat_string;
use tui::{
    style::Style,
    text::{Line, Span},
};

use crate::{
    app::{
        DisplayMode, UiState,
        forest::ForestIndex,
        search::{is_pid_query, matches},
        store::ProcessRecord,
        summary::ProcessType,
    },
    canvas::styling::Styles,
    collection::processes::{Pid, Uid},
    constants::INDENT,
    utils::strings::{skip_columns, truncate_to_width},
};

const PID_WIDTH: usize = 7;
const USER_WIDTH: usize = 8;
const NICE_WIDTH: usize = 3;
const CPU_WIDTH: usize = 5;
const TYPE_WIDTH: usize = 7;

/// Which fixed columns precede the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub thin: bool,
    pub show_type: bool,
}

impl Columns {
    pub fn new(thin: bool, display: DisplayMode) -> Self {
        Columns {
            thin,
            show_type: display == DisplayMode::Type,
        }
    }

    pub fn header(&self) -> String {
        let mut header = format!("{:>PID_WIDTH$} ", "PID");
        if !self.thin {
            header.push_str(&format!("{:<USER_WIDTH$} ", "USER"));
        }
        header.push_str("S ");
        if !self.thin {
            header.push_str(&format!("{:>NICE_WIDTH$} ", "NI"));
        }
        header.push_str(&format!("{:>CPU_WIDTH$} ", "CPU%"));
        if self.show_type {
            header.push_str(&format!("{:<TYPE_WIDTH$} ", "TYPE"));
        }
        header.push_str("COMMAND");

        header
    }

    /// The fixed columns of one row, ending with a separating space.
    pub fn prefix(&self, record: &ProcessRecord, process_type: Option<ProcessType>) -> String {
        let mut prefix = format!("{:>PID_WIDTH$} ", record.pid());
        if !self.thin {
            let user = truncate_to_width(&record.user, USER_WIDTH);
            prefix.push_str(&format!("{user:<USER_WIDTH$} "));
        }
        prefix.push(record.state.as_char());
        prefix.push(' ');
        if !self.thin {
            prefix.push_str(&format!("{:>NICE_WIDTH$} ", record.nice));
        }
        prefix.push_str(&format!("{:>CPU_WIDTH$.1} ", record.cpu_percent));
        if self.show_type {
            let name = process_type.map(ProcessType::name).unwrap_or_default();
            prefix.push_str(&format!("{name:<TYPE_WIDTH$} "));
        }

        prefix
    }
}

/// The command column of one row: indentation then the command, scrolled left by
/// `h_scroll` columns. Also returns where the executable name ended up, if it is
/// still visible.
pub fn command_text(
    record: &ProcessRecord, depth: usize, basename_only: bool, h_scroll: usize,
) -> (String, Option<Range<usize>>) {
    let indent = INDENT.repeat(depth);
    let (command, basename) = if basename_only {
        let basename = record.basename();
        (basename, 0..basename.len())
    } else {
        (record.shell_cmd(), record.basename_range())
    };

    let full = concat_string!(indent, command);
    let visible = skip_columns(&full, h_scroll);
    let cut = full.len() - visible.len();

    let start = (indent.len() + basename.start).max(cut) - cut;
    let end = (indent.len() + basename.end).max(cut) - cut;
    let range = (start < end).then_some(start..end);

    (visible.to_string(), range)
}

/// The style a row gets before the cursor is applied. The current match wins, then the
/// locked process, then other matches, then processes owned by someone else.
pub fn row_style(
    styles: &Styles, record: &ProcessRecord, found: Option<Pid>, locked: Option<Pid>,
    query: Option<&str>, current_uid: Uid,
) -> Option<Style> {
    let pid = record.pid();
    if found == Some(pid) {
        Some(styles.search_style)
    } else if locked == Some(pid) {
        Some(styles.locked_style)
    } else if query.is_some_and(|query| !is_pid_query(query) && matches(record, query)) {
        Some(styles.search_alt_style)
    } else if record.uid != current_uid {
        Some(styles.not_owned_style)
    } else {
        None
    }
}

/// Builds the visible rows of the index. Long commands are clipped at the edge.
pub fn tree_lines(
    styles: &Styles, index: &ForestIndex<'_>, ui: &UiState, columns: Columns, current_uid: Uid,
) -> Vec<Line<'static>> {
    let search = ui.active_search();
    let found = search.and_then(|search| search.found);
    let query = search.map(|search| search.query.as_str());
    let rows = ui.viewport.visible(index.len());

    rows.filter_map(|row| {
        let record = index.from_index(row)?;
        let depth = index.depth(row)?;

        let process_type = columns
            .show_type
            .then(|| ProcessType::of(index.store(), record, current_uid));
        let prefix = columns.prefix(record, process_type);
        let (command, basename) = command_text(record, depth, ui.basename_only, ui.h_scroll);

        let style = row_style(styles, record, found, ui.locked, query, current_uid);
        let mut spans = vec![Span::raw(prefix)];

        match (style, basename) {
            (None, Some(range)) => {
                spans.push(Span::raw(command[..range.start].to_string()));
                spans.push(Span::styled(
                    command[range.clone()].to_string(),
                    styles.basename_style,
                ));
                spans.push(Span::raw(command[range.end..].to_string()));
            }
            _ => spans.push(Span::raw(command)),
        }

        let mut line = Line::from(spans).style(style.unwrap_or(styles.text_style));
        if row == ui.viewport.cursor {
            line = line.patch_style(styles.selected_style);
        }
        Some(line)
    })
    .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::collection::processes::ProcessSnapshot;

    fn record(pid: Pid, uid: Uid, command: &str) -> ProcessRecord {
        ProcessRecord::from_snapshot(
            ProcessSnapshot::new(pid, 1, "comm")
                .with_owner(uid, "alice")
                .with_command(command),
        )
    }

    #[test]
    fn headers() {
        assert_eq!(
            Columns::new(false, DisplayMode::Tree).header(),
            "    PID USER     S  NI  CPU% COMMAND"
        );
        assert_eq!(
            Columns::new(true, DisplayMode::Type).header(),
            "    PID S  CPU% TYPE    COMMAND"
        );
    }

    #[test]
    fn prefixes_line_up_with_headers() {
        let record = record(42, 1000, "/bin/sleep 10");
        let columns = Columns::new(false, DisplayMode::Tree);

        let prefix = columns.prefix(&record, None);
        assert_eq!(prefix.len(), columns.header().len() - "COMMAND".len());
        assert!(prefix.starts_with("     42 alice    "));

        let columns = Columns::new(true, DisplayMode::Type);
        let prefix = columns.prefix(&record, Some(ProcessType::Owned));
        assert_eq!(prefix.len(), columns.header().len() - "COMMAND".len());
        assert!(prefix.ends_with("owned   "));
    }

    #[test]
    fn command_with_indent() {
        let record = record(42, 1000, "/usr/sbin/sshd -D");

        let (text, range) = command_text(&record, 1, false, 0);
        assert_eq!(text, "    /usr/sbin/sshd -D");
        assert_eq!(&text[range.unwrap()], "sshd");

        let (text, range) = command_text(&record, 1, true, 0);
        assert_eq!(text, "    sshd");
        assert_eq!(&text[range.unwrap()], "sshd");
    }

    #[test]
    fn horizontal_scroll_shifts_the_basename() {
        let record = record(42, 1000, "/usr/sbin/sshd -D");

        let (text, range) = command_text(&record, 1, false, 6);
        assert_eq!(text, "sr/sbin/sshd -D");
        assert_eq!(&text[range.unwrap()], "sshd");

        let (text, range) = command_text(&record, 1, false, 16);
        assert_eq!(text, "hd -D");
        assert_eq!(&text[range.unwrap()], "hd");

        let (text, range) = command_text(&record, 1, false, 19);
        assert_eq!(text, "-D");
        assert_eq!(range, None);

        let (text, range) = command_text(&record, 1, false, 100);
        assert_eq!(text, "");
        assert_eq!(range, None);
    }

    #[test]
    fn style_precedence() {
        let styles = Styles::default();
        let mine = record(42, 1000, "/bin/sleep 10");
        let theirs = record(43, 0, "/bin/sleep 10");

        assert_eq!(
            row_style(&styles, &mine, Some(42), Some(42), Some("sleep"), 1000),
            Some(styles.search_style)
        );
        assert_eq!(
            row_style(&styles, &mine, Some(7), Some(42), Some("sleep"), 1000),
            Some(styles.locked_style)
        );
        assert_eq!(
            row_style(&styles, &theirs, Some(7), None, Some("sleep"), 1000),
            Some(styles.search_alt_style)
        );
        assert_eq!(
            row_style(&styles, &theirs, None, None, Some("vim"), 1000),
            Some(styles.not_owned_style)
        );
        assert_eq!(row_style(&styles, &mine, None, None, None, 1000), None);

        // A pid lookup only highlights the one match.
        assert_eq!(row_style(&styles, &mine, None, None, Some("42"), 1000), None);
    }
}
