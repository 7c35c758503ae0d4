//! Draws the app: summary header, column header, process rows, and the status line.

pub mod drawing_utils;
pub mod header;
pub mod info_panel;
pub mod process_tree;
pub mod status_line;
pub mod styling;

use time::{
    OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};
use tui::{
    Frame,
    layout::{Constraint, Layout},
    text::Line,
    widgets::Paragraph,
};

use crate::{
    app::App,
    canvas::{
        header::header_lines,
        process_tree::{Columns, tree_lines},
        status_line::status_text,
        styling::Styles,
    },
    utils::strings::truncate_to_width,
};

const CLOCK_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");

/// Handles the canvas' state.
pub struct Painter {
    pub styles: Styles,
    /// Captured once at startup, since it can't be read safely once other threads exist.
    local_offset: UtcOffset,
}

impl Painter {
    pub fn init(styles: Styles, local_offset: UtcOffset) -> Self {
        Painter {
            styles,
            local_offset,
        }
    }

    /// Draws one frame. The process area decides the viewport height, so this takes the
    /// app mutably.
    pub fn draw(&self, f: &mut Frame<'_>, app: &mut App) {
        let now = OffsetDateTime::now_utc().to_offset(self.local_offset);
        let clock = now.format(CLOCK_FORMAT).unwrap_or_default();
        let header = header_lines(&app.snapshot, &clock, now.unix_timestamp().max(0) as u64);

        let [header_area, columns_area, tree_area, status_area] = Layout::vertical([
            Constraint::Length(header.len() as u16),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(f.area());

        let width = f.area().width as usize;
        let header: Vec<Line<'_>> = header
            .into_iter()
            .map(|line| Line::styled(truncate_to_width(&line, width), self.styles.header_style))
            .collect();
        f.render_widget(Paragraph::new(header), header_area);

        let columns = Columns::new(app.config.thin, app.ui.display);
        f.render_widget(
            Paragraph::new(Line::styled(
                format!("{:<width$}", columns.header()),
                self.styles.table_header_style,
            )),
            columns_area,
        );

        let height = tree_area.height as usize;
        if height != app.ui.viewport.height() {
            let total = app.index().len();
            app.ui.viewport.set_height(height, total);
        }

        let index = app.index();
        let lines = tree_lines(&self.styles, &index, &app.ui, columns, app.current_uid());
        f.render_widget(Paragraph::new(lines), tree_area);

        if app.ui.show_info {
            if let Some(record) = index.from_index(app.ui.viewport.cursor) {
                self.draw_info_panel(f, record, tree_area);
            }
        }

        let (status, style) = status_text(&app.ui, &self.styles);
        f.render_widget(
            Paragraph::new(Line::styled(truncate_to_width(&status, width), style)),
            status_area,
        );
    }
}
