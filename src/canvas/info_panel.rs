use std::time::Duration;

use tui::{
    Frame,
    layout::Rect,
    text::Line,
    widgets::{Clear, Paragraph},
};

use crate::{
    app::store::ProcessRecord,
    canvas::{
        Painter,
        drawing_utils::{dialog_block, top_right},
    },
    utils::data_units::binary_bytes_string,
};

const PANEL_WIDTH: u16 = 48;

/// The details shown for the selected process.
pub fn info_lines(record: &ProcessRecord) -> Vec<String> {
    let cpu_time = Duration::from_secs(record.total_cpu_time().as_secs());

    let mut lines = vec![
        format!("PID: {}  PPID: {}", record.pid(), record.ppid()),
        format!("Command: {}", record.basename()),
        format!("User: {} ({})", record.user, record.uid),
        format!("Group: {} ({})", record.group, record.gid),
        format!("State: {}", record.state.name()),
        format!("TTY: {}", record.tty.as_deref().unwrap_or("?")),
        format!("Nice: {}", record.nice),
        format!("CPU: {:.1}%", record.cpu_percent),
        format!("CPU time: {}", humantime::format_duration(cpu_time)),
        format!("Memory: {}", binary_bytes_string(record.mem_bytes)),
        format!("Children: {}", record.children().len()),
    ];
    if let Some(jail) = record.jail_id {
        lines.push(format!("Jail: {jail}"));
    }

    lines
}

impl Painter {
    pub fn draw_info_panel(&self, f: &mut Frame<'_>, record: &ProcessRecord, area: Rect) {
        let lines: Vec<Line<'_>> = info_lines(record)
            .into_iter()
            .map(|line| Line::styled(line, self.styles.text_style))
            .collect();

        let height = lines.len() as u16 + 2;
        let panel = top_right(area, PANEL_WIDTH, height);

        let block = dialog_block(self.styles.border_type)
            .border_style(self.styles.border_style)
            .title_top(Line::styled(" Info ", self.styles.header_style));

        f.render_widget(Clear, panel);
        f.render_widget(Paragraph::new(lines).block(block), panel);
    }
}
