use tui::{
    style::{Color, Modifier, Style},
    widgets::BorderType,
};

/// The styles used when drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Styles {
    pub text_style: Style,
    pub header_style: Style,
    pub table_header_style: Style,
    /// The row under the cursor. Patched over the row's own style.
    pub selected_style: Style,
    /// The current search match.
    pub search_style: Style,
    pub locked_style: Style,
    /// Rows that match the query but aren't the current match.
    pub search_alt_style: Style,
    pub not_owned_style: Style,
    pub basename_style: Style,
    pub error_style: Style,
    pub prompt_style: Style,
    pub border_style: Style,
    pub border_type: BorderType,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            text_style: Style::default(),
            header_style: Style::default().fg(Color::Cyan),
            table_header_style: Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED),
            selected_style: Style::default().add_modifier(Modifier::REVERSED),
            search_style: Style::default().fg(Color::Black).bg(Color::Yellow),
            locked_style: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            search_alt_style: Style::default().fg(Color::Yellow),
            not_owned_style: Style::default().fg(Color::DarkGray),
            basename_style: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            error_style: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            prompt_style: Style::default().fg(Color::Yellow),
            border_style: Style::default().fg(Color::Gray),
            border_type: BorderType::Plain,
        }
    }
}
