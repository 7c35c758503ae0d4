use itertools::Itertools;
use tui::style::Style;

use crate::{
    app::{InputMode, UiState, search::SearchDirection},
    canvas::styling::Styles,
};

const HINT: &str = "q quit  / search  i info  t view  d signal  r renice";

/// The text of the bottom line, and how to style it.
pub fn status_text(ui: &UiState, styles: &Styles) -> (String, Style) {
    match &ui.mode {
        InputMode::Search(search) => {
            let prefix = match search.direction {
                SearchDirection::Forward => '/',
                SearchDirection::Backward => '?',
            };
            let mut text = format!("{prefix}{}", search.query);
            if !search.query.is_empty() && search.found.is_none() {
                text.push_str("  (no match)");
            }
            (text, styles.prompt_style)
        }
        InputMode::Prompt { action, pid, input } => (
            format!(
                "{} {pid}: {}{input}",
                action.name(),
                action.prompt().unwrap_or_default()
            ),
            styles.prompt_style,
        ),
        InputMode::Confirm { action, pid } => {
            (format!("{} {pid}? [y/N]", action.name()), styles.prompt_style)
        }
        InputMode::Message(message) => {
            (format!("{message} (press any key)"), styles.error_style)
        }
        InputMode::Normal => {
            if let Some(status) = &ui.status {
                return (status.clone(), styles.text_style);
            }

            let indicators = [
                ui.frozen.then(|| "[frozen]".to_string()),
                ui.locked.map(|pid| format!("[locked {pid}]")),
            ]
            .into_iter()
            .flatten()
            .join(" ");

            if indicators.is_empty() {
                (HINT.to_string(), styles.text_style)
            } else {
                (indicators, styles.locked_style)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::app::{actions::Action, search::SearchState};

    #[test]
    fn modes() {
        let styles = Styles::default();
        let mut ui = UiState::default();
        assert_eq!(status_text(&ui, &styles).0, HINT);

        ui.frozen = true;
        ui.locked = Some(42);
        assert_eq!(status_text(&ui, &styles).0, "[frozen] [locked 42]");

        ui.status = Some("no locked process".into());
        assert_eq!(status_text(&ui, &styles).0, "no locked process");

        let mut search = SearchState::new(SearchDirection::Backward, 0);
        search.push('x');
        ui.mode = InputMode::Search(search);
        assert_eq!(status_text(&ui, &styles).0, "?x  (no match)");

        ui.mode = InputMode::Prompt {
            action: Action::Signal,
            pid: 42,
            input: "KILL".into(),
        };
        assert_eq!(status_text(&ui, &styles).0, "signal 42: Signal [TERM]: KILL");

        ui.mode = InputMode::Confirm {
            action: Action::Trace,
            pid: 42,
        };
        assert_eq!(status_text(&ui, &styles).0, "trace 42? [y/N]");

        ui.mode = InputMode::Message("no such process".into());
        let (text, style) = status_text(&ui, &styles);
        assert_eq!(text, "no such process (press any key)");
        assert_eq!(style, styles.error_style);
    }
}
