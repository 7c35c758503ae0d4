use tui::{
    layout::{Constraint, Layout, Rect},
    widgets::{Block, BorderType, Borders},
};

/// Return a dialog block.
pub fn dialog_block(border_type: BorderType) -> Block<'static> {
    Block::default()
        .border_type(border_type)
        .borders(Borders::all())
}

/// A rectangle of at most `width` by `height` in the top right of `area`.
pub fn top_right(area: Rect, width: u16, height: u16) -> Rect {
    let [_, right] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(width.min(area.width))])
            .areas(area);
    let [top, _] =
        Layout::vertical([Constraint::Length(height.min(area.height)), Constraint::Min(0)])
            .areas(right);

    top
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn top_right_fits() {
        let area = Rect::new(0, 0, 80, 24);

        assert_eq!(top_right(area, 30, 10), Rect::new(50, 0, 30, 10));
        assert_eq!(top_right(area, 100, 100), area);
    }
}
