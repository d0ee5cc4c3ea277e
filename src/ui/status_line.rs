//! Status line at the bottom of the screen

use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::app::state::StatusLine;
use crate::theme::Theme;

/// Shown when there is nothing to report
const IDLE_HINT: &str = "space play/pause  \u{2190}\u{2192} seek  \u{2191}\u{2193} volume  ? help  q quit";

/// Draw the status line
pub fn draw(frame: &mut Frame, area: Rect, state: &StatusLine, theme: &Theme) {
    let line = status_text(state, theme);
    frame.render_widget(Paragraph::new(line), area);
}

fn status_text<'a>(state: &'a StatusLine, theme: &Theme) -> Line<'a> {
    match state.message.as_deref() {
        Some(message) => {
            let color = if state.is_error { theme.error } else { theme.success };
            Line::from(Span::styled(message, Style::default().fg(color)))
        }
        None => Line::from(Span::styled(IDLE_HINT, Style::default().fg(theme.fg_muted))),
    }
}
