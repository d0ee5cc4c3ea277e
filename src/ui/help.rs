//! Keyboard help overlay

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::layout::centered_rect;
use crate::theme::Theme;

const BINDINGS: &[(&str, &str)] = &[
    ("space / k", "play or pause"),
    ("f", "toggle fullscreen"),
    ("m", "toggle mute"),
    ("\u{2190} / \u{2192}", "seek 5 seconds"),
    ("j / l", "seek 10 seconds"),
    ("\u{2191} / \u{2193}", "volume"),
    ("0-9", "jump to 0%-90%"),
    ("< / >", "playback speed"),
    ("?", "show or hide this help"),
    ("q", "quit"),
];

/// Draw the key bindings over the player
pub fn draw(frame: &mut Frame, area: Rect, theme: &Theme) {
    let overlay_area = centered_rect(50, 60, area);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
        .title(" Keys ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused))
        .style(Style::default().bg(theme.bg_secondary));

    let lines: Vec<Line> = BINDINGS
        .iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(
                    format!("{:>12}  ", keys),
                    Style::default().fg(theme.accent_primary).add_modifier(Modifier::BOLD),
                ),
                Span::styled(*action, Style::default().fg(theme.fg_secondary)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), overlay_area);
}
