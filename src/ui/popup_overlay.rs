//! Popup overlay component

use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::layout::centered_rect;
use crate::app::state::PopupPanelState;
use crate::lesson::PopupKind;
use crate::popups::ActivePopup;
use crate::theme::Theme;

/// Draw the active popup as a centered overlay
pub fn draw(
    frame: &mut Frame,
    area: Rect,
    popup: &ActivePopup,
    panel: &PopupPanelState,
    theme: &Theme,
) {
    let overlay_area = centered_rect(70, 60, area);
    frame.render_widget(Clear, overlay_area);

    let title = match (popup.title(), popup.kind()) {
        (Some(title), _) => format!(" {} ", title),
        (None, PopupKind::Quiz) => " Quiz ".to_string(),
        (None, PopupKind::Cta) => " ".to_string(),
    };

    let border_color = if popup.is_mandatory() { theme.warning } else { theme.border_focused };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(theme.bg_secondary));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let lines = match popup.kind() {
        PopupKind::Quiz => question_lines(popup, panel, theme),
        PopupKind::Cta => cta_lines(popup, theme),
    };
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn question_lines<'a>(popup: &'a ActivePopup, panel: &PopupPanelState, theme: &Theme) -> Vec<Line<'a>> {
    let mut lines = vec![
        Line::from(Span::styled(
            popup.content(),
            Style::default().fg(theme.fg_primary).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    for (i, option) in popup.answers().iter().enumerate() {
        let is_selected = i == panel.selected_option;
        let prefix = if is_selected { "\u{25CF}" } else { "\u{25CB}" }; // ● or ○
        let letter = (b'A' + (i % 26) as u8) as char;

        let style = if is_selected {
            Style::default().fg(theme.accent_primary).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.fg_secondary)
        };

        lines.push(Line::from(Span::styled(
            format!("  {} {}) {}", prefix, letter, option.text),
            style,
        )));
    }

    lines.push(Line::from(""));
    lines.extend(display_hint(popup, theme));
    lines.push(Line::from(Span::styled(
        "[j/k] Select    [Enter] Submit    [Esc] Close",
        Style::default().fg(theme.fg_muted),
    )));
    lines
}

fn cta_lines<'a>(popup: &'a ActivePopup, theme: &Theme) -> Vec<Line<'a>> {
    let mut lines = vec![
        Line::from(Span::styled(popup.content(), Style::default().fg(theme.fg_primary))),
        Line::from(""),
    ];
    lines.extend(display_hint(popup, theme));
    lines.push(
        Line::from(Span::styled("[Enter] Open    [Esc] Close", Style::default().fg(theme.fg_muted)))
            .alignment(Alignment::Center),
    );
    lines
}

/// Suggested display time, when the popup has one
fn display_hint<'a>(popup: &ActivePopup, theme: &Theme) -> Option<Line<'a>> {
    let seconds = popup.definition()?.display_seconds?;
    Some(Line::from(Span::styled(
        format!("Suggested time: {}s", seconds),
        Style::default().fg(theme.info),
    )))
}
