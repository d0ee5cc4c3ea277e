//! UI rendering components

pub mod help;
pub mod layout;
pub mod player_panel;
pub mod popup_overlay;
pub mod status_line;

use ratatui::{
    Frame,
    layout::{Constraint, Layout},
    style::Style,
    widgets::Block,
};

use crate::app::state::{AppState, PlayerView};
use crate::theme::Theme;

/// Main draw function
pub fn draw(frame: &mut Frame, view: &PlayerView, state: &AppState, theme: &Theme) {
    let area = frame.area();
    frame.render_widget(Block::default().style(Style::default().bg(theme.bg_primary)), area);

    // Fullscreen drops the status line
    let player_area = if view.fullscreen {
        area
    } else {
        let [player_area, status_area] =
            Layout::vertical([Constraint::Min(5), Constraint::Length(1)]).areas(area);
        status_line::draw(frame, status_area, &state.status, theme);
        player_area
    };

    player_panel::draw(frame, player_area, view, &state.lesson_title, theme);

    if let Some(popup) = &view.popup {
        popup_overlay::draw(frame, player_area, popup, &state.popup, theme);
    } else if state.show_help {
        help::draw(frame, player_area, theme);
    }
}
