//! Video area, progress bar and transport state

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::layout::format_time;
use crate::app::state::{Marker, PlayerView};
use crate::player::PlayerState;
use crate::theme::Theme;

/// What one column of the progress bar shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarCell {
    Played,
    Buffered,
    Empty,
    /// A scheduled popup falls in this column
    Marker { answered: bool },
}

/// Draw the player panel
pub fn draw(frame: &mut Frame, area: Rect, view: &PlayerView, title: &str, theme: &Theme) {
    let inner = if view.fullscreen {
        area
    } else {
        let block = Block::default()
            .title(format!(" {} ", title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border))
            .style(Style::default().bg(theme.bg_primary));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        inner
    };

    let [screen, bar, transport] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1), Constraint::Length(1)])
            .areas(inner);

    draw_screen(frame, screen, view, theme);
    draw_progress(frame, bar, view, theme);
    draw_transport(frame, transport, view, theme);
}

fn draw_screen(frame: &mut Frame, area: Rect, view: &PlayerView, theme: &Theme) {
    let (glyph, caption, color) = if view.loading_failed {
        ("\u{2716}", "The video could not be loaded", theme.error) // ✖
    } else if view.loading {
        ("\u{2026}", "Loading video", theme.fg_muted) // …
    } else if view.snapshot.has_ended {
        ("\u{21BA}", "Press space to watch again", theme.fg_secondary) // ↺
    } else {
        match view.state {
            PlayerState::Playing => ("\u{25B6}", "", theme.accent_primary), // ▶
            PlayerState::Buffering => ("\u{2026}", "Buffering", theme.fg_muted),
            _ => ("\u{275A}\u{275A}", "Paused", theme.fg_secondary), // ❚❚
        }
    };

    let top_padding = area.height.saturating_sub(2) / 2;
    let mut lines: Vec<Line> = (0..top_padding).map(|_| Line::from("")).collect();
    lines.push(Line::from(Span::styled(
        glyph,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(caption, Style::default().fg(theme.fg_muted))));

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn draw_progress(frame: &mut Frame, area: Rect, view: &PlayerView, theme: &Theme) {
    let snapshot = &view.snapshot;
    let cells = progress_cells(
        area.width as usize,
        snapshot.current_time_seconds,
        snapshot.duration_seconds,
        snapshot.buffered_fraction,
        &view.markers,
    );

    let spans: Vec<Span> = cells
        .into_iter()
        .map(|cell| match cell {
            BarCell::Played => Span::styled("\u{2501}", Style::default().fg(theme.progress_played)),
            BarCell::Buffered => {
                Span::styled("\u{2501}", Style::default().fg(theme.progress_buffered))
            }
            BarCell::Empty => Span::styled("\u{2500}", Style::default().fg(theme.border)),
            BarCell::Marker { answered: false } => {
                Span::styled("\u{25C6}", Style::default().fg(theme.popup_marker))
            }
            BarCell::Marker { answered: true } => {
                Span::styled("\u{25C7}", Style::default().fg(theme.fg_muted))
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_transport(frame: &mut Frame, area: Rect, view: &PlayerView, theme: &Theme) {
    let icon = if view.state == PlayerState::Playing { "\u{25B6}" } else { "\u{275A}\u{275A}" };
    let volume = if view.muted {
        "muted".to_string()
    } else {
        format!("vol {:.0}%", view.volume * 100.0)
    };

    let mut spans = vec![
        Span::styled(format!(" {} ", icon), Style::default().fg(theme.accent_primary)),
        Span::styled(
            format!(
                "{} / {}",
                format_time(view.snapshot.current_time_seconds),
                format_time(view.snapshot.duration_seconds)
            ),
            Style::default().fg(theme.fg_primary),
        ),
        Span::styled(format!("   {}", volume), Style::default().fg(theme.fg_secondary)),
    ];
    if (view.playback_rate - 1.0).abs() > f64::EPSILON {
        spans.push(Span::styled(
            format!("   {}x", view.playback_rate),
            Style::default().fg(theme.accent_secondary),
        ));
    }
    if view.fullscreen {
        spans.push(Span::styled("   [f] exit fullscreen", Style::default().fg(theme.fg_muted)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Lay out the progress bar over `width` columns
///
/// Each column covers an equal slice of the video and is judged by its
/// midpoint. Markers take precedence over playback progress.
pub fn progress_cells(
    width: usize,
    current_seconds: f64,
    duration_seconds: f64,
    buffered_fraction: f64,
    markers: &[Marker],
) -> Vec<BarCell> {
    if width == 0 {
        return Vec::new();
    }
    if duration_seconds <= 0.0 {
        return vec![BarCell::Empty; width];
    }

    let slice = duration_seconds / width as f64;
    let buffered_seconds = buffered_fraction.clamp(0.0, 1.0) * duration_seconds;

    (0..width)
        .map(|column| {
            let start = column as f64 * slice;
            let end = start + slice;
            if let Some(marker) =
                markers.iter().find(|m| m.at_seconds >= start && m.at_seconds < end)
            {
                return BarCell::Marker { answered: marker.answered };
            }

            let midpoint = start + slice / 2.0;
            if midpoint <= current_seconds {
                BarCell::Played
            } else if midpoint <= buffered_seconds {
                BarCell::Buffered
            } else {
                BarCell::Empty
            }
        })
        .collect()
}
