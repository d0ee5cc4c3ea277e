//! Key mapping for the player and popup overlay

use crossterm::event::{KeyCode, KeyModifiers};

use crate::player::Shortcut;
use crate::player::controller::{LONG_SEEK_SECONDS, SHORT_SEEK_SECONDS, VOLUME_STEP};

/// Playback rates cycled by `<` and `>`
pub const PLAYBACK_RATES: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// Actions available while no popup is showing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Player(Shortcut),
    SlowerRate,
    FasterRate,
    ToggleHelp,
    Quit,
}

/// Actions available while a popup is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupAction {
    Up,
    Down,
    /// Submit the selected answer, or open a call to action
    Confirm,
    Dismiss,
    Quit,
}

/// Map a key to a player action
pub fn player_key_to_action(key: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match key {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    let shortcut = match key {
        KeyCode::Char(' ') | KeyCode::Char('k') => Shortcut::TogglePlay,
        KeyCode::Char('f') => Shortcut::ToggleFullscreen,
        KeyCode::Char('m') => Shortcut::ToggleMute,
        KeyCode::Left => Shortcut::SeekBy(-SHORT_SEEK_SECONDS),
        KeyCode::Right => Shortcut::SeekBy(SHORT_SEEK_SECONDS),
        KeyCode::Char('j') => Shortcut::SeekBy(-LONG_SEEK_SECONDS),
        KeyCode::Char('l') => Shortcut::SeekBy(LONG_SEEK_SECONDS),
        KeyCode::Up => Shortcut::VolumeBy(VOLUME_STEP),
        KeyCode::Down => Shortcut::VolumeBy(-VOLUME_STEP),
        KeyCode::Char(c) if c.is_ascii_digit() => Shortcut::SeekToDigit(c as u8 - b'0'),
        KeyCode::Char('<') => return Some(Action::SlowerRate),
        KeyCode::Char('>') => return Some(Action::FasterRate),
        KeyCode::Char('?') => return Some(Action::ToggleHelp),
        KeyCode::Char('q') => return Some(Action::Quit),
        _ => return None,
    };
    Some(Action::Player(shortcut))
}

/// Map a key to a popup action
pub fn popup_key_to_action(key: KeyCode, modifiers: KeyModifiers) -> Option<PopupAction> {
    if modifiers.contains(KeyModifiers::CONTROL) && key == KeyCode::Char('c') {
        return Some(PopupAction::Quit);
    }
    match key {
        KeyCode::Char('k') | KeyCode::Up => Some(PopupAction::Up),
        KeyCode::Char('j') | KeyCode::Down => Some(PopupAction::Down),
        KeyCode::Enter => Some(PopupAction::Confirm),
        KeyCode::Esc => Some(PopupAction::Dismiss),
        KeyCode::Char('q') => Some(PopupAction::Quit),
        _ => None,
    }
}

/// Next rate in [`PLAYBACK_RATES`], staying at the ends
pub fn step_rate(current: f64, faster: bool) -> f64 {
    let index = PLAYBACK_RATES
        .iter()
        .position(|rate| (rate - current).abs() < f64::EPSILON)
        .unwrap_or(2);
    let next = if faster {
        (index + 1).min(PLAYBACK_RATES.len() - 1)
    } else {
        index.saturating_sub(1)
    };
    PLAYBACK_RATES[next]
}
