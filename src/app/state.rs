//! Application state definitions

use crate::player::{PlaybackSnapshot, PlayerSdk, PlayerState, Transport};
use crate::popups::ActivePopup;
use crate::session::{LessonSession, SubmitOutcome};

/// Front-end state that is not owned by the session
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Title shown above the player
    pub lesson_title: String,
    pub popup: PopupPanelState,
    pub status: StatusLine,
    pub show_help: bool,
}

/// Selection inside the popup overlay
#[derive(Debug, Clone, Default)]
pub struct PopupPanelState {
    pub selected_option: usize,
}

impl PopupPanelState {
    pub fn reset(&mut self) {
        self.selected_option = 0;
    }

    pub fn select_next(&mut self, option_count: usize) {
        if option_count > 0 {
            self.selected_option = (self.selected_option + 1).min(option_count - 1);
        }
    }

    pub fn select_previous(&mut self) {
        self.selected_option = self.selected_option.saturating_sub(1);
    }
}

/// Message shown at the bottom of the screen
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    pub message: Option<String>,
    pub is_error: bool,
}

impl StatusLine {
    pub fn info(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        self.is_error = false;
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        self.is_error = true;
    }

    /// Report a submission outcome; silent ones leave the line unchanged
    pub fn report(&mut self, outcome: &SubmitOutcome) {
        let text = outcome.describe();
        if text.is_empty() {
            return;
        }
        if outcome.is_error() { self.error(text) } else { self.info(text) }
    }
}

/// A scheduled popup on the progress bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub at_seconds: f64,
    pub answered: bool,
}

/// Everything the renderer needs from the session, captured once per frame
#[derive(Debug, Clone, Default)]
pub struct PlayerView {
    pub snapshot: PlaybackSnapshot,
    pub state: PlayerState,
    pub loading: bool,
    pub loading_failed: bool,
    pub volume: f64,
    pub muted: bool,
    pub fullscreen: bool,
    pub playback_rate: f64,
    pub markers: Vec<Marker>,
    pub popup: Option<ActivePopup>,
}

impl PlayerView {
    pub fn capture<S: PlayerSdk>(session: &LessonSession<S>) -> Self {
        let adapter = session.adapter();
        let controller = session.controller();
        let scheduler = session.scheduler();

        let markers = scheduler
            .popups()
            .iter()
            .map(|popup| Marker {
                at_seconds: popup.appear_at_seconds,
                answered: scheduler.answered().contains(&popup.id),
            })
            .collect();

        Self {
            snapshot: adapter.snapshot(),
            state: adapter.player_state(),
            loading: adapter.is_loading(),
            loading_failed: adapter.loading_failed(),
            volume: controller.volume(),
            muted: controller.is_muted(),
            fullscreen: controller.is_fullscreen(),
            playback_rate: controller.playback_rate(),
            markers,
            popup: session.active_popup().cloned(),
        }
    }
}
