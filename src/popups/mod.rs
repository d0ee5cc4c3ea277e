//! Timed popups over video playback
//!
//! [`PopupScheduler`] decides when a popup appears and disappears. It never
//! sleeps: deferred work is handed back to the caller as tickets, which the
//! caller fires once their deadline passes. Tickets carry the generation they
//! were issued in and are discarded if the scheduler has moved on.

pub mod active;
pub mod scheduler;

use std::time::Duration;

use crate::lesson::PopupId;

pub use active::{ActivePopup, PopupSource, TrailingPopup};
pub use scheduler::{Dismissal, MatchTicket, PopupScheduler, ResumeTicket};

/// Evaluations closer together than this are skipped
pub const MIN_EVALUATION_INTERVAL: Duration = Duration::from_millis(500);

/// Delay between accepting an evaluation and matching
pub const MATCH_DEBOUNCE: Duration = Duration::from_millis(100);

/// Delay before playback resumes after a popup closes
pub const RESUME_DELAY: Duration = Duration::from_millis(100);

/// Distance in seconds from `appear_at` that still counts as a hit
pub const MATCH_TOLERANCE_SECONDS: f64 = 0.75;

/// Remaining seconds during which the trailing popup is offered
pub const TRAILING_WINDOW_START: f64 = 8.0;
pub const TRAILING_WINDOW_END: f64 = 10.0;

/// Popups the user has dealt with in this session, in answer order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnsweredSet {
    ids: Vec<PopupId>,
}

impl AnsweredSet {
    /// Add an id; returns `false` if it was already present
    pub fn insert(&mut self, id: PopupId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn contains(&self, id: &PopupId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PopupId> {
        self.ids.iter()
    }
}
