//! The popup currently on screen

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::lesson::{PopupDefinition, PopupId, PopupKind, QuizOption};

/// Fixed prompt offered shortly before the video ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailingPopup {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_trailing_kind")]
    pub kind: PopupKind,
}

fn default_trailing_kind() -> PopupKind {
    PopupKind::Cta
}

impl TrailingPopup {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), title: None, kind: PopupKind::Cta }
    }
}

/// What the overlay is showing
#[derive(Debug, Clone, PartialEq)]
pub enum PopupSource {
    /// A popup scheduled by the lesson
    Scheduled(PopupDefinition),
    /// The synthetic end-of-video prompt
    Trailing(TrailingPopup),
}

/// The single popup being displayed
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePopup {
    pub source: PopupSource,
    /// When the popup appeared, for response timing
    pub shown_at: Instant,
    /// Whether showing it paused playback
    pub paused_playback: bool,
}

impl ActivePopup {
    /// Identity of a scheduled popup; trailing popups have none
    pub fn id(&self) -> Option<&PopupId> {
        match &self.source {
            PopupSource::Scheduled(popup) => Some(&popup.id),
            PopupSource::Trailing(_) => None,
        }
    }

    pub fn kind(&self) -> PopupKind {
        match &self.source {
            PopupSource::Scheduled(popup) => popup.kind,
            PopupSource::Trailing(trailing) => trailing.kind,
        }
    }

    /// Trailing popups are always dismissible
    pub fn is_mandatory(&self) -> bool {
        match &self.source {
            PopupSource::Scheduled(popup) => popup.mandatory,
            PopupSource::Trailing(_) => false,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match &self.source {
            PopupSource::Scheduled(popup) => {
                Some(popup.title.as_str()).filter(|title| !title.is_empty())
            }
            PopupSource::Trailing(trailing) => trailing.title.as_deref(),
        }
    }

    pub fn content(&self) -> &str {
        match &self.source {
            PopupSource::Scheduled(popup) => &popup.content,
            PopupSource::Trailing(trailing) => &trailing.content,
        }
    }

    /// Answers to choose from, empty unless this is a scheduled quiz
    pub fn answers(&self) -> &[QuizOption] {
        match &self.source {
            PopupSource::Scheduled(popup) => popup.options.answers(),
            PopupSource::Trailing(_) => &[],
        }
    }

    /// The scheduled definition, if any
    pub fn definition(&self) -> Option<&PopupDefinition> {
        match &self.source {
            PopupSource::Scheduled(popup) => Some(popup),
            PopupSource::Trailing(_) => None,
        }
    }

    /// Whole seconds since the popup appeared
    pub fn response_time_seconds(&self, now: Instant) -> u32 {
        now.saturating_duration_since(self.shown_at).as_secs().min(u64::from(u32::MAX)) as u32
    }
}
