//! Recording popup responses with the lesson API

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, PopupService};
use crate::lesson::{
    FieldErrors, LessonId, PopupDefinition, PopupResponse, Submission, SubmissionPage,
    SubmissionRequest,
};
use crate::popups::ActivePopup;

/// What happened to a submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Stored by the API
    Recorded(Submission),
    /// The user answered this quiz before
    AlreadySubmitted(String),
    /// Payload rejected with field-level messages
    Rejected(FieldErrors),
    /// Request failed; the popup stays open so the user can retry
    Failed { message: String, retryable: bool },
    /// The popup has no identity to record against
    Unrecorded,
}

impl SubmitOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }

    /// One-line description for the status bar
    pub fn describe(&self) -> String {
        match self {
            Self::Recorded(submission) => match submission.is_correct {
                Some(true) => "Correct!".to_string(),
                Some(false) => "Not quite. Answer recorded.".to_string(),
                None => "Response recorded".to_string(),
            },
            Self::AlreadySubmitted(message) => message.clone(),
            Self::Rejected(errors) => errors.summary(),
            Self::Failed { message, retryable: true } => format!("{} (press Enter to retry)", message),
            Self::Failed { message, .. } => message.clone(),
            Self::Unrecorded => String::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::AlreadySubmitted(_) | Self::Rejected(_) | Self::Failed { .. })
    }
}

/// Talks to the popup provider and submission endpoint
#[derive(Clone)]
pub struct SubmissionReporter {
    service: Arc<dyn PopupService>,
}

impl SubmissionReporter {
    pub fn new(service: Arc<dyn PopupService>) -> Self {
        Self { service }
    }

    /// Popups of a lesson; failures are logged and yield an empty list
    pub async fn fetch_popups(&self, lesson: &LessonId) -> Vec<PopupDefinition> {
        match self.service.lesson_popups(lesson).await {
            Ok(popups) => popups,
            Err(e) => {
                tracing::error!("Error fetching video popups for lesson {}: {}", lesson, e);
                Vec::new()
            }
        }
    }

    /// Submit a response to the popup that is showing
    pub async fn submit(&self, popup: &ActivePopup, response: PopupResponse, now: Instant) -> SubmitOutcome {
        let Some(id) = popup.id() else {
            return SubmitOutcome::Unrecorded;
        };

        let request = SubmissionRequest::new(popup.kind(), response)
            .with_response_time(Some(popup.response_time_seconds(now)));

        match self.service.submit(id, &request).await {
            Ok(submission) => {
                tracing::info!("Recorded {} submission for popup {}", popup.kind(), id);
                SubmitOutcome::Recorded(submission)
            }
            Err(ApiError::Conflict { message }) => {
                tracing::info!("Popup {} was already answered", id);
                SubmitOutcome::AlreadySubmitted(message)
            }
            Err(ApiError::Validation(errors)) => {
                tracing::warn!("Submission for popup {} rejected: {}", id, errors.summary());
                SubmitOutcome::Rejected(errors)
            }
            Err(e) => {
                tracing::error!("Error submitting popup {}: {}", id, e);
                SubmitOutcome::Failed { message: e.to_string(), retryable: e.is_recoverable() }
            }
        }
    }

    /// One page of the user's past submissions
    pub async fn history(&self, page: u32) -> Result<SubmissionPage, ApiError> {
        self.service.submissions(page.max(1)).await
    }

    /// Prepare a cancellable popup fetch for `lesson`
    pub fn fetch(&self, lesson: LessonId, cancel: CancellationToken) -> PopupFetch {
        PopupFetch { lesson, cancel, reporter: self.clone() }
    }
}

/// A popup fetch that can be abandoned when the lesson changes
pub struct PopupFetch {
    lesson: LessonId,
    cancel: CancellationToken,
    reporter: SubmissionReporter,
}

/// Result of a [`PopupFetch`]
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPopups {
    pub lesson: LessonId,
    pub popups: Vec<PopupDefinition>,
    pub cancelled: bool,
}

impl PopupFetch {
    pub fn lesson(&self) -> &LessonId {
        &self.lesson
    }

    pub async fn run(self) -> FetchedPopups {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::debug!("Popup fetch for lesson {} cancelled", self.lesson);
                FetchedPopups { lesson: self.lesson.clone(), popups: Vec::new(), cancelled: true }
            }
            popups = self.reporter.fetch_popups(&self.lesson) => {
                FetchedPopups { lesson: self.lesson.clone(), popups, cancelled: false }
            }
        }
    }
}
