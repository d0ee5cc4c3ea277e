//! Lesson API integration
//!
//! Provides the popup provider and submission endpoint, either over HTTP
//! or from an in-memory ledger for offline lessons and tests.

pub mod client;
pub mod error;
pub mod ledger;

use async_trait::async_trait;

use crate::lesson::{LessonId, PopupDefinition, PopupId, Submission, SubmissionPage, SubmissionRequest};

pub use client::ApiClient;
pub use error::ApiError;
pub use ledger::Ledger;

/// Source of lesson popups and sink for popup submissions
#[async_trait]
pub trait PopupService: Send + Sync {
    /// Active popups of a lesson, in scheduling order
    async fn lesson_popups(&self, lesson: &LessonId) -> Result<Vec<PopupDefinition>, ApiError>;

    /// Record a response to a popup
    async fn submit(
        &self,
        popup: &PopupId,
        request: &SubmissionRequest,
    ) -> Result<Submission, ApiError>;

    /// One page of the current user's submissions, newest first
    async fn submissions(&self, page: u32) -> Result<SubmissionPage, ApiError>;
}
