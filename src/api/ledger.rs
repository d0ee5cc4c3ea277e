//! In-memory popup provider and submission store
//!
//! Mirrors the server's submission rules so lessons can be played offline
//! from a fixture file, and gives tests a deterministic backend.

use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::PopupService;
use super::error::ApiError;
use crate::lesson::{
    FieldErrors, LessonId, PageMeta, PopupDefinition, PopupId, PopupKind, PopupRecord, Submission,
    SubmissionPage, SubmissionRequest, active_definitions,
};

/// Submissions per history page
const PAGE_SIZE: usize = 15;

/// A lesson as described in a fixture file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonFixture {
    pub id: LessonId,
    #[serde(default)]
    pub title: String,
    /// Video length used by the simulated player
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub popups: Vec<PopupRecord>,
}

/// Top-level fixture file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    pub lessons: Vec<LessonFixture>,
}

/// Stored lesson with its converted popups
#[derive(Debug, Clone)]
struct LessonEntry {
    fixture: LessonFixture,
    popups: Vec<PopupDefinition>,
}

/// Offline lesson API
#[derive(Debug)]
pub struct Ledger {
    /// Identity submissions are recorded under
    user: String,
    lessons: Vec<LessonEntry>,
    submissions: Mutex<Vec<Submission>>,
}

impl Ledger {
    /// Create an empty ledger for `user`
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into(), lessons: Vec::new(), submissions: Mutex::new(Vec::new()) }
    }

    /// Load lessons from a fixture file
    pub fn from_fixture(path: &Path, user: impl Into<String>) -> Result<Self, ApiError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ApiError::FixtureError {
            path: path.display().to_string(),
            source,
        })?;
        let fixture: Fixture = serde_json::from_str(&contents)?;

        let mut ledger = Self::new(user);
        for lesson in fixture.lessons {
            ledger.add_lesson(lesson);
        }
        tracing::info!("Loaded {} lessons from {}", ledger.lessons.len(), path.display());
        Ok(ledger)
    }

    /// Add or replace a lesson
    pub fn add_lesson(&mut self, fixture: LessonFixture) {
        let popups = active_definitions(fixture.popups.clone());
        self.lessons.retain(|entry| entry.fixture.id != fixture.id);
        self.lessons.push(LessonEntry { fixture, popups });
    }

    /// Add a lesson from already-built definitions
    pub fn with_lesson(
        mut self,
        id: impl Into<String>,
        duration_seconds: f64,
        popups: Vec<PopupDefinition>,
    ) -> Self {
        let fixture = LessonFixture {
            id: LessonId::new(id),
            title: String::new(),
            duration_seconds: Some(duration_seconds),
            popups: popups.iter().map(PopupRecord::from).collect(),
        };
        self.add_lesson(fixture);
        self
    }

    /// Look up a lesson's fixture
    pub fn lesson(&self, id: &LessonId) -> Option<&LessonFixture> {
        self.lessons.iter().find(|entry| &entry.fixture.id == id).map(|entry| &entry.fixture)
    }

    /// All lessons, in fixture order
    pub fn lessons(&self) -> impl Iterator<Item = &LessonFixture> {
        self.lessons.iter().map(|entry| &entry.fixture)
    }

    fn find_popup(&self, id: &PopupId) -> Option<(&LessonId, &PopupDefinition)> {
        self.lessons.iter().find_map(|entry| {
            entry.popups.iter().find(|p| &p.id == id).map(|p| (&entry.fixture.id, p))
        })
    }

    /// Number of stored submissions
    pub fn submission_count(&self) -> usize {
        self.submissions.lock().map(|s| s.len()).unwrap_or(0)
    }
}

fn now_timestamp() -> String {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0).to_string()
}

#[async_trait]
impl PopupService for Ledger {
    async fn lesson_popups(&self, lesson: &LessonId) -> Result<Vec<PopupDefinition>, ApiError> {
        self.lessons
            .iter()
            .find(|entry| &entry.fixture.id == lesson)
            .map(|entry| entry.popups.clone())
            .ok_or_else(|| ApiError::NotFound(format!("lesson {}", lesson)))
    }

    async fn submit(
        &self,
        popup_id: &PopupId,
        request: &SubmissionRequest,
    ) -> Result<Submission, ApiError> {
        request.validate().map_err(ApiError::Validation)?;

        let (lesson_id, popup) = self
            .find_popup(popup_id)
            .ok_or_else(|| ApiError::NotFound(format!("popup {}", popup_id)))?;

        if request.kind != popup.kind {
            let mut errors = FieldErrors::default();
            errors.add("type", "The selected type is invalid.");
            return Err(ApiError::Validation(errors));
        }

        let mut submissions = self.submissions.lock().map_err(|_| ApiError::ApiError {
            status: 500,
            message: "submission store poisoned".to_string(),
        })?;

        let (answer, is_correct) = match popup.kind {
            // Call-to-action interactions are always recorded
            PopupKind::Cta => (request.action.map(|a| a.as_str().to_string()), None),
            PopupKind::Quiz => {
                let user = serde_json::Value::String(self.user.clone());
                let duplicate = submissions.iter().any(|s| {
                    s.popup_id.as_ref() == Some(popup_id) && s.user_id.as_ref() == Some(&user)
                });
                if duplicate {
                    return Err(ApiError::already_submitted());
                }
                let is_correct = request.selected_id().and_then(|selected| popup.grade(selected));
                (request.answer.clone(), is_correct)
            }
        };

        let submission = Submission {
            id: format!("sub-{}", submissions.len() + 1),
            user_id: Some(serde_json::Value::String(self.user.clone())),
            popup_id: Some(popup_id.clone()),
            lesson_id: Some(lesson_id.to_string()),
            answer,
            answer_data: match popup.kind {
                PopupKind::Quiz => request.answer_data.clone(),
                PopupKind::Cta => None,
            },
            is_correct,
            responded_at: Some(now_timestamp()),
            response_time_seconds: request.response_time_seconds,
        };

        tracing::info!(
            "Recorded {} submission for popup {} (correct: {:?})",
            popup.kind,
            popup_id,
            is_correct
        );
        submissions.push(submission.clone());
        Ok(submission)
    }

    async fn submissions(&self, page: u32) -> Result<SubmissionPage, ApiError> {
        let submissions = self.submissions.lock().map_err(|_| ApiError::ApiError {
            status: 500,
            message: "submission store poisoned".to_string(),
        })?;

        let user = serde_json::Value::String(self.user.clone());
        let mine: Vec<&Submission> =
            submissions.iter().rev().filter(|s| s.user_id.as_ref() == Some(&user)).collect();

        let page = page.max(1);
        let total = mine.len();
        let last_page = total.div_ceil(PAGE_SIZE).max(1);
        let data = mine
            .into_iter()
            .skip((page as usize - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .cloned()
            .collect();

        Ok(SubmissionPage {
            data,
            meta: PageMeta {
                current_page: page,
                last_page: last_page as u32,
                per_page: PAGE_SIZE as u32,
                total: total as u32,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::{CtaAction, OptionId, PopupResponse, QuizOption};

    fn quiz() -> PopupDefinition {
        PopupDefinition::quiz(
            "quiz-1",
            30.0,
            true,
            vec![
                QuizOption { id: OptionId::from(1), text: "No".into(), is_correct: false },
                QuizOption { id: OptionId::from(2), text: "Yes".into(), is_correct: true },
            ],
        )
    }

    fn ledger() -> Ledger {
        Ledger::new("ada").with_lesson(
            "lesson-1",
            74.0,
            vec![quiz(), PopupDefinition::cta("cta-1", 60.0, false)],
        )
    }

    fn answer(id: i64) -> SubmissionRequest {
        SubmissionRequest::new(
            PopupKind::Quiz,
            PopupResponse::Answer { selected: OptionId::from(id), text: format!("option {}", id) },
        )
    }

    #[tokio::test]
    async fn popups_come_back_in_order() {
        let popups = ledger().lesson_popups(&LessonId::new("lesson-1")).await.unwrap();
        let ids: Vec<_> = popups.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["quiz-1", "cta-1"]);
    }

    #[tokio::test]
    async fn unknown_lesson_is_not_found() {
        let err = ledger().lesson_popups(&LessonId::new("nope")).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn quiz_answers_are_graded() {
        let ledger = ledger();
        let submission = ledger.submit(&PopupId::new("quiz-1"), &answer(2)).await.unwrap();
        assert_eq!(submission.is_correct, Some(true));
        assert_eq!(submission.lesson_id.as_deref(), Some("lesson-1"));
    }

    #[tokio::test]
    async fn unknown_option_grades_as_unknown() {
        let ledger = ledger();
        let submission = ledger.submit(&PopupId::new("quiz-1"), &answer(3)).await.unwrap();
        assert_eq!(submission.is_correct, None);
    }

    #[tokio::test]
    async fn second_quiz_submission_conflicts() {
        let ledger = ledger();
        ledger.submit(&PopupId::new("quiz-1"), &answer(1)).await.unwrap();
        let err = ledger.submit(&PopupId::new("quiz-1"), &answer(2)).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(ledger.submission_count(), 1);
    }

    #[tokio::test]
    async fn free_text_quiz_answer_also_conflicts() {
        let ledger = ledger();
        let text_only = SubmissionRequest { answer_data: None, ..answer(2) };

        ledger.submit(&PopupId::new("quiz-1"), &text_only).await.unwrap();
        let err = ledger.submit(&PopupId::new("quiz-1"), &text_only).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(ledger.submission_count(), 1);
    }

    #[tokio::test]
    async fn cta_actions_are_always_recorded() {
        let ledger = ledger();
        let open = SubmissionRequest::new(PopupKind::Cta, PopupResponse::Action(CtaAction::Open));
        let close = SubmissionRequest::new(PopupKind::Cta, PopupResponse::Action(CtaAction::Close));

        let first = ledger.submit(&PopupId::new("cta-1"), &open).await.unwrap();
        ledger.submit(&PopupId::new("cta-1"), &close).await.unwrap();

        assert_eq!(first.answer.as_deref(), Some("open"));
        assert_eq!(first.is_correct, None);
        assert_eq!(ledger.submission_count(), 2);
    }

    #[tokio::test]
    async fn mismatched_type_fails_validation() {
        let ledger = ledger();
        let err = ledger.submit(&PopupId::new("cta-1"), &answer(1)).await.unwrap_err();
        match err {
            ApiError::Validation(fields) => assert!(fields.get("type").is_some()),
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn history_is_paginated_newest_first() {
        let ledger = ledger();
        let open = SubmissionRequest::new(PopupKind::Cta, PopupResponse::Action(CtaAction::Open));
        for _ in 0..20 {
            ledger.submit(&PopupId::new("cta-1"), &open).await.unwrap();
        }

        let first = ledger.submissions(1).await.unwrap();
        assert_eq!(first.data.len(), PAGE_SIZE);
        assert_eq!(first.data[0].id, "sub-20");
        assert_eq!(first.meta.last_page, 2);

        let second = ledger.submissions(2).await.unwrap();
        assert_eq!(second.data.len(), 5);
        assert_eq!(second.meta.total, 20);
    }

    #[test]
    fn fixture_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lessons.json");
        std::fs::write(
            &path,
            r#"{"lessons": [{"id": "1", "title": "Intro", "duration_seconds": 74,
                "popups": [{"id": "p", "type": "cta", "appear_at": 5}]}]}"#,
        )
        .unwrap();

        let ledger = Ledger::from_fixture(&path, "ada").unwrap();
        let lesson = ledger.lesson(&LessonId::new("1")).unwrap();
        assert_eq!(lesson.title, "Intro");
        assert_eq!(lesson.duration_seconds, Some(74.0));
    }
}
