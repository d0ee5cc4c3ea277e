//! Popup responses and stored submissions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::{OptionId, PopupId, PopupKind};

/// What the user did with a call to action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CtaAction {
    Open,
    Close,
}

impl CtaAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
        }
    }
}

/// Structured answer data for quizzes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerData {
    pub selected_id: OptionId,
}

/// A user's response to a popup, before it is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupResponse {
    /// Quiz answer: the chosen option and its display text
    Answer { selected: OptionId, text: String },
    /// Call-to-action interaction
    Action(CtaAction),
}

/// Body of a submission request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    #[serde(rename = "type")]
    pub kind: PopupKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<CtaAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_data: Option<AnswerData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_seconds: Option<u32>,
}

impl SubmissionRequest {
    /// Build the request for a response to a popup of the given kind
    pub fn new(kind: PopupKind, response: PopupResponse) -> Self {
        match response {
            PopupResponse::Answer { selected, text } => Self {
                kind,
                action: None,
                answer: Some(text),
                answer_data: Some(AnswerData { selected_id: selected }),
                response_time_seconds: None,
            },
            PopupResponse::Action(action) => Self {
                kind,
                action: Some(action),
                answer: None,
                answer_data: None,
                response_time_seconds: None,
            },
        }
    }

    pub fn with_response_time(mut self, seconds: Option<u32>) -> Self {
        self.response_time_seconds = seconds;
        self
    }

    /// Selected option id, if any
    pub fn selected_id(&self) -> Option<&OptionId> {
        self.answer_data.as_ref().map(|data| &data.selected_id)
    }

    /// Check the field rules the submission endpoint enforces
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        match self.kind {
            PopupKind::Cta if self.action.is_none() => {
                errors.add("action", "The action field is required when type is cta.");
            }
            PopupKind::Quiz if self.answer.as_deref().is_none_or(str::is_empty) => {
                errors.add("answer", "The answer field is required when type is quiz.");
            }
            _ => {}
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Field-level validation messages, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// One-line summary for status bars
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{}: {}", field, m)))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A stored submission as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    /// Numeric on the server, textual in the offline ledger
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
    #[serde(default)]
    pub popup_id: Option<PopupId>,
    #[serde(default)]
    pub lesson_id: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub answer_data: Option<AnswerData>,
    /// Correctness of a quiz answer; `None` for CTAs and unknown options
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub responded_at: Option<String>,
    #[serde(default)]
    pub response_time_seconds: Option<u32>,
}

/// One page of the user's submission history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPage {
    pub data: Vec<Submission>,
    #[serde(default)]
    pub meta: PageMeta,
}

/// Pagination details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u32,
}
