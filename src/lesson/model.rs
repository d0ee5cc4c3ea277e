//! Lesson and popup data model

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Public identifier of a lesson
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonId(pub String);

impl LessonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public identifier of a popup, unique within its lesson
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PopupId(pub String);

impl PopupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PopupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a quiz answer option
///
/// The API sends these either as numbers or as strings; both are normalized
/// to their textual form so `1` and `"1"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OptionId(pub String);

impl OptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<i64> for OptionId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for OptionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Float(f64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => OptionId(n.to_string()),
            RawId::Float(n) if n.fract() == 0.0 => OptionId((n as i64).to_string()),
            RawId::Float(n) => OptionId(n.to_string()),
            RawId::Text(s) => OptionId(s),
        })
    }
}

/// Kind of popup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupKind {
    /// Answerable question, tracked for correctness
    #[default]
    Quiz,
    /// Call to action, tracked for open/close
    Cta,
}

impl PopupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Cta => "cta",
        }
    }

    /// Parse from the wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiz" => Some(Self::Quiz),
            "cta" => Some(Self::Cta),
            _ => None,
        }
    }
}

impl fmt::Display for PopupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One answer of a quiz popup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: OptionId,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Kind-specific popup payload
#[derive(Debug, Clone, PartialEq)]
pub enum PopupOptions {
    /// Ordered answers of a quiz
    Quiz(Vec<QuizOption>),
    /// Action payload of a call to action, passed through untouched
    Cta(serde_json::Value),
}

impl PopupOptions {
    /// Quiz answers, empty for CTAs
    pub fn answers(&self) -> &[QuizOption] {
        match self {
            Self::Quiz(answers) => answers,
            Self::Cta(_) => &[],
        }
    }
}

/// A scheduled interactive overlay
#[derive(Debug, Clone, PartialEq)]
pub struct PopupDefinition {
    pub id: PopupId,
    pub title: String,
    pub content: String,
    pub kind: PopupKind,
    /// Playback position that triggers the popup
    pub appear_at_seconds: f64,
    /// Suggested display time, informational only
    pub display_seconds: Option<u32>,
    /// Playback stays paused while a mandatory popup is shown
    pub mandatory: bool,
    pub options: PopupOptions,
}

impl PopupDefinition {
    /// Build a quiz popup
    pub fn quiz(
        id: impl Into<String>,
        appear_at_seconds: f64,
        mandatory: bool,
        answers: Vec<QuizOption>,
    ) -> Self {
        Self {
            id: PopupId::new(id),
            title: String::new(),
            content: String::new(),
            kind: PopupKind::Quiz,
            appear_at_seconds,
            display_seconds: None,
            mandatory,
            options: PopupOptions::Quiz(answers),
        }
    }

    /// Build a call-to-action popup
    pub fn cta(id: impl Into<String>, appear_at_seconds: f64, mandatory: bool) -> Self {
        Self {
            id: PopupId::new(id),
            title: String::new(),
            content: String::new(),
            kind: PopupKind::Cta,
            appear_at_seconds,
            display_seconds: None,
            mandatory,
            options: PopupOptions::Cta(serde_json::Value::Null),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Grade a selected answer; `None` for CTAs or unknown options
    pub fn grade(&self, selected: &OptionId) -> Option<bool> {
        match (&self.kind, &self.options) {
            (PopupKind::Quiz, PopupOptions::Quiz(answers)) => grade_answer(answers, selected),
            _ => None,
        }
    }
}

/// Determine whether `selected` is a correct answer
///
/// Scans the options in order and reports the flag of the first option whose
/// id matches. Unknown selections are neither right nor wrong.
pub fn grade_answer(options: &[QuizOption], selected: &OptionId) -> Option<bool> {
    options.iter().find(|option| &option.id == selected).map(|option| option.is_correct)
}

/// Popup record as served by the lesson API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopupRecord {
    pub id: PopupId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: PopupKind,
    pub appear_at: f64,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default = "default_true")]
    pub is_skippable: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub options: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

/// Quiz options as nested in a record's `options` field
#[derive(Debug, Deserialize)]
struct QuizOptionsRecord {
    #[serde(default)]
    answers: Vec<QuizOption>,
}

impl From<PopupRecord> for PopupDefinition {
    fn from(record: PopupRecord) -> Self {
        let options = match record.kind {
            PopupKind::Quiz => {
                let answers = record
                    .options
                    .and_then(|value| {
                        serde_json::from_value::<QuizOptionsRecord>(value)
                            .map_err(|e| {
                                tracing::warn!("Ignoring malformed quiz options for {}: {}", record.id, e)
                            })
                            .ok()
                    })
                    .map(|parsed| parsed.answers)
                    .unwrap_or_default();
                PopupOptions::Quiz(answers)
            }
            PopupKind::Cta => PopupOptions::Cta(record.options.unwrap_or(serde_json::Value::Null)),
        };

        Self {
            id: record.id,
            title: record.title.unwrap_or_default(),
            content: record.content.unwrap_or_default(),
            kind: record.kind,
            appear_at_seconds: record.appear_at.max(0.0),
            display_seconds: record.duration,
            mandatory: !record.is_skippable,
            options,
        }
    }
}

impl From<&PopupDefinition> for PopupRecord {
    fn from(popup: &PopupDefinition) -> Self {
        let options = match &popup.options {
            PopupOptions::Quiz(answers) => Some(serde_json::json!({ "answers": answers })),
            PopupOptions::Cta(serde_json::Value::Null) => None,
            PopupOptions::Cta(value) => Some(value.clone()),
        };

        Self {
            id: popup.id.clone(),
            title: Some(popup.title.clone()),
            content: Some(popup.content.clone()),
            kind: popup.kind,
            appear_at: popup.appear_at_seconds,
            duration: popup.display_seconds,
            is_skippable: !popup.mandatory,
            is_active: true,
            options,
        }
    }
}

/// Convert API records into the ordered definitions the scheduler consumes
///
/// Inactive records are dropped; order is preserved.
pub fn active_definitions(records: Vec<PopupRecord>) -> Vec<PopupDefinition> {
    records.into_iter().filter(|record| record.is_active).map(PopupDefinition::from).collect()
}
