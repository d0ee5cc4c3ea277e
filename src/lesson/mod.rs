//! Lessons, popups and submissions

pub mod model;
pub mod submission;

pub use model::{
    LessonId, OptionId, PopupDefinition, PopupId, PopupKind, PopupOptions, PopupRecord,
    QuizOption, active_definitions, grade_answer,
};
pub use submission::{
    AnswerData, CtaAction, FieldErrors, PageMeta, PopupResponse, Submission, SubmissionPage,
    SubmissionRequest,
};
