//! Lessonplay - timed quizzes and calls to action over lesson videos
//!
//! A video lesson carries popups scheduled at points in its timeline. This
//! crate plays the video through a pluggable player SDK, shows each popup
//! when playback reaches it, and records the learner's responses with the
//! lesson API.

pub mod api;
pub mod app;
pub mod config;
pub mod lesson;
pub mod player;
pub mod popups;
pub mod session;
pub mod theme;
pub mod ui;

pub use app::App;
pub use config::Config;
pub use session::LessonSession;
pub use theme::Theme;
