#![forbid(unsafe_code)]

pub mod grading;
pub mod model;
pub mod settings;
pub mod unlock;

pub use settings::{QuizSettings, SettingsError};
