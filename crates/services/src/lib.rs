#![forbid(unsafe_code)]

pub mod access_service;
pub mod app_services;
pub mod error;
pub mod progress_service;
pub mod quiz;

pub use access_service::{AccessService, CourseOverview, LessonOverview, TopicOverview};
pub use app_services::AppServices;
pub use error::{AppServicesError, ProgressServiceError, QuizServiceError};
pub use progress_service::ProgressService;
pub use quiz::{FinalTestSampler, QuizLoopService, QuizOutcome, sample_questions};
