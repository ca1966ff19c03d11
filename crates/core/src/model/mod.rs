pub mod catalog;
mod ids;
mod media;
mod progress;
mod quiz;
mod score;

pub use catalog::{Answer, Catalog, CatalogError, Lesson, Question, Topic};
pub use ids::{AnswerId, LessonId, ParseIdError, QuestionId, TopicId};
pub use media::{ImageBase, MediaError};
pub use progress::{ProgressMap, TopicProgress};
pub use quiz::{QuizError, QuizKind, QuizSession, QuizState, QuizStep};
pub use score::{PASS_THRESHOLD, Score, ScoreError};
