mod sampler;
mod workflow;

pub use sampler::{FinalTestSampler, sample_questions};
pub use workflow::{QuizLoopService, QuizOutcome};
