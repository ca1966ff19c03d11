use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::grading::grade;
use crate::model::catalog::Question;
use crate::model::ids::{AnswerId, QuestionId, TopicId};
use crate::model::score::Score;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz has no questions")]
    Empty,

    #[error("quiz has not been started")]
    NotStarted,

    #[error("quiz is already in progress")]
    InProgress,

    #[error("quiz is already finished")]
    Finished,

    #[error("answer {answer} does not belong to question {question}")]
    UnknownAnswer {
        question: QuestionId,
        answer: AnswerId,
    },
}

//
// ─── KIND / STATE ─────────────────────────────────────────────────────────────
//

/// What a quiz run counts towards once finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizKind {
    Topic(TopicId),
    FinalTest,
}

impl fmt::Display for QuizKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizKind::Topic(id) => write!(f, "topic {id}"),
            QuizKind::FinalTest => f.write_str("final test"),
        }
    }
}

/// `NotStarted -> InProgress -> Finished`, with `restart` looping back.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizState {
    NotStarted,
    InProgress {
        current: usize,
        answers: HashMap<QuestionId, AnswerId>,
    },
    Finished {
        score: Score,
        answers: HashMap<QuestionId, AnswerId>,
    },
}

/// Outcome of `QuizSession::next`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuizStep {
    Advanced { index: usize },
    Finished { score: Score },
}

//
// ─── SESSION ──────────────────────────────────────────────────────────────────
//

/// One pass through an ordered question list.
///
/// The session only computes the score; persisting it is the caller's job.
#[derive(Debug, Clone)]
pub struct QuizSession {
    kind: QuizKind,
    questions: Vec<Question>,
    state: QuizState,
}

impl QuizSession {
    /// # Errors
    ///
    /// Returns `QuizError::Empty` if `questions` is empty.
    pub fn new(kind: QuizKind, questions: Vec<Question>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::Empty);
        }
        Ok(Self {
            kind,
            questions,
            state: QuizState::NotStarted,
        })
    }

    #[must_use]
    pub fn kind(&self) -> &QuizKind {
        &self.kind
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn state(&self) -> &QuizState {
        &self.state
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        match &self.state {
            QuizState::InProgress { current, .. } => Some(*current),
            _ => None,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|i| self.questions.get(i))
    }

    /// Answer recorded for the current question.
    #[must_use]
    pub fn selected_answer(&self) -> Option<&AnswerId> {
        let QuizState::InProgress { current, answers } = &self.state else {
            return None;
        };
        self.questions
            .get(*current)
            .and_then(|q| answers.get(&q.id))
    }

    /// UI policy: moving on is offered only once the current question is answered.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.selected_answer().is_some()
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current_index()
            .is_some_and(|i| i + 1 >= self.questions.len())
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        match &self.state {
            QuizState::NotStarted => 0,
            QuizState::InProgress { answers, .. } | QuizState::Finished { answers, .. } => {
                answers.len()
            }
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, QuizState::Finished { .. })
    }

    #[must_use]
    pub fn score(&self) -> Option<Score> {
        match &self.state {
            QuizState::Finished { score, .. } => Some(*score),
            _ => None,
        }
    }

    /// # Errors
    ///
    /// `InProgress` or `Finished` when not in `NotStarted`.
    pub fn start(&mut self) -> Result<(), QuizError> {
        match self.state {
            QuizState::NotStarted => {
                self.state = QuizState::InProgress {
                    current: 0,
                    answers: HashMap::new(),
                };
                Ok(())
            }
            QuizState::InProgress { .. } => Err(QuizError::InProgress),
            QuizState::Finished { .. } => Err(QuizError::Finished),
        }
    }

    /// Records or overwrites the answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAnswer` if the id is not one of the current question's
    /// answers, or a state error when not in progress.
    pub fn select_answer(&mut self, answer_id: AnswerId) -> Result<(), QuizError> {
        let QuizState::InProgress { current, answers } = &mut self.state else {
            return Err(self.not_in_progress());
        };
        let question = &self.questions[*current];
        if !question.has_answer(&answer_id) {
            return Err(QuizError::UnknownAnswer {
                question: question.id.clone(),
                answer: answer_id,
            });
        }
        answers.insert(question.id.clone(), answer_id);
        Ok(())
    }

    /// Score the run would finish with if `next` were called now.
    ///
    /// `None` unless the run is in progress on its last question. Leaves the
    /// state untouched, so callers can persist the score before committing.
    #[must_use]
    pub fn pending_score(&self) -> Option<Score> {
        let QuizState::InProgress { current, answers } = &self.state else {
            return None;
        };
        (*current + 1 >= self.questions.len()).then(|| grade(&self.questions, answers))
    }

    /// Advances, or finishes and scores when on the last question.
    ///
    /// # Errors
    ///
    /// Returns a state error when not in progress.
    pub fn next(&mut self) -> Result<QuizStep, QuizError> {
        let QuizState::InProgress { current, answers } = &mut self.state else {
            return Err(self.not_in_progress());
        };

        if *current + 1 < self.questions.len() {
            *current += 1;
            return Ok(QuizStep::Advanced { index: *current });
        }

        let answers = std::mem::take(answers);
        let score = grade(&self.questions, &answers);
        self.state = QuizState::Finished { score, answers };
        Ok(QuizStep::Finished { score })
    }

    /// Steps back one question, keeping recorded answers. No-op at the first question.
    ///
    /// # Errors
    ///
    /// Returns a state error when not in progress.
    pub fn previous(&mut self) -> Result<usize, QuizError> {
        let QuizState::InProgress { current, .. } = &mut self.state else {
            return Err(self.not_in_progress());
        };
        *current = current.saturating_sub(1);
        Ok(*current)
    }

    /// Returns to `NotStarted`, discarding answers.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InProgress` while a run is underway.
    pub fn restart(&mut self) -> Result<(), QuizError> {
        if matches!(self.state, QuizState::InProgress { .. }) {
            return Err(QuizError::InProgress);
        }
        self.state = QuizState::NotStarted;
        Ok(())
    }

    fn not_in_progress(&self) -> QuizError {
        match self.state {
            QuizState::Finished { .. } => QuizError::Finished,
            _ => QuizError::NotStarted,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
