use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("score must be a finite number, got {0}")]
    NotFinite(f64),

    #[error("score must be between 0 and 100, got {0}")]
    OutOfRange(f64),
}

//
// ─── SCORE ────────────────────────────────────────────────────────────────────
//

/// Minimum percentage that counts as passing a topic.
pub const PASS_THRESHOLD: f64 = 95.0;

/// Percentage of correctly answered questions, in `0..=100`.
///
/// Stored unrounded; use [`Score::rounded`] for display.
#[derive(Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Score(f64);

impl Score {
    pub const ZERO: Score = Score(0.0);

    /// Creates a validated score.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError` if the value is NaN, infinite, or outside `0..=100`.
    pub fn new(value: f64) -> Result<Self, ScoreError> {
        if !value.is_finite() {
            return Err(ScoreError::NotFinite(value));
        }
        if !(0.0..=100.0).contains(&value) {
            return Err(ScoreError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Builds a percentage from a correct/total ratio. Zero total yields 0.
    #[must_use]
    pub fn from_ratio(correct: usize, total: usize) -> Self {
        if total == 0 {
            return Self::ZERO;
        }
        let correct = correct.min(total);
        #[allow(clippy::cast_precision_loss)]
        let pct = 100.0 * correct as f64 / total as f64;
        Self(pct)
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Whole-percent value shown to users.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rounded(self) -> u8 {
        self.0.round() as u8
    }

    #[must_use]
    pub fn is_passing(self) -> bool {
        self.0 >= PASS_THRESHOLD
    }

    /// The larger of two scores.
    #[must_use]
    pub fn max(self, other: Score) -> Score {
        if other.0 > self.0 { other } else { self }
    }
}

impl TryFrom<f64> for Score {
    type Error = ScoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Score({})", self.0)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.rounded())
    }
}
