use thiserror::Error;

use crate::model::ImageBase;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("final test size must be > 0")]
    InvalidFinalTestSize,
}

/// Tunables for quiz runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSettings {
    final_test_size: usize,
    image_base: Option<ImageBase>,
}

impl QuizSettings {
    /// Number of questions drawn for the final test.
    pub const DEFAULT_FINAL_TEST_SIZE: usize = 40;

    /// # Errors
    ///
    /// Returns `SettingsError::InvalidFinalTestSize` if `final_test_size` is zero.
    pub fn new(
        final_test_size: usize,
        image_base: Option<ImageBase>,
    ) -> Result<Self, SettingsError> {
        if final_test_size == 0 {
            return Err(SettingsError::InvalidFinalTestSize);
        }
        Ok(Self {
            final_test_size,
            image_base,
        })
    }

    #[must_use]
    pub fn final_test_size(&self) -> usize {
        self.final_test_size
    }

    #[must_use]
    pub fn image_base(&self) -> Option<&ImageBase> {
        self.image_base.as_ref()
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            final_test_size: Self::DEFAULT_FINAL_TEST_SIZE,
            image_base: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_draws_forty() {
        assert_eq!(QuizSettings::default().final_test_size(), 40);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert_eq!(
            QuizSettings::new(0, None),
            Err(SettingsError::InvalidFinalTestSize)
        );
    }
}
