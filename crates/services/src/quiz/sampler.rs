use std::sync::{Arc, Mutex};

use quiz_core::model::Question;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Uniformly shuffle `pool` and keep the first `n` questions.
///
/// Returns every question when the pool is smaller than `n`.
pub fn sample_questions<R: Rng + ?Sized>(
    mut pool: Vec<Question>,
    n: usize,
    rng: &mut R,
) -> Vec<Question> {
    pool.shuffle(rng);
    pool.truncate(n.min(pool.len()));
    pool
}

/// Draws final test questions from a shared random source.
///
/// Clones share one generator, so seeded samplers stay reproducible across
/// every caller.
#[derive(Clone)]
pub struct FinalTestSampler {
    rng: Arc<Mutex<StdRng>>,
}

impl FinalTestSampler {
    #[must_use]
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Pick up to `n` distinct questions from `pool`.
    #[must_use]
    pub fn sample(&self, pool: Vec<Question>, n: usize) -> Vec<Question> {
        // A poisoned generator is still a valid generator.
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        sample_questions(pool, n, &mut *rng)
    }
}

impl Default for FinalTestSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FinalTestSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalTestSampler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionId, TopicId};
    use std::collections::HashSet;

    fn pool(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                id: QuestionId::new(format!("q{i}")),
                topic_id: TopicId::new("t"),
                text: format!("Q{i}"),
                image_path: None,
                order_index: i64::try_from(i).unwrap(),
                answers: Vec::new(),
            })
            .collect()
    }

    fn ids(questions: &[Question]) -> Vec<String> {
        questions.iter().map(|q| q.id.as_str().to_owned()).collect()
    }

    #[test]
    fn takes_n_distinct_questions() {
        let picked = FinalTestSampler::with_seed(7).sample(pool(50), 40);
        assert_eq!(picked.len(), 40);
        let unique: HashSet<_> = ids(&picked).into_iter().collect();
        assert_eq!(unique.len(), 40);
    }

    #[test]
    fn small_pool_returns_everything() {
        let picked = FinalTestSampler::with_seed(7).sample(pool(10), 40);
        assert_eq!(picked.len(), 10);
        let mut got = ids(&picked);
        got.sort();
        let mut want = ids(&pool(10));
        want.sort();
        assert_eq!(got, want);
    }

    #[test]
    fn empty_pool_is_empty() {
        assert!(FinalTestSampler::with_seed(1).sample(Vec::new(), 40).is_empty());
    }

    #[test]
    fn same_seed_same_draw() {
        let a = FinalTestSampler::with_seed(42).sample(pool(50), 40);
        let b = FinalTestSampler::with_seed(42).sample(pool(50), 40);
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn successive_draws_differ() {
        let sampler = FinalTestSampler::with_seed(42);
        let a = sampler.sample(pool(50), 40);
        let b = sampler.sample(pool(50), 40);
        assert_ne!(ids(&a), ids(&b));
    }

    #[test]
    fn every_question_can_be_drawn_first() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let picked = sample_questions(pool(5), 1, &mut rng);
            seen.insert(picked[0].id.as_str().to_owned());
        }
        assert_eq!(seen.len(), 5);
    }
}
