//! Scoring of answered questions.

use std::collections::HashMap;

use crate::model::{AnswerId, Question, QuestionId, Score};

/// Counts how many questions were answered with their correct answer.
///
/// Unanswered questions, and questions without any answer flagged correct,
/// never count.
#[must_use]
pub fn correct_count(questions: &[Question], selections: &HashMap<QuestionId, AnswerId>) -> usize {
    questions
        .iter()
        .filter(|q| {
            let Some(selected) = selections.get(&q.id) else {
                return false;
            };
            q.correct_answer().is_some_and(|a| &a.id == selected)
        })
        .count()
}

/// Percentage of `questions` answered correctly. Empty input scores 0.
#[must_use]
pub fn grade(questions: &[Question], selections: &HashMap<QuestionId, AnswerId>) -> Score {
    Score::from_ratio(correct_count(questions, selections), questions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, TopicId};

    fn question(id: &str, correct: &str, wrong: &str) -> Question {
        let qid = QuestionId::new(id);
        Question {
            id: qid.clone(),
            topic_id: TopicId::new("t"),
            text: format!("question {id}"),
            image_path: None,
            order_index: 0,
            answers: vec![
                Answer {
                    id: AnswerId::new(wrong),
                    question_id: qid.clone(),
                    text: "wrong".into(),
                    is_correct: false,
                },
                Answer {
                    id: AnswerId::new(correct),
                    question_id: qid,
                    text: "right".into(),
                    is_correct: true,
                },
            ],
        }
    }

    #[test]
    fn one_of_three_scores_a_third() {
        let questions = vec![
            question("q1", "a1", "w1"),
            question("q2", "a2", "w2"),
            question("q3", "a3", "w3"),
        ];
        let mut selections = HashMap::new();
        selections.insert(QuestionId::new("q1"), AnswerId::new("a1"));
        selections.insert(QuestionId::new("q2"), AnswerId::new("w2"));

        let score = grade(&questions, &selections);
        assert_eq!(correct_count(&questions, &selections), 1);
        assert_eq!(score.rounded(), 33);
    }

    #[test]
    fn empty_set_scores_zero() {
        assert_eq!(grade(&[], &HashMap::new()), Score::ZERO);
    }

    #[test]
    fn question_without_correct_answer_never_counts() {
        let mut q = question("q1", "a1", "w1");
        for a in &mut q.answers {
            a.is_correct = false;
        }
        let mut selections = HashMap::new();
        selections.insert(QuestionId::new("q1"), AnswerId::new("a1"));
        assert_eq!(grade(&[q], &selections), Score::ZERO);
    }
}
