use serde::Serialize;
use thiserror::Error;

use crate::db::models::{AnswerMap, Question};

pub(crate) const OPTION_LABELS: [&str; 4] = ["A", "B", "C", "D"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct Score {
    pub(crate) correct: i32,
    pub(crate) total: i32,
    pub(crate) percentage: i32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ScoringError {
    #[error("test has no questions")]
    EmptyTest,
}

pub(crate) fn is_option_label(label: &str) -> bool {
    OPTION_LABELS.contains(&label)
}

/// Binary per-question scoring: a question counts only when the recorded label
/// equals the correct label exactly. Answers for unknown indices are ignored.
pub(crate) fn score(questions: &[Question], answers: &AnswerMap) -> Result<Score, ScoringError> {
    if questions.is_empty() {
        return Err(ScoringError::EmptyTest);
    }

    let correct = questions
        .iter()
        .enumerate()
        .filter(|(index, question)| {
            u32::try_from(*index)
                .ok()
                .and_then(|index| answers.get(&index))
                .is_some_and(|selected| *selected == question.correct_option)
        })
        .count();

    let total = questions.len();
    let percentage = (correct as f64 / total as f64 * 100.0).round() as i32;

    Ok(Score { correct: correct as i32, total: total as i32, percentage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::QuestionOptions;

    fn question(correct: &str) -> Question {
        Question {
            text: "Pick one".to_string(),
            options: QuestionOptions {
                a: "alpha".to_string(),
                b: "beta".to_string(),
                c: "gamma".to_string(),
                d: "delta".to_string(),
            },
            correct_option: correct.to_string(),
            explanation: None,
        }
    }

    fn answers(pairs: &[(u32, &str)]) -> AnswerMap {
        pairs.iter().map(|(index, label)| (*index, label.to_string())).collect()
    }

    #[test]
    fn two_of_three_rounds_to_67() {
        let questions = vec![question("A"), question("B"), question("C")];
        let score = score(&questions, &answers(&[(0, "A"), (1, "B"), (2, "D")])).unwrap();

        assert_eq!(score, Score { correct: 2, total: 3, percentage: 67 });
    }

    #[test]
    fn unanswered_questions_count_as_wrong() {
        let questions = vec![question("A"), question("B"), question("C"), question("D")];
        let score = score(&questions, &answers(&[(3, "D")])).unwrap();

        assert_eq!(score.correct, 1);
        assert_eq!(score.percentage, 25);
    }

    #[test]
    fn label_match_is_case_sensitive() {
        let questions = vec![question("A")];
        let score = score(&questions, &answers(&[(0, "a")])).unwrap();

        assert_eq!(score.correct, 0);
        assert_eq!(score.percentage, 0);
    }

    #[test]
    fn out_of_range_answers_are_ignored() {
        let questions = vec![question("B"), question("B")];
        let score = score(&questions, &answers(&[(0, "B"), (7, "B")])).unwrap();

        assert_eq!(score, Score { correct: 1, total: 2, percentage: 50 });
    }

    #[test]
    fn half_percent_rounds_away_from_zero() {
        let questions: Vec<Question> = (0..8).map(|_| question("C")).collect();
        let score = score(&questions, &answers(&[(5, "C")])).unwrap();

        // 1/8 = 12.5%
        assert_eq!(score.percentage, 13);
    }

    #[test]
    fn empty_test_is_rejected() {
        assert_eq!(score(&[], &AnswerMap::new()), Err(ScoringError::EmptyTest));
    }

    #[test]
    fn option_labels_are_single_uppercase_letters() {
        assert!(is_option_label("A"));
        assert!(is_option_label("D"));
        assert!(!is_option_label("E"));
        assert!(!is_option_label("a"));
        assert!(!is_option_label(""));
    }
}
