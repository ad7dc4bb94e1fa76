use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::time::format_primitive;
use crate::db::models::{AnswerMap, Attempt, CbtTest, Question, QuestionOptions};
use crate::db::types::AttemptStatus;
use crate::repositories::attempts::AttemptResultRow;
use crate::services::scoring::{is_option_label, Score};

fn validate_option_label(value: &str) -> Result<(), ValidationError> {
    if is_option_label(value) {
        Ok(())
    } else {
        Err(ValidationError::new("option_label")
            .with_message("correct_option must be one of A, B, C, D".into()))
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct OptionsCreate {
    #[serde(rename = "A")]
    #[validate(length(min = 1, message = "option A must not be empty"))]
    pub(crate) a: String,
    #[serde(rename = "B")]
    #[validate(length(min = 1, message = "option B must not be empty"))]
    pub(crate) b: String,
    #[serde(rename = "C")]
    #[validate(length(min = 1, message = "option C must not be empty"))]
    pub(crate) c: String,
    #[serde(rename = "D")]
    #[validate(length(min = 1, message = "option D must not be empty"))]
    pub(crate) d: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[validate(length(min = 1, message = "question text must not be empty"))]
    pub(crate) text: String,
    #[validate(nested)]
    pub(crate) options: OptionsCreate,
    #[serde(alias = "correctOption")]
    #[validate(custom(function = "validate_option_label"))]
    pub(crate) correct_option: String,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
}

impl From<QuestionCreate> for Question {
    fn from(value: QuestionCreate) -> Self {
        Self {
            text: value.text,
            options: QuestionOptions {
                a: value.options.a,
                b: value.options.b,
                c: value.options.c,
                d: value.options.d,
            },
            correct_option: value.correct_option,
            explanation: value.explanation.filter(|text| !text.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TestCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[validate(length(min = 1, max = 100, message = "subject must not be empty"))]
    pub(crate) subject: String,
    #[serde(default)]
    pub(crate) term: String,
    #[serde(alias = "classIds")]
    #[validate(length(min = 1, message = "at least one class is required"))]
    pub(crate) class_ids: Vec<String>,
    #[validate(length(min = 1, message = "at least one question is required"), nested)]
    pub(crate) questions: Vec<QuestionCreate>,
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, max = 1440, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: i32,
    #[serde(default)]
    pub(crate) shuffle: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct TestSummary {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) term: String,
    pub(crate) class_ids: Vec<String>,
    pub(crate) question_count: usize,
    pub(crate) duration_minutes: i32,
    pub(crate) shuffle: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
}

impl TestSummary {
    pub(crate) fn from_db(test: &CbtTest) -> Self {
        Self {
            id: test.id.clone(),
            title: test.title.clone(),
            subject: test.subject.clone(),
            term: test.term.clone(),
            class_ids: test.class_ids.0.clone(),
            question_count: test.questions.0.len(),
            duration_minutes: test.duration_minutes,
            shuffle: test.shuffle,
            created_by: test.created_by.clone(),
            created_at: format_primitive(test.created_at),
        }
    }
}

/// Full definition, including answers; only for the author and admins.
#[derive(Debug, Serialize)]
pub(crate) struct TestDetail {
    #[serde(flatten)]
    pub(crate) summary: TestSummary,
    pub(crate) questions: Vec<Question>,
}

#[derive(Debug, Serialize)]
pub(crate) struct VisibleTest {
    #[serde(flatten)]
    pub(crate) summary: TestSummary,
    pub(crate) attempt_id: Option<String>,
    pub(crate) attempt_status: Option<AttemptStatus>,
    pub(crate) percentage: Option<i32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestion {
    /// Position of the question in the test definition; answers are keyed by it.
    pub(crate) index: u32,
    pub(crate) text: String,
    pub(crate) options: QuestionOptions,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentTestView {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) term: String,
    pub(crate) duration_minutes: i32,
    pub(crate) questions: Vec<StudentQuestion>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) time_taken_seconds: i64,
    pub(crate) remaining_seconds: i64,
    pub(crate) answers: AnswerMap,
    pub(crate) percentage: Option<i32>,
    pub(crate) correct: Option<i32>,
    pub(crate) total: Option<i32>,
    pub(crate) cheating: bool,
    pub(crate) finished_at: Option<String>,
}

impl AttemptResponse {
    /// `elapsed_seconds` and `remaining_seconds` are live values for in-progress
    /// attempts; finished ones report the stored time.
    pub(crate) fn build(attempt: Attempt, elapsed_seconds: i64, remaining_seconds: i64) -> Self {
        let (time_taken_seconds, remaining_seconds) = match attempt.status {
            AttemptStatus::InProgress => (elapsed_seconds, remaining_seconds),
            AttemptStatus::Finished => (i64::from(attempt.time_taken_seconds), 0),
        };

        Self {
            id: attempt.id,
            test_id: attempt.test_id,
            status: attempt.status,
            started_at: format_primitive(attempt.started_at),
            time_taken_seconds,
            remaining_seconds,
            answers: attempt.answers.0,
            percentage: attempt.percentage,
            correct: attempt.correct_count,
            total: attempt.total_questions,
            cheating: attempt.cheating,
            finished_at: attempt.finished_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StartResponse {
    pub(crate) test: StudentTestView,
    pub(crate) attempt: AttemptResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FinishRequest {
    #[serde(default)]
    pub(crate) cheating: bool,
    #[serde(default)]
    pub(crate) answers: Option<AnswerMap>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FinishResponse {
    pub(crate) percentage: i32,
    pub(crate) correct: i32,
    pub(crate) total: i32,
}

impl From<Score> for FinishResponse {
    fn from(score: Score) -> Self {
        Self { percentage: score.percentage, correct: score.correct, total: score.total }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerRequest {
    #[serde(alias = "questionIndex")]
    pub(crate) question_index: u32,
    pub(crate) option: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResultResponse {
    pub(crate) attempt_id: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) status: AttemptStatus,
    pub(crate) percentage: Option<i32>,
    pub(crate) correct: Option<i32>,
    pub(crate) total: Option<i32>,
    pub(crate) cheating: bool,
    pub(crate) time_taken_seconds: i32,
    pub(crate) started_at: String,
    pub(crate) finished_at: Option<String>,
}

impl From<AttemptResultRow> for AttemptResultResponse {
    fn from(row: AttemptResultRow) -> Self {
        Self {
            attempt_id: row.id,
            student_id: row.student_id,
            student_name: row.student_name,
            status: row.status,
            percentage: row.percentage,
            correct: row.correct_count,
            total: row.total_questions,
            cheating: row.cheating,
            time_taken_seconds: row.time_taken_seconds,
            started_at: format_primitive(row.started_at),
            finished_at: row.finished_at.map(format_primitive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(correct: &str, duration: i32) -> serde_json::Value {
        serde_json::json!({
            "title": "Week 3 quiz",
            "subject": "Mathematics",
            "term": "First",
            "class_ids": ["jss1a"],
            "duration_minutes": duration,
            "questions": [{
                "text": "2 + 2 = ?",
                "options": {"A": "3", "B": "4", "C": "5", "D": "22"},
                "correct_option": correct
            }]
        })
    }

    #[test]
    fn valid_test_passes() {
        let create: TestCreate = serde_json::from_value(payload("B", 10)).unwrap();
        assert!(create.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_correct_option() {
        let create: TestCreate = serde_json::from_value(payload("E", 10)).unwrap();
        assert!(create.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_duration() {
        let create: TestCreate = serde_json::from_value(payload("A", 0)).unwrap();
        assert!(create.validate().is_err());
    }

    #[test]
    fn rejects_empty_questions_and_classes() {
        let mut value = payload("A", 5);
        value["questions"] = serde_json::json!([]);
        let create: TestCreate = serde_json::from_value(value).unwrap();
        assert!(create.validate().is_err());

        let mut value = payload("A", 5);
        value["class_ids"] = serde_json::json!([]);
        let create: TestCreate = serde_json::from_value(value).unwrap();
        assert!(create.validate().is_err());
    }

    #[test]
    fn rejects_blank_option_text() {
        let mut value = payload("A", 5);
        value["questions"][0]["options"]["C"] = serde_json::json!("");
        let create: TestCreate = serde_json::from_value(value).unwrap();
        assert!(create.validate().is_err());
    }

    #[test]
    fn finish_request_defaults() {
        let request: FinishRequest = serde_json::from_str("{}").unwrap();
        assert!(!request.cheating);
        assert!(request.answers.is_none());

        let request: FinishRequest =
            serde_json::from_str(r#"{"cheating":true,"answers":{"0":"A","2":"C"}}"#).unwrap();
        assert!(request.cheating);
        assert_eq!(request.answers.unwrap().get(&2).map(String::as_str), Some("C"));
    }
}
