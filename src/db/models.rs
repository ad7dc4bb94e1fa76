use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime};

use crate::db::types::{AttemptStatus, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) school_id: Option<String>,
    pub(crate) class_id: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct School {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    pub(crate) radius_meters: f64,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SchoolClass {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
}

/// One multiple-choice question as stored inside a test's JSONB question bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Question {
    pub(crate) text: String,
    pub(crate) options: QuestionOptions,
    pub(crate) correct_option: String,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct QuestionOptions {
    #[serde(rename = "A")]
    pub(crate) a: String,
    #[serde(rename = "B")]
    pub(crate) b: String,
    #[serde(rename = "C")]
    pub(crate) c: String,
    #[serde(rename = "D")]
    pub(crate) d: String,
}

impl QuestionOptions {
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            ("A", self.a.as_str()),
            ("B", self.b.as_str()),
            ("C", self.c.as_str()),
            ("D", self.d.as_str()),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct CbtTest {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) term: String,
    pub(crate) class_ids: Json<Vec<String>>,
    pub(crate) questions: Json<Vec<Question>>,
    pub(crate) duration_minutes: i32,
    pub(crate) shuffle: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Answers keyed by the question's index in the test definition.
pub(crate) type AnswerMap = BTreeMap<u32, String>;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) time_taken_seconds: i32,
    pub(crate) answers: Json<AnswerMap>,
    pub(crate) question_order: Json<Vec<u32>>,
    pub(crate) status: AttemptStatus,
    pub(crate) percentage: Option<i32>,
    pub(crate) correct_count: Option<i32>,
    pub(crate) total_questions: Option<i32>,
    pub(crate) cheating: bool,
    pub(crate) finished_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AttendanceRecord {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) school_id: String,
    pub(crate) class_id: String,
    pub(crate) attendance_date: Date,
    pub(crate) recorded_at: PrimitiveDateTime,
    pub(crate) latitude: Option<f64>,
    pub(crate) longitude: Option<f64>,
    pub(crate) distance_meters: Option<f64>,
    pub(crate) location_verified: bool,
}
