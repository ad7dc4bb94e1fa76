use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{AnswerMap, Attempt};
use crate::db::types::AttemptStatus;

pub(crate) const COLUMNS: &str = "\
    id, test_id, student_id, started_at, time_taken_seconds, answers, question_order, \
    status, percentage, correct_count, total_questions, cheating, finished_at, \
    created_at, updated_at";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) test_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) question_order: &'a [u32],
    pub(crate) started_at: PrimitiveDateTime,
}

pub(crate) struct FinishAttempt<'a> {
    pub(crate) answers: &'a AnswerMap,
    pub(crate) time_taken_seconds: i32,
    pub(crate) percentage: i32,
    pub(crate) correct_count: i32,
    pub(crate) total_questions: i32,
    pub(crate) cheating: bool,
    pub(crate) finished_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AttemptResultRow {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) status: AttemptStatus,
    pub(crate) percentage: Option<i32>,
    pub(crate) correct_count: Option<i32>,
    pub(crate) total_questions: Option<i32>,
    pub(crate) cheating: bool,
    pub(crate) time_taken_seconds: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) finished_at: Option<PrimitiveDateTime>,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_for_test_student(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE test_id = $1 AND student_id = $2"
    ))
    .bind(test_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

/// Serializes concurrent starts of the same test by the same student until the
/// surrounding transaction ends.
pub(crate) async fn lock_test_student(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))")
        .bind(test_id)
        .bind(student_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO attempts (
            id, test_id, student_id, started_at, question_order, status, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        ON CONFLICT (test_id, student_id) DO NOTHING",
    )
    .bind(params.id)
    .bind(params.test_id)
    .bind(params.student_id)
    .bind(params.started_at)
    .bind(Json(params.question_order))
    .bind(AttemptStatus::InProgress)
    .bind(params.started_at)
    .bind(params.started_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Stores one answer while the attempt is still in progress. Returns false when
/// the attempt has already been finished.
pub(crate) async fn record_answer(
    pool: &PgPool,
    id: &str,
    question_index: u32,
    option: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE attempts
         SET answers = jsonb_set(answers, ARRAY[$2::text], to_jsonb($3::text), true),
             updated_at = $4
         WHERE id = $1 AND status = $5",
    )
    .bind(id)
    .bind(question_index.to_string())
    .bind(option)
    .bind(now)
    .bind(AttemptStatus::InProgress)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Writes the result exactly once. `None` means another finisher got there first.
pub(crate) async fn finish(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: FinishAttempt<'_>,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "UPDATE attempts
         SET status = $2, answers = $3, time_taken_seconds = $4, percentage = $5,
             correct_count = $6, total_questions = $7, cheating = $8,
             finished_at = $9, updated_at = $9
         WHERE id = $1 AND status = $10
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(AttemptStatus::Finished)
    .bind(Json(params.answers))
    .bind(params.time_taken_seconds)
    .bind(params.percentage)
    .bind(params.correct_count)
    .bind(params.total_questions)
    .bind(params.cheating)
    .bind(params.finished_at)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}

/// Ids of in-progress attempts whose deadline plus grace lies before `now`.
pub(crate) async fn list_overdue_ids(
    pool: &PgPool,
    now: PrimitiveDateTime,
    grace_seconds: u64,
    limit: i64,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT a.id
         FROM attempts a
         JOIN cbt_tests t ON t.id = a.test_id
         WHERE a.status = $1
           AND a.started_at
               + make_interval(mins => t.duration_minutes)
               + make_interval(secs => $2) < $3
         ORDER BY a.started_at
         LIMIT $4",
    )
    .bind(AttemptStatus::InProgress)
    .bind(grace_seconds as f64)
    .bind(now)
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE student_id = $1 ORDER BY started_at DESC"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_results_by_test(
    pool: &PgPool,
    test_id: &str,
) -> Result<Vec<AttemptResultRow>, sqlx::Error> {
    sqlx::query_as::<_, AttemptResultRow>(
        "SELECT a.id,
                a.student_id,
                u.full_name AS student_name,
                a.status,
                a.percentage,
                a.correct_count,
                a.total_questions,
                a.cheating,
                a.time_taken_seconds,
                a.started_at,
                a.finished_at
         FROM attempts a
         JOIN users u ON u.id = a.student_id
         WHERE a.test_id = $1
         ORDER BY u.full_name, a.started_at",
    )
    .bind(test_id)
    .fetch_all(pool)
    .await
}
