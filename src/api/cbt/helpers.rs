use sqlx::PgPool;

use crate::api::errors::ApiError;
use crate::db::models::{Attempt, CbtTest, User};
use crate::repositories;
use crate::schemas::cbt::{AttemptResponse, StudentQuestion, StudentTestView};
use crate::services::attempt_timing::AttemptClock;
use crate::services::question_order;

pub(super) async fn fetch_test(pool: &PgPool, test_id: &str) -> Result<CbtTest, ApiError> {
    repositories::cbt_tests::find_by_id(pool, test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch test"))?
        .ok_or_else(|| ApiError::NotFound("Test not found".to_string()))
}

/// The attempt must belong to both the test in the path and the caller.
pub(super) async fn fetch_student_attempt(
    pool: &PgPool,
    test_id: &str,
    attempt_id: &str,
    student_id: &str,
) -> Result<Attempt, ApiError> {
    let attempt = repositories::attempts::find_by_id(pool, attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

    match attempt {
        Some(attempt) if attempt.test_id == test_id && attempt.student_id == student_id => {
            Ok(attempt)
        }
        _ => Err(ApiError::NotFound("Attempt not found".to_string())),
    }
}

pub(super) fn ensure_assigned(user: &User, test: &CbtTest) -> Result<(), ApiError> {
    let assigned = user
        .class_id
        .as_ref()
        .is_some_and(|class_id| test.class_ids.0.iter().any(|id| id == class_id));
    if assigned {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Test is not assigned to your class"))
    }
}

pub(super) fn ensure_author(user: &User, test: &CbtTest) -> Result<(), ApiError> {
    if user.role.is_admin() || test.created_by == user.id {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Only the author can manage this test"))
    }
}

pub(super) fn clock_for(test: &CbtTest, attempt: &Attempt) -> Result<AttemptClock, ApiError> {
    AttemptClock::new(attempt.started_at, test.duration_minutes)
        .map_err(|e| ApiError::internal(e, "Test has an invalid duration"))
}

pub(super) fn attempt_response(
    test: &CbtTest,
    attempt: Attempt,
    now: time::PrimitiveDateTime,
) -> Result<AttemptResponse, ApiError> {
    let clock = clock_for(test, &attempt)?;
    let (elapsed, remaining) = (clock.elapsed_seconds(now), clock.remaining_seconds(now));
    Ok(AttemptResponse::build(attempt, elapsed, remaining))
}

/// What a student sees: presentation order, no correct options or explanations.
pub(super) fn student_view(test: &CbtTest, order: &[u32]) -> StudentTestView {
    let questions = question_order::ordered(&test.questions.0, order)
        .into_iter()
        .map(|(index, question)| StudentQuestion {
            index,
            text: question.text.clone(),
            options: question.options.clone(),
        })
        .collect();

    StudentTestView {
        id: test.id.clone(),
        title: test.title.clone(),
        subject: test.subject.clone(),
        term: test.term.clone(),
        duration_minutes: test.duration_minutes,
        questions,
    }
}
