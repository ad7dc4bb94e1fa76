use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::helpers::{
    attempt_response, clock_for, ensure_assigned, fetch_student_attempt, fetch_test, student_view,
};
use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Attempt;
use crate::db::types::{AttemptStatus, FinishReason};
use crate::repositories;
use crate::schemas::cbt::{
    AnswerRequest, FinishRequest, FinishResponse, StartResponse, TestSummary, VisibleTest,
};
use crate::services::attempt_finalize::{self, FinishRequest as FinalizeRequest};
use crate::services::question_order;
use crate::services::scoring::is_option_label;

pub(super) async fn list_visible(
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<VisibleTest>>, ApiError> {
    let Some(class_id) = user.class_id.as_deref() else {
        return Ok(Json(Vec::new()));
    };

    let tests = repositories::cbt_tests::list_for_class(state.db(), class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list tests"))?;
    let attempts: HashMap<String, Attempt> =
        repositories::attempts::list_by_student(state.db(), &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?
            .into_iter()
            .map(|attempt| (attempt.test_id.clone(), attempt))
            .collect();

    let visible = tests
        .iter()
        .map(|test| {
            let attempt = attempts.get(&test.id);
            VisibleTest {
                summary: TestSummary::from_db(test),
                attempt_id: attempt.map(|a| a.id.clone()),
                attempt_status: attempt.map(|a| a.status),
                percentage: attempt.and_then(|a| a.percentage),
            }
        })
        .collect();

    Ok(Json(visible))
}

/// Creates the caller's attempt or resumes the in-progress one.
pub(super) async fn start(
    Path(test_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StartResponse>, ApiError> {
    let test = fetch_test(state.db(), &test_id).await?;
    ensure_assigned(&user, &test)?;

    let now = primitive_now_utc();
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    repositories::attempts::lock_test_student(&mut *tx, &test.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to acquire attempt lock"))?;

    let existing = repositories::attempts::find_for_test_student(&mut *tx, &test.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

    let resumed = existing.is_some();
    let attempt = match existing {
        Some(attempt) if attempt.status == AttemptStatus::Finished => {
            return Err(ApiError::Conflict("You have already completed this test".to_string()));
        }
        Some(attempt) => attempt,
        None => {
            let order =
                question_order::build_order(test.questions.0.len(), test.shuffle, rand::random());
            let attempt_id = Uuid::new_v4().to_string();
            repositories::attempts::create(
                &mut *tx,
                repositories::attempts::CreateAttempt {
                    id: &attempt_id,
                    test_id: &test.id,
                    student_id: &user.id,
                    question_order: &order,
                    started_at: now,
                },
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to create attempt"))?;

            repositories::attempts::find_for_test_student(&mut *tx, &test.id, &user.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
                .ok_or_else(|| ApiError::Internal("Attempt missing after insert".to_string()))?
        }
    };

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit attempt"))?;

    metrics::attempt_started(resumed);
    tracing::info!(
        attempt_id = %attempt.id,
        test_id = %test.id,
        student_id = %user.id,
        resumed,
        "Attempt started"
    );

    let view = student_view(&test, &attempt.question_order.0);
    let attempt = attempt_response(&test, attempt, now)?;
    Ok(Json(StartResponse { test: view, attempt }))
}

pub(super) async fn answer(
    Path((test_id, attempt_id)): Path<(String, String)>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<AnswerRequest>,
) -> Result<StatusCode, ApiError> {
    if !is_option_label(&payload.option) {
        return Err(ApiError::BadRequest("option must be one of A, B, C, D".to_string()));
    }

    let test = fetch_test(state.db(), &test_id).await?;
    if payload.question_index as usize >= test.questions.0.len() {
        return Err(ApiError::BadRequest("question_index is out of range".to_string()));
    }

    let attempt = fetch_student_attempt(state.db(), &test_id, &attempt_id, &user.id).await?;
    if attempt.status == AttemptStatus::Finished {
        return Err(ApiError::Conflict("Attempt already finished".to_string()));
    }

    let now = primitive_now_utc();
    if !clock_for(&test, &attempt)?.is_running(now) {
        return Err(ApiError::Conflict("Time is up for this attempt".to_string()));
    }

    let recorded = repositories::attempts::record_answer(
        state.db(),
        &attempt.id,
        payload.question_index,
        &payload.option,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record answer"))?;

    if !recorded {
        return Err(ApiError::Conflict("Attempt already finished".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Scores and closes the attempt. Repeated calls return the stored result.
pub(super) async fn finish(
    Path((test_id, attempt_id)): Path<(String, String)>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<FinishRequest>,
) -> Result<Json<FinishResponse>, ApiError> {
    let test = fetch_test(state.db(), &test_id).await?;
    let attempt = fetch_student_attempt(state.db(), &test_id, &attempt_id, &user.id).await?;

    let reason = if payload.cheating { FinishReason::Cheating } else { FinishReason::Submitted };
    if payload.cheating && attempt.status == AttemptStatus::InProgress {
        tracing::warn!(attempt_id = %attempt.id, student_id = %user.id, "Attempt flagged for cheating");
    }

    let outcome = attempt_finalize::finish_attempt(
        state.db(),
        &test,
        &attempt,
        FinalizeRequest {
            submitted_answers: payload.answers.as_ref(),
            cheating: payload.cheating,
            reason,
            now: primitive_now_utc(),
            grace_seconds: state.settings().cbt().finish_grace_seconds,
        },
    )
    .await
    .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to finish attempt"))?;

    if !outcome.newly_finished {
        tracing::debug!(attempt_id = %outcome.attempt.id, "Finish replayed stored result");
    }

    Ok(Json(outcome.score.into()))
}

pub(super) async fn get_attempt(
    Path((test_id, attempt_id)): Path<(String, String)>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<crate::schemas::cbt::AttemptResponse>, ApiError> {
    let test = fetch_test(state.db(), &test_id).await?;
    let attempt = fetch_student_attempt(state.db(), &test_id, &attempt_id, &user.id).await?;

    Ok(Json(attempt_response(&test, attempt, primitive_now_utc())?))
}
