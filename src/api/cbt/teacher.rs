use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::helpers::{ensure_author, fetch_test};
use crate::api::errors::ApiError;
use crate::api::guards::{ensure_school_access, CurrentTeacher};
use crate::api::pagination::{PageQuery, PaginatedResponse};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Question;
use crate::repositories;
use crate::schemas::cbt::{AttemptResultResponse, TestCreate, TestDetail, TestSummary};

pub(super) async fn create_test(
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<TestCreate>,
) -> Result<(StatusCode, Json<TestDetail>), ApiError> {
    validate_payload(&payload)?;

    let max_questions = state.settings().cbt().max_questions_per_test;
    if payload.questions.len() as u64 > max_questions {
        return Err(ApiError::BadRequest(format!(
            "A test may contain at most {max_questions} questions"
        )));
    }

    let mut class_ids: Vec<String> = Vec::with_capacity(payload.class_ids.len());
    for class_id in &payload.class_ids {
        let class_id = class_id.trim();
        if !class_id.is_empty() && !class_ids.iter().any(|existing| existing == class_id) {
            class_ids.push(class_id.to_string());
        }
    }
    if class_ids.is_empty() {
        return Err(ApiError::BadRequest("at least one class is required".to_string()));
    }

    let classes = repositories::classes::find_many(state.db(), &class_ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check classes"))?;
    let missing: Vec<&str> = class_ids
        .iter()
        .filter(|id| !classes.iter().any(|class| &class.id == *id))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!("Unknown classes: {}", missing.join(", "))));
    }
    for class in &classes {
        ensure_school_access(&user, &class.school_id)?;
    }

    let questions: Vec<Question> = payload.questions.into_iter().map(Question::from).collect();
    let now = primitive_now_utc();

    let test = repositories::cbt_tests::create(
        state.db(),
        repositories::cbt_tests::CreateTest {
            id: &Uuid::new_v4().to_string(),
            title: payload.title.trim(),
            subject: payload.subject.trim(),
            term: payload.term.trim(),
            class_ids: &class_ids,
            questions: &questions,
            duration_minutes: payload.duration_minutes,
            shuffle: payload.shuffle,
            created_by: &user.id,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create test"))?;

    tracing::info!(
        test_id = %test.id,
        author_id = %user.id,
        questions = questions.len(),
        duration_minutes = test.duration_minutes,
        "Test created"
    );

    Ok((
        StatusCode::CREATED,
        Json(TestDetail { summary: TestSummary::from_db(&test), questions: test.questions.0 }),
    ))
}

pub(super) async fn list_tests(
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<TestSummary>>, ApiError> {
    let tests = if user.role.is_admin() {
        repositories::cbt_tests::list_all(state.db(), page.skip, page.limit).await
    } else {
        repositories::cbt_tests::list_by_author(state.db(), &user.id, page.skip, page.limit).await
    };
    let tests = tests.map_err(|e| ApiError::internal(e, "Failed to list tests"))?;

    Ok(Json(PaginatedResponse {
        items: tests.iter().map(TestSummary::from_db).collect(),
        skip: page.skip,
        limit: page.limit,
    }))
}

pub(super) async fn get_test(
    Path(test_id): Path<String>,
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<TestDetail>, ApiError> {
    let test = fetch_test(state.db(), &test_id).await?;
    ensure_author(&user, &test)?;

    Ok(Json(TestDetail { summary: TestSummary::from_db(&test), questions: test.questions.0 }))
}

pub(super) async fn delete_test(
    Path(test_id): Path<String>,
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let test = fetch_test(state.db(), &test_id).await?;
    ensure_author(&user, &test)?;

    let deleted = repositories::cbt_tests::delete(state.db(), &test.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete test"))?;
    if !deleted {
        return Err(ApiError::NotFound("Test not found".to_string()));
    }

    tracing::info!(test_id = %test.id, by = %user.id, "Test deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn list_results(
    Path(test_id): Path<String>,
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<Vec<AttemptResultResponse>>, ApiError> {
    let test = fetch_test(state.db(), &test_id).await?;
    ensure_author(&user, &test)?;

    let rows = repositories::attempts::list_results_by_test(state.db(), &test.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    Ok(Json(rows.into_iter().map(AttemptResultResponse::from).collect()))
}
