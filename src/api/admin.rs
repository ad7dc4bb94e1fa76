use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::validation::{validate_password_len, validate_payload, validate_username};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::admin::{
    AdminUserCreate, ClassCreate, ClassResponse, SchoolCreate, SchoolResponse,
};
use crate::schemas::user::UserResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/schools", post(create_school))
        .route("/classes", post(create_class))
        .route("/users", post(create_user))
}

async fn create_school(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SchoolCreate>,
) -> Result<(StatusCode, Json<SchoolResponse>), ApiError> {
    validate_payload(&payload)?;

    let radius_meters =
        payload.radius_meters.unwrap_or(state.settings().attendance().default_radius_meters);
    let school = repositories::schools::create(
        state.db(),
        repositories::schools::CreateSchool {
            id: &Uuid::new_v4().to_string(),
            name: payload.name.trim(),
            latitude: payload.latitude,
            longitude: payload.longitude,
            radius_meters,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create school"))?;

    tracing::info!(school_id = %school.id, by = %admin.id, "School created");
    Ok((StatusCode::CREATED, Json(school.into())))
}

async fn create_class(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ClassCreate>,
) -> Result<(StatusCode, Json<ClassResponse>), ApiError> {
    validate_payload(&payload)?;

    let school = repositories::schools::find_by_id(state.db(), &payload.school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?
        .ok_or_else(|| ApiError::NotFound("School not found".to_string()))?;

    let class = repositories::classes::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        &school.id,
        payload.name.trim(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| {
        if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
            ApiError::Conflict("Class already exists in this school".to_string())
        } else {
            ApiError::internal(e, "Failed to create class")
        }
    })?;

    tracing::info!(class_id = %class.id, school_id = %school.id, by = %admin.id, "Class created");
    Ok((StatusCode::CREATED, Json(class.into())))
}

async fn create_user(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<AdminUserCreate>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_payload(&payload)?;
    validate_username(&payload.username)?;
    validate_password_len(&payload.password)?;

    if payload.role == UserRole::Superadmin && admin.role != UserRole::Superadmin {
        return Err(ApiError::Forbidden("Only a superadmin can create superadmins"));
    }

    let class = match payload.class_id.as_deref() {
        Some(class_id) => Some(
            repositories::classes::find_by_id(state.db(), class_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch class"))?
                .ok_or_else(|| ApiError::BadRequest("Unknown class_id".to_string()))?,
        ),
        None => None,
    };
    if payload.role == UserRole::Student && class.is_none() {
        return Err(ApiError::BadRequest("Students must be assigned to a class".to_string()));
    }

    // A class implies its school.
    let school_id = match (&class, payload.school_id.as_deref()) {
        (Some(class), Some(school_id)) if class.school_id != school_id => {
            return Err(ApiError::BadRequest("class_id does not belong to school_id".to_string()));
        }
        (Some(class), _) => Some(class.school_id.clone()),
        (None, Some(school_id)) => {
            repositories::schools::find_by_id(state.db(), school_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?
                .ok_or_else(|| ApiError::BadRequest("Unknown school_id".to_string()))?;
            Some(school_id.to_string())
        }
        (None, None) => None,
    };

    let existing = repositories::users::exists_by_username(state.db(), &payload.username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Username is already taken".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;
    let now = primitive_now_utc();

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: &payload.username,
            hashed_password,
            full_name: payload.full_name.trim(),
            role: payload.role,
            school_id: school_id.as_deref(),
            class_id: class.as_ref().map(|class| class.id.as_str()),
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?;

    tracing::info!(user_id = %user.id, role = ?user.role, by = %admin.id, "User created");
    Ok((StatusCode::CREATED, Json(UserResponse::from_db(user))))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::db::types::UserRole;
    use crate::test_support::{self, send};

    #[tokio::test]
    #[ignore = "requires postgres and redis"]
    async fn admin_provisions_school_class_and_student() {
        let ctx = test_support::setup_test_context().await;
        let admin =
            test_support::insert_user(ctx.state.db(), "root", "admin-pass", UserRole::Superadmin, None)
                .await;
        let token = test_support::bearer_token(&admin.id, ctx.state.settings());

        let (status, school) = send(
            &ctx,
            Method::POST,
            "/api/v1/admin/schools",
            &token,
            Some(json!({ "name": "Unity College", "latitude": 6.5244, "longitude": 3.3792 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "response: {school}");
        let school_id = school["id"].as_str().expect("school id").to_string();
        assert_eq!(school["radius_meters"], 200.0);

        let class_body = json!({ "school_id": school_id, "name": "SS1 Gold" });
        let (status, class) =
            send(&ctx, Method::POST, "/api/v1/admin/classes", &token, Some(class_body.clone()))
                .await;
        assert_eq!(status, StatusCode::CREATED, "response: {class}");
        let class_id = class["id"].as_str().expect("class id").to_string();

        let (status, _) =
            send(&ctx, Method::POST, "/api/v1/admin/classes", &token, Some(class_body)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let student = json!({
            "username": "chidi",
            "full_name": "Chidi Okeke",
            "password": "student-pass",
            "role": "student",
            "class_id": class_id
        });
        let (status, created) =
            send(&ctx, Method::POST, "/api/v1/admin/users", &token, Some(student.clone())).await;
        assert_eq!(status, StatusCode::CREATED, "response: {created}");
        assert_eq!(created["school_id"], school_id.as_str());

        let (status, _) =
            send(&ctx, Method::POST, "/api/v1/admin/users", &token, Some(student)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &ctx,
            Method::POST,
            "/api/v1/admin/users",
            &token,
            Some(json!({
                "username": "classless",
                "full_name": "No Class",
                "password": "student-pass",
                "role": "student"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    }

    #[tokio::test]
    #[ignore = "requires postgres and redis"]
    async fn teachers_cannot_provision() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_user(ctx.state.db(), "mrs.eze", "teacher-pass", UserRole::Teacher, None)
                .await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let (status, _) = send(
            &ctx,
            Method::POST,
            "/api/v1/admin/schools",
            &token,
            Some(json!({ "name": "Shadow School", "latitude": 0.0, "longitude": 0.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
