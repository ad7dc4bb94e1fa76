use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{ensure_school_access, CurrentStudent, CurrentTeacher};
use crate::api::pagination::{PageQuery, PaginatedResponse};
use crate::api::validation::validate_payload;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, today_utc};
use crate::repositories;
use crate::schemas::attendance::{AttendanceCodeResponse, AttendanceResponse, CheckInRequest};
use crate::services::attendance_codes;
use crate::services::geo::{self, Coordinates, LocationCheck};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/check-in", post(check_in))
        .route("/me", get(my_attendance))
        .route("/classes/:class_id/code", get(class_code))
}

async fn check_in(
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<CheckInRequest>,
) -> Result<(StatusCode, Json<AttendanceResponse>), ApiError> {
    validate_payload(&payload)?;

    let class_id = user
        .class_id
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Student is not assigned to a class".to_string()))?;
    let class = repositories::classes::find_by_id(state.db(), class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch class"))?
        .ok_or_else(|| ApiError::NotFound("Class not found".to_string()))?;
    let school = repositories::schools::find_by_id(state.db(), &class.school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?
        .ok_or_else(|| ApiError::NotFound("School not found".to_string()))?;

    let today = today_utc();
    let expected = attendance_codes::daily_code(
        &state.settings().security().secret_key,
        &class.id,
        today,
        state.settings().attendance().code_length,
    );
    if !attendance_codes::code_matches(&expected, &payload.code) {
        return Err(ApiError::BadRequest("Invalid attendance code".to_string()));
    }

    let device = match (payload.latitude, payload.longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
        (None, None) => None,
        _ => {
            return Err(ApiError::BadRequest(
                "latitude and longitude must be sent together".to_string(),
            ))
        }
    };

    let check = geo::check_location(
        Coordinates::new(school.latitude, school.longitude),
        school.radius_meters,
        device,
    );
    if let LocationCheck::OutOfRange { distance } = check {
        tracing::info!(student_id = %user.id, school_id = %school.id, distance, "Check-in out of range");
        return Err(ApiError::BadRequest(format!(
            "You are {distance:.0} m from school; check-in is allowed within {:.0} m",
            school.radius_meters
        )));
    }
    let verified = matches!(check, LocationCheck::Verified { .. });

    let record = repositories::attendance::create(
        state.db(),
        repositories::attendance::CreateAttendance {
            id: &Uuid::new_v4().to_string(),
            student_id: &user.id,
            school_id: &school.id,
            class_id: &class.id,
            attendance_date: today,
            recorded_at: primitive_now_utc(),
            latitude: device.map(|point| point.latitude),
            longitude: device.map(|point| point.longitude),
            distance_meters: check.distance(),
            location_verified: verified,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record attendance"))?
    .ok_or_else(|| ApiError::Conflict("Attendance already recorded for today".to_string()))?;

    metrics::attendance_check_in(verified);
    tracing::info!(
        student_id = %user.id,
        class_id = %class.id,
        location_verified = verified,
        distance_meters = ?check.distance(),
        "Attendance recorded"
    );

    Ok((StatusCode::CREATED, Json(record.into())))
}

async fn my_attendance(
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<AttendanceResponse>>, ApiError> {
    let records =
        repositories::attendance::list_by_student(state.db(), &user.id, page.skip, page.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list attendance"))?;

    Ok(Json(PaginatedResponse {
        items: records.into_iter().map(AttendanceResponse::from).collect(),
        skip: page.skip,
        limit: page.limit,
    }))
}

/// Today's code for a class; shown by the teacher (for example as a QR code).
async fn class_code(
    Path(class_id): Path<String>,
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<AttendanceCodeResponse>, ApiError> {
    let class = repositories::classes::find_by_id(state.db(), &class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch class"))?
        .ok_or_else(|| ApiError::NotFound("Class not found".to_string()))?;
    ensure_school_access(&user, &class.school_id)?;

    let today = today_utc();
    let code = attendance_codes::daily_code(
        &state.settings().security().secret_key,
        &class.id,
        today,
        state.settings().attendance().code_length,
    );

    Ok(Json(AttendanceCodeResponse { class_id: class.id, date: today.to_string(), code }))
}
