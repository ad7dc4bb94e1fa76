use sqlx::PgPool;
use time::{Date, PrimitiveDateTime};

use crate::db::models::AttendanceRecord;

const COLUMNS: &str = "\
    id, student_id, school_id, class_id, attendance_date, recorded_at, \
    latitude, longitude, distance_meters, location_verified";

pub(crate) struct CreateAttendance<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) school_id: &'a str,
    pub(crate) class_id: &'a str,
    pub(crate) attendance_date: Date,
    pub(crate) recorded_at: PrimitiveDateTime,
    pub(crate) latitude: Option<f64>,
    pub(crate) longitude: Option<f64>,
    pub(crate) distance_meters: Option<f64>,
    pub(crate) location_verified: bool,
}

/// Inserts the day's record; `None` when the student already checked in that day.
pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAttendance<'_>,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&format!(
        "INSERT INTO attendance_records (
            id, student_id, school_id, class_id, attendance_date, recorded_at,
            latitude, longitude, distance_meters, location_verified
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        ON CONFLICT (student_id, attendance_date) DO NOTHING
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.school_id)
    .bind(params.class_id)
    .bind(params.attendance_date)
    .bind(params.recorded_at)
    .bind(params.latitude)
    .bind(params.longitude)
    .bind(params.distance_meters)
    .bind(params.location_verified)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_student(
    pool: &PgPool,
    student_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {COLUMNS} FROM attendance_records WHERE student_id = $1
         ORDER BY attendance_date DESC OFFSET $2 LIMIT $3"
    ))
    .bind(student_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}
