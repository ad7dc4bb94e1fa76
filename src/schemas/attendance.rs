use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::AttendanceRecord;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CheckInRequest {
    #[validate(length(min = 1, max = 64, message = "code must not be empty"))]
    pub(crate) code: String,
    #[serde(default)]
    #[validate(range(min = -90.0, max = 90.0, message = "latitude out of range"))]
    pub(crate) latitude: Option<f64>,
    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0, message = "longitude out of range"))]
    pub(crate) longitude: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttendanceResponse {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) class_id: String,
    pub(crate) date: String,
    pub(crate) recorded_at: String,
    pub(crate) location_verified: bool,
    pub(crate) distance_meters: Option<f64>,
}

impl From<AttendanceRecord> for AttendanceResponse {
    fn from(record: AttendanceRecord) -> Self {
        Self {
            id: record.id,
            school_id: record.school_id,
            class_id: record.class_id,
            date: record.attendance_date.to_string(),
            recorded_at: format_primitive(record.recorded_at),
            location_verified: record.location_verified,
            distance_meters: record.distance_meters,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttendanceCodeResponse {
    pub(crate) class_id: String,
    pub(crate) date: String,
    pub(crate) code: String,
}
