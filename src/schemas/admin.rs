use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{School, SchoolClass};
use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SchoolCreate {
    #[validate(length(min = 1, max = 200, message = "name must not be empty"))]
    pub(crate) name: String,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude out of range"))]
    pub(crate) latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude out of range"))]
    pub(crate) longitude: f64,
    #[serde(default)]
    #[serde(alias = "radiusMeters")]
    #[validate(range(exclusive_min = 0.0, message = "radius_meters must be positive"))]
    pub(crate) radius_meters: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SchoolResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    pub(crate) radius_meters: f64,
    pub(crate) created_at: String,
}

impl From<School> for SchoolResponse {
    fn from(school: School) -> Self {
        Self {
            id: school.id,
            name: school.name,
            latitude: school.latitude,
            longitude: school.longitude,
            radius_meters: school.radius_meters,
            created_at: format_primitive(school.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ClassCreate {
    #[serde(alias = "schoolId")]
    #[validate(length(min = 1, message = "school_id must not be empty"))]
    pub(crate) school_id: String,
    #[validate(length(min = 1, max = 100, message = "name must not be empty"))]
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassResponse {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) name: String,
    pub(crate) created_at: String,
}

impl From<SchoolClass> for ClassResponse {
    fn from(class: SchoolClass) -> Self {
        Self {
            id: class.id,
            school_id: class.school_id,
            name: class.name,
            created_at: format_primitive(class.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AdminUserCreate {
    #[validate(length(min = 3, max = 64, message = "username must be 3-64 characters"))]
    pub(crate) username: String,
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, max = 200, message = "full_name must not be empty"))]
    pub(crate) full_name: String,
    pub(crate) password: String,
    pub(crate) role: UserRole,
    #[serde(default)]
    #[serde(alias = "schoolId")]
    pub(crate) school_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "classId")]
    pub(crate) class_id: Option<String>,
}
