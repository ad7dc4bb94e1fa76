use sqlx::PgPool;

use crate::db::models::School;

const COLUMNS: &str = "id, name, latitude, longitude, radius_meters, created_at";

pub(crate) struct CreateSchool<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    pub(crate) radius_meters: f64,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateSchool<'_>) -> Result<School, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!(
        "INSERT INTO schools (id, name, latitude, longitude, radius_meters, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.latitude)
    .bind(params.longitude)
    .bind(params.radius_meters)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<School>, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!("SELECT {COLUMNS} FROM schools WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}
