use sqlx::PgPool;

use crate::db::models::SchoolClass;

const COLUMNS: &str = "id, school_id, name, created_at";

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    school_id: &str,
    name: &str,
    created_at: time::PrimitiveDateTime,
) -> Result<SchoolClass, sqlx::Error> {
    sqlx::query_as::<_, SchoolClass>(&format!(
        "INSERT INTO classes (id, school_id, name, created_at)
         VALUES ($1,$2,$3,$4)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(school_id)
    .bind(name)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<SchoolClass>, sqlx::Error> {
    sqlx::query_as::<_, SchoolClass>(&format!("SELECT {COLUMNS} FROM classes WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_many(
    pool: &PgPool,
    class_ids: &[String],
) -> Result<Vec<SchoolClass>, sqlx::Error> {
    if class_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, SchoolClass>(&format!("SELECT {COLUMNS} FROM classes WHERE id = ANY($1)"))
        .bind(class_ids)
        .fetch_all(pool)
        .await
}
