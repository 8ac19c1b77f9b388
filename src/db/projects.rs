use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Project;

/// Listing order: lifecycle stage first, then newest id within a stage.
const STATUS_ORDER: &str = "CASE status
    WHEN 'INITIATED' THEN 1
    WHEN 'IN_PROGRESS' THEN 2
    WHEN 'COMPLETED' THEN 3
    ELSE 4 END";

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    name: &str,
    description: Option<&str>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "INSERT INTO projects (id, user_id, name, description, start_date, end_date)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(name)
    .bind(description)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(pool)
    .await
}

pub async fn list_by_user(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT * FROM projects WHERE user_id = $1 AND NOT is_deleted
         ORDER BY {STATUS_ORDER}, id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1 AND NOT is_deleted")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    name: &str,
    description: Option<&str>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: Option<&str>,
) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "UPDATE projects
         SET name = $2, description = $3, start_date = $4, end_date = $5,
             status = COALESCE($6, status), updated_at = now()
         WHERE id = $1 AND NOT is_deleted RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(start_date)
    .bind(end_date)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE projects SET is_deleted = TRUE, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
