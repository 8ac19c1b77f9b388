use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::{Project, ProjectStatus};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Deserialize)]
pub struct UpdateProject {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Project>>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let projects = db::projects::list_by_user(&state.pool, auth.user_id, per_page, offset).await?;
    Ok(Json(projects))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateProject>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    validate_fields(&req.name, req.description.as_deref(), req.start_date, req.end_date, None)?;

    let project = db::projects::create(
        &state.pool,
        auth.user_id,
        &req.name,
        req.description.as_deref(),
        req.start_date,
        req.end_date,
    )
    .await?;

    tracing::info!(
        "User (ID {}) created a new project (ID {})",
        auth.user_id,
        project.id
    );

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, AppError> {
    let project = owned_project(&state, id, &auth).await?;
    Ok(Json(project))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProject>,
) -> Result<Json<Project>, AppError> {
    validate_fields(
        &req.name,
        req.description.as_deref(),
        req.start_date,
        req.end_date,
        req.status.as_deref(),
    )?;

    owned_project(&state, id, &auth).await?;

    let project = db::projects::update(
        &state.pool,
        id,
        &req.name,
        req.description.as_deref(),
        req.start_date,
        req.end_date,
        req.status.as_deref(),
    )
    .await?;

    tracing::info!("User (ID {}) updated a project (ID {})", auth.user_id, id);

    Ok(Json(project))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    owned_project(&state, id, &auth).await?;
    db::projects::soft_delete(&state.pool, id).await?;

    tracing::info!("User (ID {}) deleted a project (ID {})", auth.user_id, id);

    Ok(StatusCode::NO_CONTENT)
}

/// Resolve a project the actor owns. Missing ids and foreign projects are
/// reported differently: the id exists or it does not, but only the owner
/// may touch it.
async fn owned_project(
    state: &SharedState,
    id: Uuid,
    auth: &AuthUser,
) -> Result<Project, AppError> {
    let project = db::projects::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project with id {id} is not found")))?;

    if project.user_id != auth.user_id {
        return Err(AppError::AccessDenied(format!(
            "You do not have a project with id {id}"
        )));
    }

    Ok(project)
}

fn validate_fields(
    name: &str,
    description: Option<&str>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: Option<&str>,
) -> Result<(), AppError> {
    let mut errors = Vec::new();

    let name_len = name.chars().count();
    if !(2..=50).contains(&name_len) {
        errors.push("name must be between 2 and 50 characters".to_string());
    }
    if description.is_some_and(|d| d.chars().count() > 254) {
        errors.push("description must be at most 254 characters".to_string());
    }

    let today = Utc::now().date_naive();
    if start_date < today {
        errors.push("start date must not be in the past".to_string());
    }
    if end_date < today {
        errors.push("end date must not be in the past".to_string());
    }
    if start_date > end_date {
        errors.push("start date must be on or before end date".to_string());
    }

    if let Some(status) = status {
        if ProjectStatus::parse(status).is_err() {
            errors.push(format!(
                "status must be one of: {}",
                ProjectStatus::ALL.map(ProjectStatus::as_str).join(", ")
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}
