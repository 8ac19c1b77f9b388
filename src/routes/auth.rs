use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::{encode_token, Claims};
use crate::auth::password;
use crate::db;
use crate::error::AppError;
use crate::models::Role;
use crate::state::SharedState;
use crate::validation;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub repeat_password: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if let Err(e) = validation::validate_username(&self.username) {
            errors.push(e);
        }
        if let Err(e) = validation::validate_email(&self.email) {
            errors.push(e);
        }
        if let Err(e) = validation::validate_password("password", &self.password) {
            errors.push(e);
        }
        if self.password != self.repeat_password {
            errors.push("passwords do not match!".to_string());
        }
        if let Err(e) = validation::validate_name("first name", &self.first_name) {
            errors.push(e);
        }
        if let Err(e) = validation::validate_name("last name", &self.last_name) {
            errors.push(e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email_or_username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    register_user(&state, req, false).await
}

pub async fn register_admin(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    register_user(&state, req, true).await
}

async fn register_user(
    state: &SharedState,
    req: RegisterRequest,
    is_admin: bool,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    req.validate()?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;
    let role = if is_admin { Role::Admin } else { Role::User };

    // Check-then-insert in one transaction; the partial unique indexes
    // backstop a concurrent registration of the same identity.
    let mut tx = state.pool.begin().await?;

    if db::users::find_by_username(&mut *tx, &req.username)
        .await?
        .is_some()
        || db::users::find_by_email(&mut *tx, &req.email).await?.is_some()
    {
        return Err(AppError::Authentication(
            "Unable to complete registration!".to_string(),
        ));
    }

    let user = db::users::create(
        &mut *tx,
        &req.username,
        &req.email,
        &pw_hash,
        &req.first_name,
        &req.last_name,
        role.as_str(),
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Authentication("Unable to complete registration!".to_string())
        }
        _ => AppError::Database(e),
    })?;

    tx.commit().await?;

    tracing::info!("Registered new user (ID {})", user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }),
    ))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if state.login_limiter.check(&req.email_or_username).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    // An identifier with '@' is an email address, anything else a username.
    let user = if req.email_or_username.contains('@') {
        db::users::find_by_email(&state.pool, &req.email_or_username).await?
    } else {
        db::users::find_by_username(&state.pool, &req.email_or_username).await?
    }
    .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

    let valid = password::verify(&req.password, &user.password_hash).map_err(AppError::Internal)?;

    if !valid {
        state.login_limiter.record_failure(&req.email_or_username);
        tracing::warn!(
            "User (ID {}) tried to log in, but entered an incorrect password",
            user.id
        );
        return Err(AppError::Authentication(
            "Invalid username or password".to_string(),
        ));
    }

    let claims = Claims::new(user.id, user.role.clone());
    let token = encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;

    tracing::info!("User (ID {}) logged in", user.id);

    Ok(Json(LoginResponse { token }))
}
