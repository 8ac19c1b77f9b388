use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::jwt::{encode_token, Claims};
use crate::auth::password;
use crate::db;
use crate::error::AppError;
use crate::models::{Role, User};
use crate::state::SharedState;
use crate::validation;

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl UpdateProfileRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if let Err(e) = validation::validate_username(&self.username) {
            errors.push(e);
        }
        if let Err(e) = validation::validate_email(&self.email) {
            errors.push(e);
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
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub repeat_new_password: String,
}

impl UpdatePasswordRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if let Err(e) = validation::validate_password("new password", &self.new_password) {
            errors.push(e);
        }
        if self.new_password != self.repeat_new_password {
            errors.push("passwords do not match!".to_string());
        }
        if self.new_password == self.current_password {
            errors.push("current and new passwords must not match!".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Serialize)]
pub struct UpdateProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Fresh bearer token, present when the username changed.
    pub token: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn me(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<User>, AppError> {
    let user = current_user(&state, &auth).await?;
    Ok(Json(user))
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, AppError> {
    req.validate()?;

    let user = current_user(&state, &auth).await?;

    if db::users::identity_taken_by_other(&state.pool, &req.username, &req.email, user.id).await? {
        return Err(AppError::DataEditing(
            "User with this email or username exists".to_string(),
        ));
    }

    let updated = db::users::update_profile(
        &state.pool,
        user.id,
        &req.username,
        &req.email,
        &req.first_name,
        &req.last_name,
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::DataEditing("User with this email or username exists".to_string())
        }
        _ => AppError::Database(e),
    })?;

    // Old tokens stay valid (claims are keyed by id); hand back a fresh one
    // anyway when the username changed so clients can rotate immediately.
    let token = if updated.username != user.username {
        let claims = Claims::new(updated.id, updated.role.clone());
        Some(encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?)
    } else {
        None
    };

    tracing::info!("User (ID {}) has updated their personal data", user.id);

    Ok(Json(UpdateProfileResponse {
        id: updated.id,
        username: updated.username,
        email: updated.email,
        first_name: updated.first_name,
        last_name: updated.last_name,
        token,
    }))
}

pub async fn update_password(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.validate()?;

    let user = current_user(&state, &auth).await?;

    let valid =
        password::verify(&req.current_password, &user.password_hash).map_err(AppError::Internal)?;
    if !valid {
        return Err(AppError::DataEditing(
            "The current password is incorrect".to_string(),
        ));
    }

    let pw_hash = password::hash(&req.new_password).map_err(AppError::Internal)?;
    db::users::update_password(&state.pool, user.id, &pw_hash).await?;

    tracing::info!("User (ID {}) has updated their password", user.id);

    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}

pub async fn update_role(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RoleRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    auth.require_admin()?;

    let new_role = Role::parse(&req.role).map_err(|_| {
        AppError::Validation(vec![format!(
            "role must be one of: {}",
            Role::ALL.map(Role::as_str).join(", ")
        )])
    })?;

    // Seniority is decided on the actor's stored role, not the token claims.
    let actor = current_user(&state, &auth).await?;
    let target = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {id} not found!")))?;

    let actor_role = Role::parse(&actor.role).map_err(AppError::Internal)?;
    let target_role = Role::parse(&target.role).map_err(AppError::Internal)?;

    check_role_change(actor.id, actor_role, target.id, target_role, new_role)?;

    db::users::update_role(&state.pool, target.id, new_role.as_str()).await?;

    tracing::info!(
        "User (ID {}) has assigned the user (ID {}) {} role",
        actor.id,
        target.id,
        new_role
    );

    Ok(Json(MessageResponse {
        message: "Role updated".to_string(),
    }))
}

async fn current_user(state: &SharedState, auth: &AuthUser) -> Result<User, AppError> {
    db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Authentication("User not found".to_string()))
}

/// Ordered rule chain for role changes. The first violated rule wins.
fn check_role_change(
    actor_id: Uuid,
    actor_role: Role,
    target_id: Uuid,
    target_role: Role,
    new_role: Role,
) -> Result<(), AppError> {
    if actor_id == target_id {
        return Err(AppError::DataEditing(
            "You can't update your role".to_string(),
        ));
    }
    if actor_role.level() <= target_role.level() {
        return Err(AppError::DataEditing(
            "You do not have the authority to change this user's role".to_string(),
        ));
    }
    if actor_role.level() < new_role.level() {
        return Err(AppError::DataEditing(
            "You do not have the authority to assign this role".to_string(),
        ));
    }
    if target_role == new_role {
        return Err(AppError::DataEditing(
            "This user already has this role".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(result: Result<(), AppError>) -> String {
        match result {
            Err(AppError::DataEditing(msg)) => msg,
            other => panic!("expected data editing error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_changing_own_role() {
        let id = Uuid::now_v7();
        let result = check_role_change(id, Role::Admin, id, Role::Admin, Role::User);
        assert_eq!(msg(result), "You can't update your role");
    }

    #[test]
    fn rejects_peer_of_equal_level() {
        let result = check_role_change(
            Uuid::now_v7(),
            Role::Admin,
            Uuid::now_v7(),
            Role::Admin,
            Role::User,
        );
        assert_eq!(
            msg(result),
            "You do not have the authority to change this user's role"
        );
    }

    #[test]
    fn rejects_actor_below_target() {
        let result = check_role_change(
            Uuid::now_v7(),
            Role::User,
            Uuid::now_v7(),
            Role::Admin,
            Role::User,
        );
        assert_eq!(
            msg(result),
            "You do not have the authority to change this user's role"
        );
    }

    #[test]
    fn rejects_noop_assignment() {
        let result = check_role_change(
            Uuid::now_v7(),
            Role::Admin,
            Uuid::now_v7(),
            Role::User,
            Role::User,
        );
        assert_eq!(msg(result), "This user already has this role");
    }

    #[test]
    fn allows_promotion_by_senior_actor() {
        let result = check_role_change(
            Uuid::now_v7(),
            Role::Admin,
            Uuid::now_v7(),
            Role::User,
            Role::Admin,
        );
        assert!(result.is_ok());
    }
}
