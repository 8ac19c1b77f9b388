pub mod auth;
pub mod projects;
pub mod users;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/register/admin", post(auth::register_admin))
        .route("/auth/login", post(auth::login))
        // Projects
        .route("/projects", get(projects::list).post(projects::create))
        .route(
            "/projects/{id}",
            get(projects::get)
                .put(projects::update)
                .delete(projects::delete),
        )
        // Users
        .route("/users/me", get(users::me).put(users::update_profile))
        .route("/users/me/password", put(users::update_password))
        .route("/users/{id}/role", put(users::update_role))
}
