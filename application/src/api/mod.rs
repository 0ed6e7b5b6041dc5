//! REST API definitions.

pub mod session;
pub mod user;

use axum::{
    routing::{get, post},
    Router,
};

/// Builds the [`Router`] of the REST API.
///
/// Management routes under `/users` require an
/// [`user::Role::Admin`] [`Session`].
///
/// [`Session`]: service::domain::user::Session
/// [`user::Role::Admin`]: service::domain::user::Role::Admin
pub fn router() -> Router {
    Router::new()
        .route("/register", post(user::register))
        .route("/login", post(session::login))
        .route("/refresh", post(session::refresh))
        .route("/logout", post(session::logout))
        .route("/me", get(session::me))
        .route("/users", get(user::list))
        .route(
            "/users/:id",
            get(user::find_by_id)
                .put(user::update)
                .delete(user::delete),
        )
}
