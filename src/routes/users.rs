use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// User Router Module
///
/// Account flows. Logging in binds the session to a user; the listing and review
/// guards read that binding on every request.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", get(handlers::signup_form).post(handlers::signup))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
}
