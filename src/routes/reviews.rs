use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, post},
};

/// Review Router Module
///
/// Reviews only exist under a listing. Creating one needs a session; deleting one needs
/// the session to belong to the review's author (`ReviewAuthor`).
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/listings/{id}/reviews", post(handlers::create_review))
        .route(
            "/listings/{id}/reviews/{review_id}",
            delete(handlers::delete_review),
        )
}
