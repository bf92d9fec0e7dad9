use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Listing Router Module
///
/// The listings resource. Access control is not a router layer here because public
/// and guarded verbs share paths; each handler declares what it needs through its
/// extractors instead:
/// - no guard: `SessionContext` only (index, detail);
/// - isLoggedIn: `AuthUser` (new form, create);
/// - isLoggedIn + isOwner: `OwnedListing` (edit form, update, delete).
pub fn listing_routes() -> Router<AppState> {
    Router::new()
        // GET /listings: every listing. POST /listings: create (payload validated).
        .route(
            "/listings",
            get(handlers::index).post(handlers::create_listing),
        )
        // GET /listings/new
        // Static segment, so it wins over `/listings/{id}`.
        .route("/listings/new", get(handlers::new_listing_form))
        // GET: detail page with owner and reviews. PUT/DELETE: owner only.
        .route(
            "/listings/{id}",
            get(handlers::show_listing)
                .put(handlers::update_listing)
                .delete(handlers::delete_listing),
        )
        .route("/listings/{id}/edit", get(handlers::edit_listing_form))
}
