use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, Method},
    response::Redirect,
    routing::get,
};
use time::Duration;
use tower::{Layer, ServiceBuilder, util::MapRequest, util::MapRequestLayer};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tracing::{Level, Span};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;
pub mod validation;
pub mod views;

// Module for routing, one file per resource.
pub mod routes;
use routes::{listings, reviews, users};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// Sessions expire after this long without a request.
const SESSION_IDLE_DAYS: i64 = 7;

/// ApiDoc
///
/// OpenAPI description of the HTTP surface, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index, handlers::new_listing_form, handlers::show_listing,
        handlers::create_listing, handlers::edit_listing_form, handlers::update_listing,
        handlers::delete_listing, handlers::create_review, handlers::delete_review,
        handlers::signup_form, handlers::signup, handlers::login_form, handlers::login,
        handlers::logout
    ),
    components(
        schemas(
            models::Listing, models::Image, models::StoredImage, models::Review,
            models::ReviewDetails, models::ListingDetails, models::UserProfile,
            models::RawListing, models::ListingEnvelope, models::ListingFormFields,
            models::NumberField, models::ReviewFormFields, models::SignupForm, models::LoginForm,
        )
    ),
    tags(
        (name = "listings", description = "Server-rendered listings marketplace")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable application state: the persistence layer and the configuration.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in production, in-memory for local runs and tests.
    pub repo: RepositoryState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, the session layer and the observability layers,
/// and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // Server-held sessions: the cookie only carries the session id.
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(state.config.secure_cookies())
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_IDLE_DAYS)));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(|| async { "ok" }))
        .route("/", get(|| async { Redirect::to("/listings") }))
        .merge(listings::listing_routes())
        .merge(reviews::review_routes())
        .merge(users::user_routes())
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(session_layer);

    base_router.layer(
        ServiceBuilder::new()
            // Request ID Generation: a UUID for every incoming request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            // Request Tracing: one span per request carrying the request ID.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // Request ID Propagation: echo x-request-id back to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// The complete service: the router behind the method override.
pub type App = MapRequest<Router, fn(Request) -> Request>;

/// create_app
///
/// Wraps the router so HTML forms can reach PUT and DELETE routes. The override has to
/// run before routing, which is why it wraps the router instead of being one of its
/// layers.
pub fn create_app(state: AppState) -> App {
    MapRequestLayer::new(override_method as fn(Request) -> Request).layer(create_router(state))
}

/// override_method
///
/// Rewrites `POST ...?_method=PUT|PATCH|DELETE` to the named method.
pub fn override_method(mut request: Request) -> Request {
    if request.method() != Method::POST {
        return request;
    }

    let overridden = request
        .uri()
        .query()
        .and_then(|query| {
            query
                .split('&')
                .find_map(|pair| pair.strip_prefix("_method="))
        })
        .and_then(|name| match name.to_ascii_uppercase().as_str() {
            "PUT" => Some(Method::PUT),
            "PATCH" => Some(Method::PATCH),
            "DELETE" => Some(Method::DELETE),
            _ => None,
        });

    if let Some(method) = overridden {
        *request.method_mut() = method;
    }
    request
}

/// trace_span_logger
///
/// Builds the per-request span: method, URI and the `x-request-id` header, so every log
/// line for a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
