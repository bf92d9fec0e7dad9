use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString},
};
use axum::{
    extract::{FromRef, FromRequestParts, Path},
    http::{Method, request::Parts},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Listing, Review},
    repository::RepositoryState,
    session::{FlashKind, SessionContext},
};

pub const LOGIN_PATH: &str = "/login";
pub const LISTINGS_PATH: &str = "/listings";

pub const LOGIN_REQUIRED: &str = "You must be logged in to do that!";
pub const NOT_OWNER: &str = "You don't have permission to modify this listing!";
pub const NOT_REVIEW_AUTHOR: &str = "You don't have permission to delete this review!";
pub const LISTING_MISSING: &str = "Listing you requested for does not exist!";

/// AuthUser Extractor Result
///
/// The resolved identity of a logged-in request, plus the session context it came from
/// so the handler can keep flashing messages.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub ctx: SessionContext,
}

/// AuthUser Extractor Implementation (isLoggedIn)
///
/// Rejection: when nobody is logged in, the requested path is remembered (GET requests
/// only, so the post-login redirect is always something a browser can fetch), an error
/// is flashed and the client is sent to the login page.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = SessionContext::from_request_parts(parts, state).await?;

        if let Some(user) = ctx.user() {
            return Ok(AuthUser {
                id: user.id,
                username: user.username.clone(),
                ctx: ctx.clone(),
            });
        }

        let reject = async {
            if parts.method == Method::GET {
                let requested = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or(LISTINGS_PATH);
                ctx.remember_return_to(requested).await?;
            }
            ctx.redirect_with(FlashKind::Error, LOGIN_REQUIRED, LOGIN_PATH).await
        };

        Err(reject.await.into_response())
    }
}

/// Parses a path id. Anything that is not a UUID cannot name a stored record.
pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

/// OwnedListing Extractor (isLoggedIn + isOwner)
///
/// Resolves the `{id}` listing for a logged-in user and only lets the request through
/// when that user owns it. A missing listing redirects to the index; somebody else's
/// listing redirects back to its detail page.
#[derive(Debug, Clone)]
pub struct OwnedListing {
    pub user: AuthUser,
    pub listing: Listing,
}

impl<S> FromRequestParts<S> for OwnedListing
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let Path(raw_id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let repo = RepositoryState::from_ref(state);
        let listing = match parse_id(&raw_id) {
            Some(id) => repo
                .find_listing(id)
                .await
                .map_err(IntoResponse::into_response)?,
            None => None,
        };

        let redirect = match listing {
            Some(listing) if listing.owner == user.id => return Ok(OwnedListing { user, listing }),
            Some(listing) => {
                tracing::warn!(listing_id = %listing.id, user_id = %user.id, "ownership check failed");
                user.ctx
                    .redirect_with(
                        FlashKind::Error,
                        NOT_OWNER,
                        &format!("{LISTINGS_PATH}/{}", listing.id),
                    )
                    .await
            }
            None => {
                user.ctx
                    .redirect_with(FlashKind::Error, LISTING_MISSING, LISTINGS_PATH)
                    .await
            }
        };

        Err(redirect.into_response())
    }
}

/// ReviewAuthor Extractor (isLoggedIn + isReviewAuthor)
///
/// Guards `/listings/{id}/reviews/{review_id}`: the logged-in user must have written the
/// review. Every rejection lands back on the listing's detail page.
#[derive(Debug, Clone)]
pub struct ReviewAuthor {
    pub user: AuthUser,
    pub listing_id: Uuid,
    pub review: Review,
}

impl<S> FromRequestParts<S> for ReviewAuthor
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let Path((raw_listing_id, raw_review_id)) =
            Path::<(String, String)>::from_request_parts(parts, state)
                .await
                .map_err(IntoResponse::into_response)?;

        let Some(listing_id) = parse_id(&raw_listing_id) else {
            return Err(user
                .ctx
                .redirect_with(FlashKind::Error, LISTING_MISSING, LISTINGS_PATH)
                .await
                .into_response());
        };

        let repo = RepositoryState::from_ref(state);
        let review = match parse_id(&raw_review_id) {
            Some(id) => repo
                .find_review(id)
                .await
                .map_err(IntoResponse::into_response)?,
            None => None,
        };

        match review {
            Some(review) if review.author == user.id => Ok(ReviewAuthor {
                user,
                listing_id,
                review,
            }),
            _ => Err(user
                .ctx
                .redirect_with(
                    FlashKind::Error,
                    NOT_REVIEW_AUTHOR,
                    &format!("{LISTINGS_PATH}/{listing_id}"),
                )
                .await
                .into_response()),
        }
    }
}

// --- Password hashing ---

/// Argon2id over a fresh per-user salt, encoded as a PHC string (`$argon2id$v=19$...`)
/// so the salt and parameters are stored with the hash.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Password(e.to_string()))
}

/// A wrong password is `Ok(false)`. A stored value that is not a PHC string is an error.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored).map_err(|e| AppError::Password(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Password(e.to_string())),
    }
}
