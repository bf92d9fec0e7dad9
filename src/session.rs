//! Per-request session context.
//!
//! Everything a handler needs from the client's session travels through
//! [`SessionContext`]: the resolved identity, the post-login return path and the flash
//! messages. Flash messages are pushed by one request and drained exactly once by the
//! next page render.

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{error::AppError, models::UserProfile, repository::RepositoryState};

/// Key under which the authenticated user's id is stored.
pub const USER_ID_KEY: &str = "user_id";
/// Key holding the path to return to after logging in.
pub const REDIRECT_URL_KEY: &str = "redirect_url";
const FLASH_KEY: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashKind {
    Success,
    Error,
}

/// FlashMessages
///
/// Pending notifications, rendered as `successMsg` and `errorMsg` alerts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessages {
    pub success: Vec<String>,
    pub error: Vec<String>,
}

impl FlashMessages {
    pub fn is_empty(&self) -> bool {
        self.success.is_empty() && self.error.is_empty()
    }
}

/// FlashStore
///
/// Push a message now, drain them all once later.
#[async_trait]
pub trait FlashStore: Send + Sync {
    async fn push_flash(&self, kind: FlashKind, message: &str) -> Result<(), AppError>;
    async fn drain_flash(&self) -> Result<FlashMessages, AppError>;
}

#[async_trait]
impl FlashStore for Session {
    async fn push_flash(&self, kind: FlashKind, message: &str) -> Result<(), AppError> {
        let mut pending: FlashMessages = self.get(FLASH_KEY).await?.unwrap_or_default();
        match kind {
            FlashKind::Success => pending.success.push(message.to_string()),
            FlashKind::Error => pending.error.push(message.to_string()),
        }
        self.insert(FLASH_KEY, pending).await?;
        Ok(())
    }

    async fn drain_flash(&self) -> Result<FlashMessages, AppError> {
        Ok(self
            .remove::<FlashMessages>(FLASH_KEY)
            .await?
            .unwrap_or_default())
    }
}

/// Page
///
/// What every rendered page needs besides its own content.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub user: Option<UserProfile>,
    pub flash: FlashMessages,
}

/// SessionContext Extractor
///
/// Wraps the `tower_sessions::Session` for this request and the user it resolves to.
/// The identity is looked up once per request and cached in the request extensions, so
/// guards and handlers can all extract it cheaply.
#[derive(Debug, Clone)]
pub struct SessionContext {
    session: Session,
    user: Option<UserProfile>,
}

impl SessionContext {
    pub fn new(session: Session, user: Option<UserProfile>) -> Self {
        Self { session, user }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub async fn flash(&self, kind: FlashKind, message: &str) -> Result<(), AppError> {
        self.session.push_flash(kind, message).await
    }

    /// Flashes `message` and redirects to `to` (303).
    pub async fn redirect_with(
        &self,
        kind: FlashKind,
        message: &str,
        to: &str,
    ) -> Result<Redirect, AppError> {
        self.flash(kind, message).await?;
        Ok(Redirect::to(to))
    }

    /// Drains the flash messages and packages them with the identity for rendering.
    pub async fn page(&self) -> Result<Page, AppError> {
        Ok(Page {
            user: self.user.clone(),
            flash: self.session.drain_flash().await?,
        })
    }

    /// Binds the session to `user_id`, issuing a fresh session id.
    pub async fn log_in(&self, user_id: Uuid) -> Result<(), AppError> {
        self.session.cycle_id().await?;
        self.session.insert(USER_ID_KEY, user_id).await?;
        Ok(())
    }

    pub async fn log_out(&self) -> Result<(), AppError> {
        self.session.remove::<Uuid>(USER_ID_KEY).await?;
        self.session.remove::<String>(REDIRECT_URL_KEY).await?;
        Ok(())
    }

    pub async fn remember_return_to(&self, path: &str) -> Result<(), AppError> {
        self.session.insert(REDIRECT_URL_KEY, path).await?;
        Ok(())
    }

    pub async fn take_return_to(&self) -> Result<Option<String>, AppError> {
        Ok(self.session.remove::<String>(REDIRECT_URL_KEY).await?)
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<SessionContext>() {
            return Ok(ctx.clone());
        }

        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let user_id = session
            .get::<Uuid>(USER_ID_KEY)
            .await
            .map_err(|e| AppError::from(e).into_response())?;

        // A session pointing at a user that no longer exists is treated as anonymous.
        let user = match user_id {
            Some(id) => {
                let repo = RepositoryState::from_ref(state);
                repo.get_user(id)
                    .await
                    .map_err(IntoResponse::into_response)?
                    .map(|user| UserProfile::from(&user))
            }
            None => None,
        };

        let ctx = SessionContext::new(session, user);
        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}
