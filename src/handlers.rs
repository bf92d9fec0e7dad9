use crate::{
    AppState,
    auth::{self, AuthUser, LISTING_MISSING, LISTINGS_PATH, OwnedListing, ReviewAuthor},
    error::AppError,
    models::{Listing, ListingFormFields, LoginForm, Review, ReviewFormFields, SignupForm, User},
    session::{FlashKind, SessionContext},
    validation::{ValidListing, ValidReview},
    views,
};
use axum::{
    Form,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use uuid::Uuid;

fn listing_path(id: Uuid) -> String {
    format!("{LISTINGS_PATH}/{id}")
}

// --- Listing Handlers ---

/// index
///
/// [Public Route] Lists every listing.
#[utoipa::path(
    get,
    path = "/listings",
    responses((status = 200, description = "Rendered list", body = String, content_type = "text/html"))
)]
pub async fn index(
    ctx: SessionContext,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let listings = state.repo.find_listings().await?;
    Ok(views::index(&ctx.page().await?, &listings))
}

/// new_listing_form
///
/// [Authenticated Route] Renders the creation form.
#[utoipa::path(
    get,
    path = "/listings/new",
    responses(
        (status = 200, description = "Rendered form", body = String, content_type = "text/html"),
        (status = 303, description = "Not logged in, redirect to /login")
    )
)]
pub async fn new_listing_form(user: AuthUser) -> Result<Html<String>, AppError> {
    Ok(views::new_form(&user.ctx.page().await?))
}

/// show_listing
///
/// [Public Route] Detail page: the listing with its owner and its reviews (each with
/// its author). A missing or malformed id flashes an error and goes back to the index.
#[utoipa::path(
    get,
    path = "/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Rendered detail", body = String, content_type = "text/html"),
        (status = 303, description = "Listing does not exist, redirect to /listings")
    )
)]
pub async fn show_listing(
    ctx: SessionContext,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let details = match auth::parse_id(&raw_id) {
        Some(id) => state.repo.find_listing_details(id).await?,
        None => None,
    };

    match details {
        Some(details) => Ok(views::show(&ctx.page().await?, &details).into_response()),
        None => Ok(ctx
            .redirect_with(FlashKind::Error, LISTING_MISSING, LISTINGS_PATH)
            .await?
            .into_response()),
    }
}

/// create_listing
///
/// [Authenticated Route] Creates a listing owned by the logged-in user. The payload is
/// validated before anything is written.
#[utoipa::path(
    post,
    path = "/listings",
    request_body(content = ListingFormFields, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created, redirect to /listings"),
        (status = 400, description = "Payload failed validation")
    )
)]
pub async fn create_listing(
    user: AuthUser,
    State(state): State<AppState>,
    ValidListing(input): ValidListing,
) -> Result<Redirect, AppError> {
    let listing = Listing::new(input, user.id);
    state.repo.create_listing(&listing).await?;

    tracing::info!(listing_id = %listing.id, owner = %user.id, "listing created");
    user.ctx
        .redirect_with(FlashKind::Success, "New Listing Created!", LISTINGS_PATH)
        .await
}

/// edit_listing_form
///
/// [Owner Route] Renders the edit form for the caller's own listing.
#[utoipa::path(
    get,
    path = "/listings/{id}/edit",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Rendered form", body = String, content_type = "text/html"),
        (status = 303, description = "Not logged in, not the owner, or missing")
    )
)]
pub async fn edit_listing_form(
    OwnedListing { user, listing }: OwnedListing,
) -> Result<Html<String>, AppError> {
    Ok(views::edit_form(&user.ctx.page().await?, &listing))
}

/// update_listing
///
/// [Owner Route] Merges the validated payload over the stored listing and writes it
/// back. The listing was normalized when loaded, so a legacy image is persisted in the
/// structured form.
#[utoipa::path(
    put,
    path = "/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body(content = ListingFormFields, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated, redirect to /listings/{id}"),
        (status = 400, description = "Payload failed validation")
    )
)]
pub async fn update_listing(
    OwnedListing { user, mut listing }: OwnedListing,
    State(state): State<AppState>,
    ValidListing(input): ValidListing,
) -> Result<Redirect, AppError> {
    listing.apply(input);

    if !state.repo.update_listing(&listing).await? {
        // Deleted between the ownership check and the write.
        return user
            .ctx
            .redirect_with(FlashKind::Error, LISTING_MISSING, LISTINGS_PATH)
            .await;
    }

    tracing::info!(listing_id = %listing.id, "listing updated");
    user.ctx
        .redirect_with(FlashKind::Success, "Listing Updated!", &listing_path(listing.id))
        .await
}

/// delete_listing
///
/// [Owner Route] Removes the listing. Its reviews are not touched.
#[utoipa::path(
    delete,
    path = "/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses((status = 303, description = "Deleted, redirect to /listings"))
)]
pub async fn delete_listing(
    OwnedListing { user, listing }: OwnedListing,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    state.repo.delete_listing(listing.id).await?;

    tracing::info!(listing_id = %listing.id, "listing deleted");
    user.ctx
        .redirect_with(FlashKind::Success, "Listing Deleted!", LISTINGS_PATH)
        .await
}

// --- Review Handlers ---

/// create_review
///
/// [Authenticated Route] Attaches a new review, authored by the caller, to a listing.
#[utoipa::path(
    post,
    path = "/listings/{id}/reviews",
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body(content = ReviewFormFields, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created, redirect to /listings/{id}"),
        (status = 400, description = "Payload failed validation")
    )
)]
pub async fn create_review(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ValidReview(input): ValidReview,
) -> Result<Redirect, AppError> {
    let review = Review::new(input, user.id);

    let added = match auth::parse_id(&raw_id) {
        Some(id) => state.repo.add_review(id, &review).await?.then_some(id),
        None => None,
    };

    let Some(listing_id) = added else {
        return user
            .ctx
            .redirect_with(FlashKind::Error, LISTING_MISSING, LISTINGS_PATH)
            .await;
    };

    tracing::info!(review_id = %review.id, author = %user.id, "review created");
    user.ctx
        .redirect_with(FlashKind::Success, "New Review Created!", &listing_path(listing_id))
        .await
}

/// delete_review
///
/// [Author Route] Deletes one of the caller's own reviews.
#[utoipa::path(
    delete,
    path = "/listings/{id}/reviews/{review_id}",
    params(
        ("id" = Uuid, Path, description = "Listing ID"),
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    responses((status = 303, description = "Deleted, redirect to /listings/{id}"))
)]
pub async fn delete_review(
    ReviewAuthor {
        user,
        listing_id,
        review,
    }: ReviewAuthor,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    state.repo.delete_review(listing_id, review.id).await?;

    tracing::info!(review_id = %review.id, "review deleted");
    user.ctx
        .redirect_with(FlashKind::Success, "Review Deleted!", &listing_path(listing_id))
        .await
}

// --- User Handlers ---

#[utoipa::path(
    get,
    path = "/signup",
    responses((status = 200, description = "Rendered form", body = String, content_type = "text/html"))
)]
pub async fn signup_form(ctx: SessionContext) -> Result<Html<String>, AppError> {
    Ok(views::signup_form(&ctx.page().await?))
}

/// signup
///
/// [Public Route] Registers a user and logs them straight in.
#[utoipa::path(
    post,
    path = "/signup",
    request_body(content = SignupForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Registered, redirect to /listings"))
)]
pub async fn signup(
    ctx: SessionContext,
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Redirect, AppError> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return ctx
            .redirect_with(FlashKind::Error, "Username and password are required.", "/signup")
            .await;
    }

    if state.repo.find_user_by_username(username).await?.is_some() {
        return ctx
            .redirect_with(
                FlashKind::Error,
                "A user with the given username is already registered",
                "/signup",
            )
            .await;
    }

    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: form.email.trim().to_string(),
        password_hash: auth::hash_password(&form.password)?,
    };
    state.repo.create_user(&user).await?;
    ctx.log_in(user.id).await?;

    tracing::info!(user_id = %user.id, "user registered");
    ctx.redirect_with(FlashKind::Success, "Welcome to the marketplace!", LISTINGS_PATH)
        .await
}

#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Rendered form", body = String, content_type = "text/html"))
)]
pub async fn login_form(ctx: SessionContext) -> Result<Html<String>, AppError> {
    Ok(views::login_form(&ctx.page().await?))
}

/// login
///
/// [Public Route] Verifies credentials and sends the user back to wherever the login
/// guard intercepted them, or to the index.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to the remembered path, /listings, or back to /login"))
)]
pub async fn login(
    ctx: SessionContext,
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, AppError> {
    let user = state.repo.find_user_by_username(form.username.trim()).await?;

    let verified = match &user {
        Some(user) => auth::verify_password(&form.password, &user.password_hash)?,
        None => false,
    };

    let Some(user) = user.filter(|_| verified) else {
        return ctx
            .redirect_with(FlashKind::Error, "Invalid username or password.", auth::LOGIN_PATH)
            .await;
    };

    // Read before log_in, which keeps the data but issues a new session id.
    let return_to = ctx.take_return_to().await?;
    ctx.log_in(user.id).await?;

    tracing::info!(user_id = %user.id, "user logged in");
    ctx.redirect_with(
        FlashKind::Success,
        "Welcome back!",
        return_to.as_deref().unwrap_or(LISTINGS_PATH),
    )
    .await
}

#[utoipa::path(
    get,
    path = "/logout",
    responses((status = 303, description = "Logged out, redirect to /listings"))
)]
pub async fn logout(ctx: SessionContext) -> Result<Redirect, AppError> {
    ctx.log_out().await?;
    ctx.redirect_with(FlashKind::Success, "You are logged out!", LISTINGS_PATH)
        .await
}

/// not_found
///
/// Router fallback for any unmatched path.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
