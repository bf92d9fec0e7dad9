use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use utoipa::ToSchema;
use uuid::Uuid;

/// Image used when a listing is created without one.
pub const DEFAULT_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1625505826533-5c80aca7d157?auto=format&fit=crop&w=800&q=60";

/// Filename recorded alongside [`DEFAULT_IMAGE_URL`].
pub const DEFAULT_IMAGE_FILENAME: &str = "listingimage";

// --- Core Application Schemas ---

/// User
///
/// An account able to own listings and author reviews. `password_hash` is an Argon2id
/// PHC string, only read by the login flow and never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

/// UserProfile
///
/// The public face of a user: what pages show as an owner or review author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// Image
///
/// The normalized image shape every listing carries once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
pub struct Image {
    pub filename: String,
    pub url: String,
}

impl Image {
    pub fn placeholder() -> Self {
        Image {
            filename: DEFAULT_IMAGE_FILENAME.to_string(),
            url: DEFAULT_IMAGE_URL.to_string(),
        }
    }

    /// An image that only knows where it lives, as submitted through the listing form.
    pub fn from_url(url: impl Into<String>) -> Self {
        Image {
            filename: String::new(),
            url: url.into(),
        }
    }
}

/// StoredImage
///
/// The image column as persisted. Older rows hold a bare URL string; everything written
/// by this crate is the structured form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum StoredImage {
    Structured(Image),
    Legacy(String),
}

impl From<StoredImage> for Image {
    fn from(stored: StoredImage) -> Self {
        match stored {
            StoredImage::Structured(image) => image,
            StoredImage::Legacy(url) => Image::from_url(url),
        }
    }
}

impl From<Image> for StoredImage {
    fn from(image: Image) -> Self {
        StoredImage::Structured(image)
    }
}

/// ListingRecord
///
/// Raw row of the `listings` table. Converting it into a [`Listing`] is the only place
/// legacy images are normalized.
#[derive(Debug, Clone, FromRow)]
pub struct ListingRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: Json<StoredImage>,
    pub price: f64,
    pub location: String,
    pub country: String,
    pub owner: Uuid,
    pub reviews: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<ListingRecord> for Listing {
    fn from(record: ListingRecord) -> Self {
        Listing {
            id: record.id,
            title: record.title,
            description: record.description,
            image: record.image.0.into(),
            price: record.price,
            location: record.location,
            country: record.country,
            owner: record.owner,
            reviews: record.reviews,
            created_at: record.created_at,
        }
    }
}

impl From<&Listing> for ListingRecord {
    fn from(listing: &Listing) -> Self {
        ListingRecord {
            id: listing.id,
            title: listing.title.clone(),
            description: listing.description.clone(),
            image: Json(listing.image.clone().into()),
            price: listing.price,
            location: listing.location.clone(),
            country: listing.country.clone(),
            owner: listing.owner,
            reviews: listing.reviews.clone(),
            created_at: listing.created_at,
        }
    }
}

/// Listing
///
/// A rentable property, the primary entity. `owner` is the creating user and the only
/// party allowed to change or remove it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: Image,
    pub price: f64,
    pub location: String,
    pub country: String,
    pub owner: Uuid,
    /// Review references in insertion order.
    pub reviews: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Builds a fresh listing owned by `owner` from a validated payload.
    pub fn new(input: ListingInput, owner: Uuid) -> Self {
        let image = input
            .image
            .map(Image::from_url)
            .unwrap_or_else(Image::placeholder);

        Listing {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description.unwrap_or_default(),
            image,
            price: input.price,
            location: input.location,
            country: input.country,
            owner,
            reviews: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Merges a validated payload over the mutable fields.
    ///
    /// Absent optional fields keep their current values; a new image URL replaces the
    /// stored image.
    pub fn apply(&mut self, input: ListingInput) {
        self.title = input.title;
        self.price = input.price;
        self.location = input.location;
        self.country = input.country;

        if let Some(description) = input.description {
            self.description = description;
        }

        if let Some(url) = input.image {
            if url != self.image.url {
                self.image = Image::from_url(url);
            }
        }
    }
}

/// Review
///
/// Feedback left by a user. Listings point at reviews, not the other way around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Review {
    pub id: Uuid,
    pub author: Uuid,
    pub comment: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(input: ReviewInput, author: Uuid) -> Self {
        Review {
            id: Uuid::new_v4(),
            author,
            comment: input.comment,
            rating: input.rating,
            created_at: Utc::now(),
        }
    }
}

/// ReviewDetails
///
/// A review joined with its author's username. The author may have been removed, in
/// which case the username is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct ReviewDetails {
    pub id: Uuid,
    pub author: Uuid,
    pub comment: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub author_username: Option<String>,
}

/// ListingDetails
///
/// Read model for the detail page: the listing plus everything it references.
/// Dangling review references are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListingDetails {
    pub listing: Listing,
    pub owner: Option<UserProfile>,
    pub reviews: Vec<ReviewDetails>,
}

// --- Request Payloads (Input Schemas) ---

/// NumberField
///
/// Numbers arrive as JSON numbers or as strings from HTML forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum NumberField {
    Number(f64),
    Text(String),
}

/// RawListing
///
/// Unvalidated listing fields, as received. Unknown keys are rejected at deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(deny_unknown_fields)]
pub struct RawListing {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Option<NumberField>,
    pub location: Option<String>,
    pub country: Option<String>,
}

/// ListingEnvelope
///
/// JSON body shape: `{"listing": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(deny_unknown_fields)]
pub struct ListingEnvelope {
    pub listing: Option<RawListing>,
}

/// ListingFormFields
///
/// Form body shape, using the `listing[field]` names the HTML forms post.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(deny_unknown_fields)]
pub struct ListingFormFields {
    #[serde(rename = "listing[title]")]
    pub title: Option<String>,
    #[serde(rename = "listing[description]")]
    pub description: Option<String>,
    #[serde(rename = "listing[image]")]
    pub image: Option<String>,
    #[serde(rename = "listing[price]")]
    pub price: Option<String>,
    #[serde(rename = "listing[location]")]
    pub location: Option<String>,
    #[serde(rename = "listing[country]")]
    pub country: Option<String>,
}

impl ListingFormFields {
    /// An empty form means no `listing` object was sent at all.
    pub fn into_raw(self) -> Option<RawListing> {
        let raw = RawListing {
            title: self.title,
            description: self.description,
            image: self.image,
            price: self.price.map(NumberField::Text),
            location: self.location,
            country: self.country,
        };

        let empty = raw.title.is_none()
            && raw.description.is_none()
            && raw.image.is_none()
            && raw.price.is_none()
            && raw.location.is_none()
            && raw.country.is_none();

        (!empty).then_some(raw)
    }
}

/// ListingInput
///
/// A listing payload that passed validation. `description` is `None` when the field
/// was absent, `image` when it was absent or blank.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingInput {
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: f64,
    pub location: String,
    pub country: String,
}

/// ReviewFormFields
///
/// Review form body using `review[field]` names.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(deny_unknown_fields)]
pub struct ReviewFormFields {
    #[serde(rename = "review[rating]")]
    pub rating: Option<String>,
    #[serde(rename = "review[comment]")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReviewInput {
    pub rating: i32,
    pub comment: String,
}

/// SignupForm
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// LoginForm
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}
