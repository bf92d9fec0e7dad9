use crate::{
    error::AppError,
    models::{Listing, ListingDetails, ListingRecord, Review, ReviewDetails, User, UserProfile},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};
use uuid::Uuid;

/// Repository Trait
///
/// The persistence contract the handlers and guards consume. No retries and no
/// transactional guarantees beyond what the backing store gives natively; every failure
/// comes back as an `AppError` for the centralized responder.
///
/// **Send + Sync + async_trait** let the trait object (`Arc<dyn Repository>`) be shared
/// across Axum's request tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Listings ---
    async fn find_listings(&self) -> Result<Vec<Listing>, AppError>;
    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, AppError>;
    /// Listing plus owner, plus reviews with their authors, in one read-model call.
    async fn find_listing_details(&self, id: Uuid) -> Result<Option<ListingDetails>, AppError>;
    async fn create_listing(&self, listing: &Listing) -> Result<(), AppError>;
    /// Full replace of the mutable fields. Returns false if the listing is gone.
    async fn update_listing(&self, listing: &Listing) -> Result<bool, AppError>;
    /// Returns the deleted listing, if there was one. Reviews are left in place.
    async fn delete_listing(&self, id: Uuid) -> Result<Option<Listing>, AppError>;

    // --- Reviews ---
    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, AppError>;
    /// Stores the review and appends its id to the listing. Returns false, storing
    /// nothing, if the listing does not exist.
    async fn add_review(&self, listing_id: Uuid, review: &Review) -> Result<bool, AppError>;
    /// Drops the reference from the listing and deletes the review itself.
    async fn delete_review(&self, listing_id: Uuid, review_id: Uuid) -> Result<(), AppError>;

    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn create_user(&self, user: &User) -> Result<(), AppError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const LISTING_COLUMNS: &str =
    "id, title, description, image, price, location, country, owner, reviews, created_at";

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Images live in a JSONB column so older rows can
/// still hold a bare URL string; review references are an ordered `UUID[]`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_listings(&self) -> Result<Vec<Listing>, AppError> {
        let records = sqlx::query_as::<_, ListingRecord>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Listing::from).collect())
    }

    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, AppError> {
        let record = sqlx::query_as::<_, ListingRecord>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Listing::from))
    }

    /// find_listing_details
    ///
    /// Three round trips: the listing, its owner, then every referenced review joined
    /// with its author. Reviews come back in the listing's reference order.
    async fn find_listing_details(&self, id: Uuid) -> Result<Option<ListingDetails>, AppError> {
        let Some(listing) = self.find_listing(id).await? else {
            return Ok(None);
        };

        let owner = sqlx::query_as::<_, UserProfile>("SELECT id, username FROM users WHERE id = $1")
            .bind(listing.owner)
            .fetch_optional(&self.pool)
            .await?;

        let mut found = sqlx::query_as::<_, ReviewDetails>(
            r#"
            SELECT r.id, r.author, r.comment, r.rating, r.created_at, u.username AS author_username
            FROM reviews r
            LEFT JOIN users u ON r.author = u.id
            WHERE r.id = ANY($1)
            "#,
        )
        .bind(&listing.reviews)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|review| (review.id, review))
        .collect::<HashMap<_, _>>();

        let reviews = listing
            .reviews
            .iter()
            .filter_map(|review_id| found.remove(review_id))
            .collect();

        Ok(Some(ListingDetails {
            listing,
            owner,
            reviews,
        }))
    }

    async fn create_listing(&self, listing: &Listing) -> Result<(), AppError> {
        let record = ListingRecord::from(listing);
        sqlx::query(
            r#"
            INSERT INTO listings (id, title, description, image, price, location, country, owner, reviews, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.image)
        .bind(record.price)
        .bind(&record.location)
        .bind(&record.country)
        .bind(record.owner)
        .bind(&record.reviews)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// update_listing
    ///
    /// Writes the image through `ListingRecord`, so a row that held a legacy string is
    /// stored in the structured form from here on.
    async fn update_listing(&self, listing: &Listing) -> Result<bool, AppError> {
        let record = ListingRecord::from(listing);
        let result = sqlx::query(
            r#"
            UPDATE listings
            SET title = $2, description = $3, image = $4, price = $5, location = $6, country = $7
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.image)
        .bind(record.price)
        .bind(&record.location)
        .bind(&record.country)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_listing(&self, id: Uuid) -> Result<Option<Listing>, AppError> {
        let record = sqlx::query_as::<_, ListingRecord>(&format!(
            "DELETE FROM listings WHERE id = $1 RETURNING {LISTING_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Listing::from))
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, AppError> {
        Ok(sqlx::query_as::<_, Review>(
            "SELECT id, author, comment, rating, created_at FROM reviews WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn add_review(&self, listing_id: Uuid, review: &Review) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO reviews (id, author, comment, rating, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(review.id)
        .bind(review.author)
        .bind(&review.comment)
        .bind(review.rating)
        .bind(review.created_at)
        .execute(&mut *tx)
        .await?;

        let linked = sqlx::query("UPDATE listings SET reviews = array_append(reviews, $2) WHERE id = $1")
            .bind(listing_id)
            .bind(review.id)
            .execute(&mut *tx)
            .await?;

        if linked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_review(&self, listing_id: Uuid, review_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE listings SET reviews = array_remove(reviews, $2) WHERE id = $1")
            .bind(listing_id)
            .bind(review_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Default)]
struct MemoryData {
    /// Listings kept in their stored form, insertion-ordered.
    listings: Vec<ListingRecord>,
    reviews: HashMap<Uuid, Review>,
    users: HashMap<Uuid, User>,
}

/// MemoryRepository
///
/// Process-local `Repository`. Used when no `DATABASE_URL` is configured in local mode
/// and by the test suites, which can seed raw records (legacy images included) and
/// inspect what was stored.
#[derive(Default)]
pub struct MemoryRepository {
    data: RwLock<MemoryData>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryData>, AppError> {
        self.data
            .read()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryData>, AppError> {
        self.data
            .write()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }

    /// Inserts a listing exactly as given, bypassing normalization.
    pub fn insert_record(&self, record: ListingRecord) -> Result<(), AppError> {
        self.write()?.listings.push(record);
        Ok(())
    }

    /// The listing as it is currently stored.
    pub fn record(&self, id: Uuid) -> Result<Option<ListingRecord>, AppError> {
        Ok(self.read()?.listings.iter().find(|r| r.id == id).cloned())
    }

    pub fn listing_count(&self) -> Result<usize, AppError> {
        Ok(self.read()?.listings.len())
    }

    pub fn review_count(&self) -> Result<usize, AppError> {
        Ok(self.read()?.reviews.len())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_listings(&self) -> Result<Vec<Listing>, AppError> {
        Ok(self
            .read()?
            .listings
            .iter()
            .cloned()
            .map(Listing::from)
            .collect())
    }

    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, AppError> {
        Ok(self.record(id)?.map(Listing::from))
    }

    async fn find_listing_details(&self, id: Uuid) -> Result<Option<ListingDetails>, AppError> {
        let data = self.read()?;
        let Some(record) = data.listings.iter().find(|r| r.id == id).cloned() else {
            return Ok(None);
        };
        let listing = Listing::from(record);

        let owner = data.users.get(&listing.owner).map(UserProfile::from);

        let reviews = listing
            .reviews
            .iter()
            .filter_map(|review_id| data.reviews.get(review_id))
            .map(|review| ReviewDetails {
                id: review.id,
                author: review.author,
                comment: review.comment.clone(),
                rating: review.rating,
                created_at: review.created_at,
                author_username: data.users.get(&review.author).map(|u| u.username.clone()),
            })
            .collect();

        Ok(Some(ListingDetails {
            listing,
            owner,
            reviews,
        }))
    }

    async fn create_listing(&self, listing: &Listing) -> Result<(), AppError> {
        self.insert_record(ListingRecord::from(listing))
    }

    async fn update_listing(&self, listing: &Listing) -> Result<bool, AppError> {
        let mut data = self.write()?;
        let Some(stored) = data.listings.iter_mut().find(|r| r.id == listing.id) else {
            return Ok(false);
        };

        let update = ListingRecord::from(listing);
        stored.title = update.title;
        stored.description = update.description;
        stored.image = update.image;
        stored.price = update.price;
        stored.location = update.location;
        stored.country = update.country;
        Ok(true)
    }

    async fn delete_listing(&self, id: Uuid) -> Result<Option<Listing>, AppError> {
        let mut data = self.write()?;
        let removed = data
            .listings
            .iter()
            .position(|r| r.id == id)
            .map(|index| data.listings.remove(index));

        Ok(removed.map(Listing::from))
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, AppError> {
        Ok(self.read()?.reviews.get(&id).cloned())
    }

    async fn add_review(&self, listing_id: Uuid, review: &Review) -> Result<bool, AppError> {
        let mut data = self.write()?;
        let Some(listing) = data.listings.iter_mut().find(|r| r.id == listing_id) else {
            return Ok(false);
        };

        listing.reviews.push(review.id);
        data.reviews.insert(review.id, review.clone());
        Ok(true)
    }

    async fn delete_review(&self, listing_id: Uuid, review_id: Uuid) -> Result<(), AppError> {
        let mut data = self.write()?;
        if let Some(listing) = data.listings.iter_mut().find(|r| r.id == listing_id) {
            listing.reviews.retain(|id| *id != review_id);
        }
        data.reviews.remove(&review_id);
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let mut data = self.write()?;
        if data.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Internal(format!(
                "username {} already taken",
                user.username
            )));
        }
        data.users.insert(user.id, user.clone());
        Ok(())
    }
}
