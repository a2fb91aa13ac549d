use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::listings::models::{
    Listing, ListingDetails, ListingPatch, ListingRow, NewListing,
};
use crate::features::reviews::model::ReviewWithAuthor;

const LISTING_COLUMNS: &str = "id, title, description, price, location, country, image_url, \
     image_filename, longitude, latitude, owner_id, created_at, updated_at";

/// Persistence for listings
#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn insert(&self, listing: NewListing) -> Result<Listing>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>>;

    /// Listing with owner username and reviews (with authors) populated
    async fn find_details(&self, id: Uuid) -> Result<Option<ListingDetails>>;

    /// All listings, newest first
    async fn list(&self) -> Result<Vec<Listing>>;

    /// Apply a partial update in one statement. `None` when the listing is gone.
    async fn update(&self, id: Uuid, patch: ListingPatch) -> Result<Option<Listing>>;

    /// Delete a listing (its reviews go with it) and return what was removed
    async fn delete(&self, id: Uuid) -> Result<Option<Listing>>;
}

pub struct PgListingRepository {
    pool: PgPool,
}

impl PgListingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(operation: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |e| {
        tracing::error!("Failed to {}: {:?}", operation, e);
        AppError::Database(e)
    }
}

#[async_trait]
impl ListingRepository for PgListingRepository {
    async fn insert(&self, listing: NewListing) -> Result<Listing> {
        let query = format!(
            r#"
            INSERT INTO listings
                (title, description, price, location, country, image_url, image_filename,
                 longitude, latitude, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            LISTING_COLUMNS
        );

        let row = sqlx::query_as::<_, ListingRow>(&query)
            .bind(&listing.title)
            .bind(&listing.description)
            .bind(listing.price)
            .bind(&listing.location)
            .bind(&listing.country)
            .bind(&listing.image.url)
            .bind(&listing.image.filename)
            .bind(listing.geometry.map(|p| p.longitude))
            .bind(listing.geometry.map(|p| p.latitude))
            .bind(listing.owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("insert listing"))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>> {
        let query = format!("SELECT {} FROM listings WHERE id = $1", LISTING_COLUMNS);

        let row = sqlx::query_as::<_, ListingRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get listing"))?;

        Ok(row.map(Listing::from))
    }

    async fn find_details(&self, id: Uuid) -> Result<Option<ListingDetails>> {
        let Some(listing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let owner_username: String = sqlx::query_scalar("SELECT username FROM users WHERE id = $1")
            .bind(listing.owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("get listing owner"))?;

        let reviews = sqlx::query_as::<_, ReviewWithAuthor>(
            r#"
            SELECT r.id, r.listing_id, r.author_id, u.username AS author_username,
                   r.rating, r.comment, r.created_at
            FROM reviews r
            JOIN users u ON u.id = r.author_id
            WHERE r.listing_id = $1
            ORDER BY r.created_at
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list listing reviews"))?;

        Ok(Some(ListingDetails {
            listing,
            owner_username,
            reviews,
        }))
    }

    async fn list(&self) -> Result<Vec<Listing>> {
        let query = format!(
            "SELECT {} FROM listings ORDER BY created_at DESC",
            LISTING_COLUMNS
        );

        let rows = sqlx::query_as::<_, ListingRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list listings"))?;

        Ok(rows.into_iter().map(Listing::from).collect())
    }

    async fn update(&self, id: Uuid, patch: ListingPatch) -> Result<Option<Listing>> {
        let (image_url, image_filename) = match patch.image {
            Some(image) => (Some(image.url), Some(image.filename)),
            None => (None, None),
        };

        let query = format!(
            r#"
            UPDATE listings SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                location = COALESCE($5, location),
                country = COALESCE($6, country),
                image_url = COALESCE($7, image_url),
                image_filename = COALESCE($8, image_filename),
                longitude = COALESCE($9, longitude),
                latitude = COALESCE($10, latitude),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            LISTING_COLUMNS
        );

        let row = sqlx::query_as::<_, ListingRow>(&query)
            .bind(id)
            .bind(patch.title)
            .bind(patch.description)
            .bind(patch.price)
            .bind(patch.location)
            .bind(patch.country)
            .bind(image_url)
            .bind(image_filename)
            .bind(patch.geometry.map(|p| p.longitude))
            .bind(patch.geometry.map(|p| p.latitude))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("update listing"))?;

        Ok(row.map(Listing::from))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Listing>> {
        let query = format!("DELETE FROM listings WHERE id = $1 RETURNING {}", LISTING_COLUMNS);

        let row = sqlx::query_as::<_, ListingRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("delete listing"))?;

        Ok(row.map(Listing::from))
    }
}
