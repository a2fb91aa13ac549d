use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::reviews::model::{NewReview, Review};
use crate::shared::constants::LISTING_NOT_FOUND;

/// Persistence for reviews. Reading reviews with their authors happens
/// through the listing repository.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn insert(&self, review: NewReview) -> Result<Review>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>>;

    /// `false` when nothing was deleted
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A review for a listing deleted in the meantime violates the foreign key
/// (PostgreSQL code 23503)
fn handle_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code() == Some(std::borrow::Cow::Borrowed("23503")) {
            return AppError::NotFound(LISTING_NOT_FOUND.to_string());
        }
    }

    tracing::error!("Review query failed: {:?}", e);
    AppError::Database(e)
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn insert(&self, review: NewReview) -> Result<Review> {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (listing_id, author_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, listing_id, author_id, rating, comment, created_at
            "#,
        )
        .bind(review.listing_id)
        .bind(review.author_id)
        .bind(review.rating)
        .bind(&review.comment)
        .fetch_one(&self.pool)
        .await
        .map_err(handle_db_error)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>> {
        sqlx::query_as::<_, Review>(
            r#"
            SELECT id, listing_id, author_id, rating, comment, created_at
            FROM reviews
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(handle_db_error)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(handle_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
