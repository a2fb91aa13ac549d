use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::listings::repositories::ListingRepository;
use crate::features::reviews::dtos::ReviewFormDto;
use crate::features::reviews::model::{NewReview, Review};
use crate::features::reviews::repositories::ReviewRepository;
use crate::shared::constants::LISTING_NOT_FOUND;
use crate::shared::validation::validation_message;

const REVIEW_NOT_FOUND: &str = "Review you requested doesn't exist!";

pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    listings: Arc<dyn ListingRepository>,
}

impl ReviewService {
    pub fn new(reviews: Arc<dyn ReviewRepository>, listings: Arc<dyn ListingRepository>) -> Self {
        Self { reviews, listings }
    }

    /// Add a review by `author` to an existing listing
    #[instrument(skip(self, dto), fields(author_id = %author.id))]
    pub async fn create(
        &self,
        listing_id: Uuid,
        author: &AuthenticatedUser,
        dto: ReviewFormDto,
    ) -> Result<Review> {
        dto.validate()
            .map_err(|e| AppError::Validation(validation_message(&e)))?;

        let comment = dto.comment.trim();
        if comment.is_empty() {
            return Err(AppError::Validation("Comment is required".to_string()));
        }

        if self.listings.find_by_id(listing_id).await?.is_none() {
            return Err(AppError::NotFound(LISTING_NOT_FOUND.to_string()));
        }

        let review = self
            .reviews
            .insert(NewReview {
                listing_id,
                author_id: author.id,
                rating: dto.rating,
                comment: comment.to_string(),
            })
            .await?;

        tracing::info!(review_id = %review.id, "review_created");
        Ok(review)
    }

    /// Delete a review. Only its author may do so.
    #[instrument(skip(self), fields(user_id = %user.id))]
    pub async fn delete(
        &self,
        listing_id: Uuid,
        review_id: Uuid,
        user: &AuthenticatedUser,
    ) -> Result<()> {
        let review = self
            .reviews
            .find_by_id(review_id)
            .await?
            .filter(|r| r.listing_id == listing_id)
            .ok_or_else(|| AppError::NotFound(REVIEW_NOT_FOUND.to_string()))?;

        if !user.is(review.author_id) {
            return Err(AppError::Forbidden(
                "You are not the author of this review".to_string(),
            ));
        }

        if !self.reviews.delete(review_id).await? {
            return Err(AppError::NotFound(REVIEW_NOT_FOUND.to_string()));
        }

        tracing::info!(review_id = %review_id, "review_deleted");
        Ok(())
    }
}
