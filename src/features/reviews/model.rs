use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for a review
#[derive(Debug, Clone, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub author_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// A review joined with its author's username, as shown on a listing page
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewWithAuthor {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub listing_id: Uuid,
    pub author_id: Uuid,
    pub rating: i16,
    pub comment: String,
}
