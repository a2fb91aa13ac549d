use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::features::reviews::model::ReviewWithAuthor;
use crate::modules::geocoding::Point;
use crate::modules::storage::ImageRef;

/// A property listing
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    /// Free-text location as entered by the owner
    pub location: String,
    pub country: String,
    pub image: ImageRef,
    /// Either a complete point or nothing
    pub geometry: Option<Point>,
    /// Set at creation, never changed
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flat database row of the `listings` table
#[derive(Debug, Clone, FromRow)]
pub struct ListingRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub location: String,
    pub country: String,
    pub image_url: String,
    pub image_filename: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ListingRow> for Listing {
    fn from(row: ListingRow) -> Self {
        let geometry = match (row.longitude, row.latitude) {
            (Some(longitude), Some(latitude)) => Some(Point {
                longitude,
                latitude,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            location: row.location,
            country: row.country,
            image: ImageRef {
                url: row.image_url,
                filename: row.image_filename,
            },
            geometry,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A listing ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub location: String,
    pub country: String,
    pub image: ImageRef,
    pub geometry: Option<Point>,
    pub owner_id: Uuid,
}

/// Partial update. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub image: Option<ImageRef>,
    pub geometry: Option<Point>,
}

impl ListingPatch {
    /// Apply the patch to an in-memory listing
    pub fn apply(self, listing: &mut Listing) {
        if let Some(title) = self.title {
            listing.title = title;
        }
        if let Some(description) = self.description {
            listing.description = description;
        }
        if let Some(price) = self.price {
            listing.price = price;
        }
        if let Some(location) = self.location {
            listing.location = location;
        }
        if let Some(country) = self.country {
            listing.country = country;
        }
        if let Some(image) = self.image {
            listing.image = image;
        }
        if let Some(geometry) = self.geometry {
            listing.geometry = Some(geometry);
        }
    }
}

/// A listing with its owner and reviews populated
#[derive(Debug, Clone)]
pub struct ListingDetails {
    pub listing: Listing,
    pub owner_username: String,
    /// Oldest first
    pub reviews: Vec<ReviewWithAuthor>,
}
