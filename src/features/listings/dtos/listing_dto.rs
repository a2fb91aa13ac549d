use std::borrow::Cow;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::features::listings::models::Listing;
use crate::modules::geocoding::Point;

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Prices are stored as NUMERIC(12, 2)
const PRICE_LIMIT: i64 = 10_000_000_000;
const PRICE_SCALE: u32 = 2;

fn price_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn valid_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(price_error("negative_price", "Price must not be negative"));
    }
    if *price >= Decimal::from(PRICE_LIMIT) {
        return Err(price_error("price_too_large", "Price is too large"));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(price_error(
            "price_precision",
            "Price must have at most 2 decimal places",
        ));
    }
    Ok(())
}

/// Submitted fields of a new listing
#[derive(Debug, Clone, Validate)]
pub struct ListingFields {
    #[validate(
        length(max = 200, message = "Title must not exceed 200 characters"),
        custom(function = "not_blank", message = "Title is required")
    )]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must not exceed 5000 characters"))]
    pub description: String,

    #[validate(custom(function = "valid_price"))]
    pub price: Decimal,

    #[validate(custom(function = "not_blank", message = "Location is required to create a listing"))]
    pub location: String,

    #[validate(
        length(max = 100, message = "Country must not exceed 100 characters"),
        custom(function = "not_blank", message = "Country is required")
    )]
    pub country: String,
}

/// Submitted fields of a listing edit. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Validate)]
pub struct ListingChanges {
    #[validate(
        length(max = 200, message = "Title must not exceed 200 characters"),
        custom(function = "not_blank", message = "Title cannot be empty")
    )]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Description must not exceed 5000 characters"))]
    pub description: Option<String>,

    #[validate(custom(function = "valid_price"))]
    pub price: Option<Decimal>,

    #[validate(custom(function = "not_blank", message = "Location cannot be empty"))]
    pub location: Option<String>,

    #[validate(
        length(max = 100, message = "Country must not exceed 100 characters"),
        custom(function = "not_blank", message = "Country cannot be empty")
    )]
    pub country: Option<String>,
}

impl ListingChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.location.is_none()
            && self.country.is_none()
    }
}

/// Listing as exposed to templates
#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub location: String,
    pub country: String,
    pub image_url: String,
    pub geometry: Option<Point>,
    pub owner_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Listing> for ListingView {
    fn from(listing: Listing) -> Self {
        Self {
            id: listing.id,
            title: listing.title,
            description: listing.description,
            price: listing.price,
            location: listing.location,
            country: listing.country,
            image_url: listing.image.url,
            geometry: listing.geometry,
            owner_id: listing.owner_id,
            owner_username: None,
            created_at: listing.created_at,
        }
    }
}
