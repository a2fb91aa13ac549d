//! Listing creation and update orchestration.
//!
//! A submission goes through `validate -> geocode attempt -> persist`. The
//! geocode attempt is one of `Found`, `NotFound`, `ProviderError` or
//! `Skipped` (no geocoder configured) and never prevents the listing from
//! being saved; it only decides the geometry and the notice returned to the
//! caller. Exactly one notice is produced per successful operation.

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::listings::dtos::{ListingChanges, ListingFields};
use crate::features::listings::models::{Listing, ListingDetails, ListingPatch, NewListing};
use crate::features::listings::repositories::ListingRepository;
use crate::modules::geocoding::{GeocodeOutcome, GeocodeQuery, Geocoder, Point};
use crate::modules::storage::ImageRef;
use crate::shared::constants::{LISTING_NOT_FOUND, PLACEHOLDER_IMAGE_FILENAME, PLACEHOLDER_IMAGE_URL};
use crate::shared::flash::Notice;
use crate::shared::validation::validation_message;

/// Result of a geocode attempt for one submission
#[derive(Debug, Clone, PartialEq)]
enum LocationLookup {
    Found(Point),
    NotFound,
    ProviderError,
    /// No geocoder configured: no call made
    Skipped,
}

impl LocationLookup {
    fn point(&self) -> Option<Point> {
        match self {
            LocationLookup::Found(point) => Some(*point),
            _ => None,
        }
    }

    fn create_notice(&self) -> Notice {
        match self {
            LocationLookup::Found(_) => Notice::success("New Listing Created!"),
            LocationLookup::NotFound => Notice::warning(
                "Listing created, but location coordinates could not be found. Map will not be available.",
            ),
            LocationLookup::ProviderError => Notice::warning(
                "Listing created, but location map is temporarily unavailable. You can still view and edit this listing.",
            ),
            LocationLookup::Skipped => Notice::info(
                "Listing created without location map (geocoding not configured).",
            ),
        }
    }

    fn update_notice(&self) -> Notice {
        match self {
            LocationLookup::Found(_) => Notice::success("Listing Updated!"),
            LocationLookup::NotFound => Notice::warning(
                "Listing updated, but location coordinates could not be found. Map was not changed.",
            ),
            LocationLookup::ProviderError => {
                Notice::warning("Listing updated, but location map could not be updated.")
            }
            LocationLookup::Skipped => Notice::info(
                "Listing updated without location map (geocoding not configured).",
            ),
        }
    }
}

/// A saved listing and the single notice describing how the save went
#[derive(Debug, Clone)]
pub struct ListingOutcome {
    pub listing: Listing,
    pub notice: Notice,
}

pub struct ListingService {
    repo: Arc<dyn ListingRepository>,
    /// `None` when no geocoding provider is enabled
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl ListingService {
    pub fn new(repo: Arc<dyn ListingRepository>, geocoder: Option<Arc<dyn Geocoder>>) -> Self {
        if geocoder.is_none() {
            tracing::info!("Listing service running without geocoding");
        }
        Self { repo, geocoder }
    }

    /// Geocode a location with at most one provider call
    async fn lookup(&self, location: &str) -> Result<LocationLookup> {
        let Some(geocoder) = &self.geocoder else {
            return Ok(LocationLookup::Skipped);
        };

        let query = GeocodeQuery::new(location)
            .ok_or_else(|| AppError::Validation("Location is required".to_string()))?;

        let lookup = match geocoder.geocode(&query).await {
            GeocodeOutcome::Found(point) => LocationLookup::Found(point),
            GeocodeOutcome::NotFound => {
                tracing::warn!("No coordinates found for '{}'", query.as_str());
                LocationLookup::NotFound
            }
            GeocodeOutcome::ProviderError(failure) => {
                tracing::warn!(
                    "Geocoding via {} failed, saving without coordinates: {}",
                    geocoder.provider_name(),
                    failure
                );
                LocationLookup::ProviderError
            }
        };

        Ok(lookup)
    }

    /// Reject a new-listing submission. Blank location is checked first.
    pub fn check_fields(fields: &ListingFields) -> Result<()> {
        if fields.location.trim().is_empty() {
            return Err(AppError::Validation(
                "Location is required to create a listing".to_string(),
            ));
        }
        fields
            .validate()
            .map_err(|e| AppError::Validation(validation_message(&e)))
    }

    /// Reject an edit whose supplied fields are invalid
    pub fn check_changes(changes: &ListingChanges) -> Result<()> {
        if changes
            .location
            .as_deref()
            .is_some_and(|location| location.trim().is_empty())
        {
            return Err(AppError::Validation("Location cannot be empty".to_string()));
        }
        changes
            .validate()
            .map_err(|e| AppError::Validation(validation_message(&e)))
    }

    /// Create a listing owned by `owner_id`.
    ///
    /// Invalid input is rejected before any geocoding or persistence. A
    /// missing image falls back to the placeholder.
    pub async fn create_listing(
        &self,
        owner_id: Uuid,
        fields: ListingFields,
        image: Option<ImageRef>,
    ) -> Result<ListingOutcome> {
        Self::check_fields(&fields)?;

        let lookup = self.lookup(&fields.location).await?;

        let new_listing = NewListing {
            title: fields.title.trim().to_string(),
            description: fields.description.trim().to_string(),
            price: fields.price,
            location: fields.location.trim().to_string(),
            country: fields.country.trim().to_string(),
            image: image.unwrap_or_else(placeholder_image),
            geometry: lookup.point(),
            owner_id,
        };

        let listing = self.repo.insert(new_listing).await?;
        tracing::info!(
            listing_id = %listing.id,
            owner_id = %owner_id,
            has_geometry = listing.geometry.is_some(),
            "listing_created"
        );

        Ok(ListingOutcome {
            listing,
            notice: lookup.create_notice(),
        })
    }

    /// Apply an edit. Geometry only changes when a newly supplied location
    /// is found; otherwise the previous point is kept.
    pub async fn update_listing(
        &self,
        id: Uuid,
        changes: Option<ListingChanges>,
        image: Option<ImageRef>,
    ) -> Result<ListingOutcome> {
        let changes = changes
            .filter(|c| !c.is_empty() || image.is_some())
            .ok_or_else(|| AppError::Validation("Send valid data for listing".to_string()))?;

        Self::check_changes(&changes)?;

        if self.repo.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound(LISTING_NOT_FOUND.to_string()));
        }

        let location = changes.location.as_deref().map(str::trim);
        let lookup = match location {
            Some(location) => Some(self.lookup(location).await?),
            None => None,
        };

        let patch = ListingPatch {
            title: changes.title.map(|t| t.trim().to_string()),
            description: changes.description.map(|d| d.trim().to_string()),
            price: changes.price,
            location: location.map(str::to_string),
            country: changes.country.map(|c| c.trim().to_string()),
            image,
            geometry: lookup.as_ref().and_then(LocationLookup::point),
        };

        // Single commit point of the update
        let listing = self
            .repo
            .update(id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound(LISTING_NOT_FOUND.to_string()))?;

        tracing::info!(listing_id = %listing.id, "listing_updated");

        let notice = match &lookup {
            Some(lookup) => lookup.update_notice(),
            None => Notice::success("Listing Updated!"),
        };
        Ok(ListingOutcome { listing, notice })
    }

    /// All listings, newest first
    pub async fn index(&self) -> Result<Vec<Listing>> {
        self.repo.list().await
    }

    /// Listing with owner and reviews
    pub async fn show(&self, id: Uuid) -> Result<ListingDetails> {
        self.repo
            .find_details(id)
            .await?
            .ok_or_else(|| AppError::NotFound(LISTING_NOT_FOUND.to_string()))
    }

    /// Load a listing the user is allowed to modify
    pub async fn ensure_owner(&self, id: Uuid, user: &AuthenticatedUser) -> Result<Listing> {
        let listing = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(LISTING_NOT_FOUND.to_string()))?;

        if !user.is(listing.owner_id) {
            return Err(AppError::Forbidden(
                "You are not the owner of this listing".to_string(),
            ));
        }
        Ok(listing)
    }

    /// Delete a listing with its reviews and return it
    pub async fn delete(&self, id: Uuid) -> Result<Listing> {
        let listing = self
            .repo
            .delete(id)
            .await?
            .ok_or_else(|| AppError::NotFound(LISTING_NOT_FOUND.to_string()))?;

        tracing::info!(listing_id = %listing.id, "listing_deleted");
        Ok(listing)
    }
}

fn placeholder_image() -> ImageRef {
    ImageRef {
        url: PLACEHOLDER_IMAGE_URL.to_string(),
        filename: PLACEHOLDER_IMAGE_FILENAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::geocoding::{FailureKind, ProviderFailure};
    use crate::shared::flash::Severity;
    use crate::shared::test_helpers::{InMemoryListingRepository, StubGeocoder};
    use rust_decimal::Decimal;

    fn fields(location: &str) -> ListingFields {
        ListingFields {
            title: "Cozy Beachfront Cottage".to_string(),
            description: "Steps from the sand".to_string(),
            price: Decimal::new(1500, 0),
            location: location.to_string(),
            country: "India".to_string(),
        }
    }

    fn goa() -> Point {
        Point::new(73.83, 15.49).unwrap()
    }

    fn service_with(
        outcome: Option<GeocodeOutcome>,
    ) -> (
        ListingService,
        Arc<InMemoryListingRepository>,
        Option<Arc<StubGeocoder>>,
    ) {
        let repo = Arc::new(InMemoryListingRepository::default());
        let geocoder = outcome.map(|o| Arc::new(StubGeocoder::new(o)));
        let service = ListingService::new(
            repo.clone(),
            geocoder.clone().map(|g| g as Arc<dyn Geocoder>),
        );
        (service, repo, geocoder)
    }

    fn provider_error() -> GeocodeOutcome {
        GeocodeOutcome::ProviderError(ProviderFailure::new(FailureKind::Transient, "timeout"))
    }

    #[tokio::test]
    async fn test_create_found_sets_exact_geometry_and_success() {
        let (service, repo, geocoder) = service_with(Some(GeocodeOutcome::Found(goa())));
        let owner = Uuid::new_v4();

        let outcome = service
            .create_listing(owner, fields("Goa, India"), None)
            .await
            .unwrap();

        assert_eq!(
            outcome.listing.geometry,
            Some(Point {
                longitude: 73.83,
                latitude: 15.49
            })
        );
        assert_eq!(outcome.notice.severity, Severity::Success);
        assert_eq!(outcome.listing.owner_id, owner);
        assert_eq!(repo.insert_count(), 1);

        let geocoder = geocoder.unwrap();
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(geocoder.last_query().as_deref(), Some("Goa, India"));
    }

    #[tokio::test]
    async fn test_create_not_found_persists_without_geometry() {
        let (service, repo, _) = service_with(Some(GeocodeOutcome::NotFound));

        let outcome = service
            .create_listing(Uuid::new_v4(), fields("zzzNotARealPlace"), None)
            .await
            .unwrap();

        assert_eq!(outcome.listing.geometry, None);
        assert_eq!(outcome.notice.severity, Severity::Warning);
        assert!(outcome.notice.message.contains("could not be found"));
        assert_eq!(repo.insert_count(), 1);
    }

    #[tokio::test]
    async fn test_create_provider_error_persists_without_geometry() {
        let (service, repo, _) = service_with(Some(provider_error()));

        let outcome = service
            .create_listing(Uuid::new_v4(), fields("Goa, India"), None)
            .await
            .unwrap();

        assert_eq!(outcome.listing.geometry, None);
        assert_eq!(outcome.notice.severity, Severity::Warning);
        assert!(outcome.notice.message.contains("temporarily unavailable"));
        assert_eq!(repo.insert_count(), 1);
    }

    #[tokio::test]
    async fn test_create_without_geocoder_emits_info() {
        let (service, repo, _) = service_with(None);

        let outcome = service
            .create_listing(Uuid::new_v4(), fields("Goa, India"), None)
            .await
            .unwrap();

        assert_eq!(outcome.listing.geometry, None);
        assert_eq!(outcome.notice.severity, Severity::Info);
        assert_eq!(repo.insert_count(), 1);
    }

    #[tokio::test]
    async fn test_create_blank_location_rejected_without_side_effects() {
        let (service, repo, geocoder) = service_with(Some(GeocodeOutcome::Found(goa())));

        for location in ["", "   \t"] {
            let result = service
                .create_listing(Uuid::new_v4(), fields(location), None)
                .await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }

        assert_eq!(repo.insert_count(), 0);
        assert_eq!(geocoder.unwrap().calls(), 0);
    }

    #[tokio::test]
    async fn test_create_invalid_fields_rejected_before_geocoding() {
        let (service, repo, geocoder) = service_with(Some(GeocodeOutcome::Found(goa())));
        let mut invalid = fields("Goa, India");
        invalid.price = Decimal::new(-100, 0);

        let result = service.create_listing(Uuid::new_v4(), invalid, None).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(repo.insert_count(), 0);
        assert_eq!(geocoder.unwrap().calls(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_price_the_column_cannot_hold() {
        let (service, repo, geocoder) = service_with(Some(GeocodeOutcome::Found(goa())));

        for price in [Decimal::from(100_000_000_000_000i64), Decimal::new(1239, 3)] {
            let mut invalid = fields("Goa, India");
            invalid.price = price;
            let result = service.create_listing(Uuid::new_v4(), invalid, None).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }

        assert_eq!(repo.insert_count(), 0);
        assert_eq!(geocoder.unwrap().calls(), 0);
    }

    #[tokio::test]
    async fn test_create_uses_uploaded_image_or_placeholder() {
        let (service, _, _) = service_with(None);
        let uploaded = ImageRef {
            url: "https://cdn.example.com/wanderlust/public/listings/a.png".to_string(),
            filename: "public/listings/a.png".to_string(),
        };

        let with_image = service
            .create_listing(Uuid::new_v4(), fields("Goa"), Some(uploaded.clone()))
            .await
            .unwrap();
        assert_eq!(with_image.listing.image, uploaded);

        let without_image = service
            .create_listing(Uuid::new_v4(), fields("Goa"), None)
            .await
            .unwrap();
        assert_eq!(without_image.listing.image.url, PLACEHOLDER_IMAGE_URL);
    }

    #[tokio::test]
    async fn test_create_persistence_failure_is_fatal() {
        let (service, repo, _) = service_with(Some(GeocodeOutcome::Found(goa())));
        repo.fail_writes();

        let result = service
            .create_listing(Uuid::new_v4(), fields("Goa, India"), None)
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    async fn seeded(
        outcome: Option<GeocodeOutcome>,
    ) -> (
        ListingService,
        Arc<InMemoryListingRepository>,
        Option<Arc<StubGeocoder>>,
        Listing,
    ) {
        let (service, repo, geocoder) = service_with(outcome);
        let listing = repo
            .insert(NewListing {
                title: "Old title".to_string(),
                description: String::new(),
                price: Decimal::new(900, 0),
                location: "Goa, India".to_string(),
                country: "India".to_string(),
                image: placeholder_image(),
                geometry: Some(goa()),
                owner_id: Uuid::new_v4(),
            })
            .await
            .unwrap();
        (service, repo, geocoder, listing)
    }

    #[tokio::test]
    async fn test_update_without_location_does_not_geocode() {
        let (service, _, geocoder, listing) = seeded(Some(GeocodeOutcome::NotFound)).await;

        let changes = ListingChanges {
            title: Some("New title".to_string()),
            ..Default::default()
        };
        let outcome = service
            .update_listing(listing.id, Some(changes), None)
            .await
            .unwrap();

        assert_eq!(outcome.listing.title, "New title");
        assert_eq!(outcome.listing.price, listing.price);
        assert_eq!(outcome.listing.geometry, listing.geometry);
        assert_eq!(outcome.notice, Notice::success("Listing Updated!"));
        assert_eq!(geocoder.unwrap().calls(), 0);
    }

    #[tokio::test]
    async fn test_update_found_replaces_geometry() {
        let paris = Point::new(2.35, 48.85).unwrap();
        let (service, _, _, listing) = seeded(Some(GeocodeOutcome::Found(paris))).await;

        let changes = ListingChanges {
            location: Some("Paris".to_string()),
            ..Default::default()
        };
        let outcome = service
            .update_listing(listing.id, Some(changes), None)
            .await
            .unwrap();

        assert_eq!(outcome.listing.geometry, Some(paris));
        assert_eq!(outcome.listing.location, "Paris");
        assert_eq!(outcome.notice.severity, Severity::Success);
    }

    #[tokio::test]
    async fn test_update_not_found_or_error_keeps_geometry_with_one_warning() {
        for outcome in [GeocodeOutcome::NotFound, provider_error()] {
            let (service, repo, _, listing) = seeded(Some(outcome)).await;

            let changes = ListingChanges {
                location: Some("Atlantis".to_string()),
                ..Default::default()
            };
            let result = service
                .update_listing(listing.id, Some(changes), None)
                .await
                .unwrap();

            assert_eq!(result.listing.location, "Atlantis");
            assert_eq!(result.listing.geometry, listing.geometry);
            assert_eq!(result.notice.severity, Severity::Warning);
            assert_eq!(repo.update_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_update_location_without_geocoder_keeps_geometry() {
        let (service, _, _, listing) = seeded(None).await;

        let changes = ListingChanges {
            location: Some("Paris".to_string()),
            ..Default::default()
        };
        let outcome = service
            .update_listing(listing.id, Some(changes), None)
            .await
            .unwrap();

        assert_eq!(outcome.listing.geometry, listing.geometry);
        assert_eq!(outcome.notice.severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_update_rejects_missing_fields_and_blank_location() {
        let (service, repo, geocoder, listing) =
            seeded(Some(GeocodeOutcome::Found(goa()))).await;

        let missing = service.update_listing(listing.id, None, None).await;
        assert!(matches!(missing, Err(AppError::Validation(_))));

        let blank = ListingChanges {
            location: Some("  ".to_string()),
            ..Default::default()
        };
        let result = service.update_listing(listing.id, Some(blank), None).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        assert_eq!(repo.update_count(), 0);
        assert_eq!(geocoder.unwrap().calls(), 0);
    }

    #[tokio::test]
    async fn test_update_replaces_image_only_when_supplied() {
        let (service, _, _, listing) = seeded(None).await;
        let new_image = ImageRef {
            url: "https://cdn.example.com/b.jpg".to_string(),
            filename: "public/listings/b.jpg".to_string(),
        };

        let outcome = service
            .update_listing(
                listing.id,
                Some(ListingChanges::default()),
                Some(new_image.clone()),
            )
            .await
            .unwrap();
        assert_eq!(outcome.listing.image, new_image);

        let changes = ListingChanges {
            country: Some("Portugal".to_string()),
            ..Default::default()
        };
        let outcome = service
            .update_listing(listing.id, Some(changes), None)
            .await
            .unwrap();
        assert_eq!(outcome.listing.image, new_image);
        assert_eq!(outcome.listing.country, "Portugal");
    }

    #[tokio::test]
    async fn test_update_missing_listing_is_not_found() {
        let (service, repo, geocoder) = service_with(Some(GeocodeOutcome::Found(goa())));

        let changes = ListingChanges {
            location: Some("Goa".to_string()),
            ..Default::default()
        };
        let result = service
            .update_listing(Uuid::new_v4(), Some(changes), None)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(repo.update_count(), 0);
        assert_eq!(geocoder.unwrap().calls(), 0);
    }

    #[tokio::test]
    async fn test_ensure_owner() {
        let (service, _, _, listing) = seeded(None).await;
        let owner = AuthenticatedUser {
            id: listing.owner_id,
            username: "owner".to_string(),
        };
        let stranger = AuthenticatedUser {
            id: Uuid::new_v4(),
            username: "stranger".to_string(),
        };

        assert!(service.ensure_owner(listing.id, &owner).await.is_ok());
        assert!(matches!(
            service.ensure_owner(listing.id, &stranger).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.ensure_owner(Uuid::new_v4(), &owner).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_show_and_delete() {
        let (service, _, _, listing) = seeded(None).await;

        let details = service.show(listing.id).await.unwrap();
        assert_eq!(details.listing.id, listing.id);

        let deleted = service.delete(listing.id).await.unwrap();
        assert_eq!(deleted.id, listing.id);
        assert!(matches!(
            service.show(listing.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(listing.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
