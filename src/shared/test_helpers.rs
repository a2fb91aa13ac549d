//! In-memory fakes for service and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::{AuthenticatedUser, NewUser, User};
use crate::features::auth::repositories::UserRepository;
use crate::features::listings::models::{Listing, ListingDetails, ListingPatch, NewListing};
use crate::features::listings::repositories::ListingRepository;
use crate::features::reviews::model::{NewReview, Review, ReviewWithAuthor};
use crate::features::reviews::repositories::ReviewRepository;
use crate::modules::geocoding::{GeocodeOutcome, GeocodeQuery, Geocoder};
use crate::modules::storage::{ImageRef, ImageStore, ImageUpload};

pub fn create_test_user() -> AuthenticatedUser {
    AuthenticatedUser {
        id: Uuid::new_v4(),
        username: "test-traveller".to_string(),
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    /// Users with their email addresses
    users: Mutex<Vec<(User, String)>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|(u, _)| u.username == new_user.username) {
            return Err(AppError::Conflict(
                "A user with the given username is already registered".to_string(),
            ));
        }
        if users.iter().any(|(_, email)| *email == new_user.email) {
            return Err(AppError::Conflict(
                "A user with the given email is already registered".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            password_hash: new_user.password_hash,
        };
        users.push((user.clone(), new_user.email));
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|(u, _)| u.username == username)
            .map(|(u, _)| u.clone()))
    }
}

#[derive(Default)]
pub struct InMemoryReviewRepository {
    reviews: Mutex<Vec<Review>>,
}

impl InMemoryReviewRepository {
    pub fn count(&self) -> usize {
        self.reviews.lock().unwrap().len()
    }

    fn for_listing(&self, listing_id: Uuid) -> Vec<ReviewWithAuthor> {
        self.reviews
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.listing_id == listing_id)
            .map(|r| ReviewWithAuthor {
                id: r.id,
                listing_id: r.listing_id,
                author_id: r.author_id,
                author_username: "reviewer".to_string(),
                rating: r.rating,
                comment: r.comment.clone(),
                created_at: r.created_at,
            })
            .collect()
    }

    fn delete_for_listing(&self, listing_id: Uuid) {
        self.reviews
            .lock()
            .unwrap()
            .retain(|r| r.listing_id != listing_id);
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn insert(&self, review: NewReview) -> Result<Review> {
        let review = Review {
            id: Uuid::new_v4(),
            listing_id: review.listing_id,
            author_id: review.author_id,
            rating: review.rating,
            comment: review.comment,
            created_at: Utc::now(),
        };
        self.reviews.lock().unwrap().push(review.clone());
        Ok(review)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>> {
        let reviews = self.reviews.lock().unwrap();
        Ok(reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut reviews = self.reviews.lock().unwrap();
        let before = reviews.len();
        reviews.retain(|r| r.id != id);
        Ok(reviews.len() != before)
    }
}

/// Listing store with write counters. Optionally linked to a review store
/// so details and cascading deletes behave like the database.
#[derive(Default)]
pub struct InMemoryListingRepository {
    listings: Mutex<HashMap<Uuid, Listing>>,
    reviews: Option<Arc<InMemoryReviewRepository>>,
    inserts: AtomicUsize,
    updates: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryListingRepository {
    pub fn with_reviews(reviews: Arc<InMemoryReviewRepository>) -> Self {
        Self {
            reviews: Some(reviews),
            ..Default::default()
        }
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Make every later write fail like a lost database connection
    pub fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Internal("database unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn insert(&self, listing: NewListing) -> Result<Listing> {
        self.check_writable()?;
        let now = Utc::now();
        let listing = Listing {
            id: Uuid::new_v4(),
            title: listing.title,
            description: listing.description,
            price: listing.price,
            location: listing.location,
            country: listing.country,
            image: listing.image,
            geometry: listing.geometry,
            owner_id: listing.owner_id,
            created_at: now,
            updated_at: now,
        };
        self.listings
            .lock()
            .unwrap()
            .insert(listing.id, listing.clone());
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(listing)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>> {
        Ok(self.listings.lock().unwrap().get(&id).cloned())
    }

    async fn find_details(&self, id: Uuid) -> Result<Option<ListingDetails>> {
        let Some(listing) = self.listings.lock().unwrap().get(&id).cloned() else {
            return Ok(None);
        };
        let reviews = self
            .reviews
            .as_ref()
            .map(|r| r.for_listing(id))
            .unwrap_or_default();

        Ok(Some(ListingDetails {
            listing,
            owner_username: "owner".to_string(),
            reviews,
        }))
    }

    async fn list(&self) -> Result<Vec<Listing>> {
        let mut listings: Vec<Listing> = self.listings.lock().unwrap().values().cloned().collect();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listings)
    }

    async fn update(&self, id: Uuid, patch: ListingPatch) -> Result<Option<Listing>> {
        self.check_writable()?;
        let mut listings = self.listings.lock().unwrap();
        let Some(listing) = listings.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(listing);
        listing.updated_at = Utc::now();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(Some(listing.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Listing>> {
        self.check_writable()?;
        let removed = self.listings.lock().unwrap().remove(&id);
        if removed.is_some() {
            if let Some(reviews) = &self.reviews {
                reviews.delete_for_listing(id);
            }
        }
        Ok(removed)
    }
}

/// Geocoder that returns a fixed outcome and records its calls
pub struct StubGeocoder {
    outcome: GeocodeOutcome,
    queries: Mutex<Vec<String>>,
}

impl StubGeocoder {
    pub fn new(outcome: GeocodeOutcome) -> Self {
        Self {
            outcome,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn last_query(&self) -> Option<String> {
        self.queries.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    fn provider_name(&self) -> &'static str {
        "stub"
    }

    async fn geocode(&self, query: &GeocodeQuery) -> GeocodeOutcome {
        self.queries.lock().unwrap().push(query.as_str().to_string());
        self.outcome.clone()
    }
}

/// Image store that keeps uploads in memory
#[derive(Default)]
pub struct InMemoryImageStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryImageStore {
    pub fn contains(&self, filename: &str) -> bool {
        self.objects.lock().unwrap().contains_key(filename)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn store(&self, upload: ImageUpload) -> Result<ImageRef> {
        let filename = format!("public/listings/{}.{}", Uuid::new_v4(), upload.extension());
        self.objects
            .lock()
            .unwrap()
            .insert(filename.clone(), upload.data);
        Ok(ImageRef {
            url: format!("http://images.test/{}", filename),
            filename,
        })
    }

    async fn delete(&self, filename: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(filename);
        Ok(())
    }
}
