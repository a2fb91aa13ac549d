mod listing_dto;

pub use listing_dto::{ListingChanges, ListingFields, ListingView};
