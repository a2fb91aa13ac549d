mod listing;

pub use listing::{Listing, ListingDetails, ListingPatch, ListingRow, NewListing};
