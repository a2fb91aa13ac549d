/// Error shown when a listing id does not resolve
pub const LISTING_NOT_FOUND: &str = "Listing you requested doesn't exist!";

/// Image used for listings created without an upload
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1625505826533-5c80aca7d157?auto=format&fit=crop&w=800&q=60";

/// Storage identifier of the placeholder image; never deleted from the store
pub const PLACEHOLDER_IMAGE_FILENAME: &str = "listingimage";

/// Width of the original-image preview on the edit form
pub const EDIT_PREVIEW_WIDTH: u32 = 250;
