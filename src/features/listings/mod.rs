//! Property listings: browsing, creation with geocoding, editing and
//! deletion.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | GET | `/listings` | No | All listings |
//! | GET | `/listings/new` | Yes | New listing form |
//! | POST | `/listings` | Yes | Create a listing (multipart) |
//! | GET | `/listings/{id}` | No | Listing with reviews and map |
//! | GET | `/listings/{id}/edit` | Owner | Edit form |
//! | POST | `/listings/{id}` | Owner | Update a listing (multipart) |
//! | POST | `/listings/{id}/delete` | Owner | Delete a listing |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use handlers::ListingsState;
pub use repositories::PgListingRepository;
pub use services::ListingService;
