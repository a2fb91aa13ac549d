//! Ratings and comments left on listings.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | POST | `/listings/{id}/reviews` | Yes | Add a review |
//! | POST | `/listings/{id}/reviews/{review_id}/delete` | Author | Delete a review |

pub mod dtos;
pub mod handlers;
pub mod model;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::PgReviewRepository;
pub use services::ReviewService;
