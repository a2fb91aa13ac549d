use std::sync::Arc;

use axum::{routing::post, Router};

use crate::features::reviews::handlers;
use crate::features::reviews::services::ReviewService;

/// Review routes nested under a listing
pub fn routes(service: Arc<ReviewService>) -> Router {
    Router::new()
        .route("/listings/{id}/reviews", post(handlers::create))
        .route(
            "/listings/{id}/reviews/{review_id}/delete",
            post(handlers::delete),
        )
        .with_state(service)
}
