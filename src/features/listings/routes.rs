use axum::{
    routing::{get, post},
    Router,
};

use crate::features::listings::handlers::{self, ListingsState};

/// Listing pages. Update and delete are POST routes since HTML forms cannot
/// send PUT or DELETE.
pub fn routes(state: ListingsState) -> Router {
    Router::new()
        .route("/listings", get(handlers::index).post(handlers::create))
        .route("/listings/new", get(handlers::new_form))
        .route("/listings/{id}", get(handlers::show).post(handlers::update))
        .route("/listings/{id}/edit", get(handlers::edit_form))
        .route("/listings/{id}/delete", post(handlers::delete))
        .with_state(state)
}
