use axum::{routing::get, Router};

use crate::features::auth::handlers::{self, AuthState};

/// Signup, login and logout pages (no authentication required)
pub fn routes(state: AuthState) -> Router {
    Router::new()
        .route("/signup", get(handlers::signup_form).post(handlers::signup))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .with_state(state)
}
