//! Application router: feature routes, static files and the request layers.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use minijinja::context;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::core::error::Result;
use crate::core::extractor::CurrentUser;
use crate::core::middleware;
use crate::features::auth::{self, AuthState, SessionService};
use crate::features::listings::{self, ListingsState};
use crate::features::reviews::{self, ReviewService};
use crate::shared::flash::Flash;
use crate::shared::views::{self, PageContext};

/// Everything the routes need, built once in `main`
#[derive(Clone)]
pub struct AppServices {
    pub auth: AuthState,
    pub listings: ListingsState,
    pub reviews: Arc<ReviewService>,
    pub sessions: Arc<SessionService>,
    pub static_dir: String,
    pub max_request_body_size: usize,
}

async fn home(CurrentUser(user): CurrentUser, flash: Flash) -> Result<Response> {
    let (flash, notices) = flash.take();
    let page = PageContext::new(user, notices);
    let html = views::render("home.html", &page, context! {})?;
    Ok((flash, html).into_response())
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

async fn not_found() -> Response {
    views::render_error(StatusCode::NOT_FOUND, "Page not found!")
}

pub fn build_router(services: AppServices) -> Router {
    let static_files =
        ServeDir::new(&services.static_dir).not_found_service(not_found.into_service());

    Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .merge(auth::routes::routes(services.auth))
        .merge(listings::routes::routes(services.listings))
        .merge(reviews::routes::routes(services.reviews))
        .fallback_service(static_files)
        .layer(axum::middleware::from_fn_with_state(
            services.sessions,
            middleware::session_middleware,
        ))
        .layer(DefaultBodyLimit::max(services.max_request_body_size))
        .layer(
            ServiceBuilder::new()
                // Generate X-Request-Id using UUID v7 (or use client-provided one)
                .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(middleware::MakeSpanWithRequestId)
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                // Propagate X-Request-Id to response headers
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}
