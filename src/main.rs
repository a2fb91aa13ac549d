mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::integrations::{self, IntegrationStatus};
use crate::core::database;
use crate::core::router::{build_router, AppServices};
use crate::features::auth::{AuthService, AuthState, PgUserRepository, SessionService};
use crate::features::listings::{ListingService, ListingsState, PgListingRepository};
use crate::features::reviews::{PgReviewRepository, ReviewService};
use crate::modules::geocoding::{Geocoder, GeocodingClient};
use crate::modules::storage::{ImageStore, S3ImageStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: tokio_worker_threads={}, pid={}",
        worker_threads,
        std::process::id()
    );
    tracing::info!("Configuration loaded successfully");

    // Validate integrations once; everything below reads this snapshot
    let status = IntegrationStatus::from_config(&config);
    status.log_summary();

    // Create database connection pool
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    // Run migrations automatically
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Sessions and accounts
    let sessions = Arc::new(SessionService::new(&config.session));
    let auth_service = Arc::new(AuthService::new(Arc::new(PgUserRepository::new(
        pool.clone(),
    ))));
    tracing::info!("Auth service initialized");

    // Geocoding (optional)
    let geocoder: Option<Arc<dyn Geocoder>> =
        match GeocodingClient::from_config(&config.geocoding, &status) {
            Ok(Some(client)) => {
                tracing::info!("Geocoding enabled via {}", client.provider().name());
                Some(Arc::new(client) as Arc<dyn Geocoder>)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Geocoding client could not be built: {}. Geocoding disabled", e);
                None
            }
        };

    // Image store (optional)
    let images: Option<Arc<dyn ImageStore>> = if status.image_store {
        match S3ImageStore::connect(&config.image_store).await {
            Ok(store) => Some(Arc::new(store) as Arc<dyn ImageStore>),
            Err(e) => {
                tracing::warn!("Image store unavailable: {}. Image uploads disabled", e);
                None
            }
        }
    } else {
        None
    };

    let listing_repository = Arc::new(PgListingRepository::new(pool.clone()));
    let listing_service = Arc::new(ListingService::new(
        listing_repository.clone(),
        geocoder,
    ));
    let review_service = Arc::new(ReviewService::new(
        Arc::new(PgReviewRepository::new(pool.clone())),
        listing_repository,
    ));
    tracing::info!("Listing and review services initialized");

    let app = build_router(AppServices {
        auth: AuthState {
            auth: auth_service,
            sessions: Arc::clone(&sessions),
        },
        listings: ListingsState {
            listings: listing_service,
            images,
            map_token: integrations::public_map_token(&config, &status),
        },
        reviews: review_service,
        sessions,
        static_dir: config.app.static_dir.clone(),
        max_request_body_size: config.app.max_request_body_size,
    });

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
