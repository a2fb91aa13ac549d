use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub image_store: ImageStoreConfig,
    pub geocoding: GeocodingConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub max_request_body_size: usize,
    pub static_dir: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

/// Cookie session settings. The secret is kept raw here and checked by
/// [`crate::core::integrations`] at startup.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: Option<String>,
    pub ttl: Duration,
    pub secure_cookie: bool,
}

/// S3/MinIO-compatible image store configuration.
///
/// Credentials are optional: when any of them is missing the image store is
/// disabled and listings fall back to the placeholder image.
#[derive(Debug, Clone)]
pub struct ImageStoreConfig {
    /// S3 endpoint URL
    pub endpoint: Option<String>,
    /// Public endpoint URL for browser access (defaults to endpoint)
    pub public_endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: Option<String>,
    /// AWS region (for S3 compatibility)
    pub region: String,
    /// Prefix for publicly readable objects (e.g., "public")
    pub public_prefix: String,
}

/// Raw geocoding credentials and client settings
#[derive(Debug, Clone)]
pub struct GeocodingConfig {
    pub mapbox_token: Option<String>,
    pub geoapify_api_key: Option<String>,
    /// Explicit provider choice ("mapbox" or "geoapify")
    pub preferred_provider: Option<String>,
    pub mapbox_base_url: String,
    pub geoapify_base_url: String,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            session: SessionConfig::from_env()?,
            image_store: ImageStoreConfig::from_env(),
            geocoding: GeocodingConfig::from_env()?,
        })
    }
}

/// Read an optional variable, treating empty values as unset
fn optional_var(key: &str) -> Option<String> {
    credential_var(key).filter(|v| !v.is_empty())
}

/// Read a credential with surrounding whitespace removed. A blank value is
/// kept so the integration validator can report it.
fn credential_var(key: &str) -> Option<String> {
    trimmed(env::var(key).ok())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| "public".to_string());

        Ok(Self {
            host,
            port,
            max_request_body_size,
            static_dir,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    // Default values for database connection pool (conservative defaults for small-medium apps)
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = optional_var("DATABASE_URL").ok_or_else(|| {
            "DATABASE_URL must be set. Create a .env file with your PostgreSQL connection URL."
                .to_string()
        })?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        })
    }
}

impl SessionConfig {
    const DEFAULT_TTL_SECS: u64 = 7 * 24 * 60 * 60; // 7 days

    pub fn from_env() -> Result<Self, String> {
        let ttl_secs = env::var("SESSION_TTL_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_TTL_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "SESSION_TTL_SECS must be a valid number".to_string())?;

        let secure_cookie = env::var("SESSION_SECURE_COOKIE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            secret: credential_var("SESSION_SECRET"),
            ttl: Duration::from_secs(ttl_secs),
            secure_cookie,
        })
    }
}

impl ImageStoreConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: optional_var("IMAGE_STORE_ENDPOINT"),
            public_endpoint: optional_var("IMAGE_STORE_PUBLIC_ENDPOINT"),
            access_key: credential_var("IMAGE_STORE_ACCESS_KEY"),
            secret_key: credential_var("IMAGE_STORE_SECRET_KEY"),
            bucket: credential_var("IMAGE_STORE_BUCKET"),
            region: env::var("IMAGE_STORE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            public_prefix: env::var("IMAGE_STORE_PUBLIC_PREFIX")
                .unwrap_or_else(|_| "public".to_string()),
        }
    }
}

impl GeocodingConfig {
    const DEFAULT_MAPBOX_BASE_URL: &'static str = "https://api.mapbox.com";
    const DEFAULT_GEOAPIFY_BASE_URL: &'static str = "https://api.geoapify.com";
    const DEFAULT_TIMEOUT_SECS: u64 = 10;

    pub fn from_env() -> Result<Self, String> {
        let timeout_secs = env::var("GEOCODING_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "GEOCODING_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            // Shape checks happen once in the integration validator
            mapbox_token: credential_var("MAP_TOKEN"),
            geoapify_api_key: credential_var("GEOAPIFY_API_KEY"),
            preferred_provider: optional_var("GEOCODING_PROVIDER").map(|p| p.to_lowercase()),
            mapbox_base_url: env::var("MAPBOX_BASE_URL")
                .unwrap_or_else(|_| Self::DEFAULT_MAPBOX_BASE_URL.to_string()),
            geoapify_base_url: env::var("GEOAPIFY_BASE_URL")
                .unwrap_or_else(|_| Self::DEFAULT_GEOAPIFY_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
