//! Startup checks for optional third-party integrations.
//!
//! Every integration (geocoding providers, image store, session secret) is
//! validated exactly once when the process starts. Validation never fails:
//! a missing or malformed credential only disables the integration so the
//! application can run in degraded mode.

use crate::core::config::Config;

/// Mapbox access tokens are either public (`pk.`) or secret (`sk.`)
pub const MAPBOX_TOKEN_PREFIXES: &[&str] = &["pk.", "sk."];

/// Prefix of Mapbox tokens that may be handed to browsers
pub const MAPBOX_PUBLIC_TOKEN_PREFIX: &str = "pk.";

/// Minimum length of a session signing secret
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Returns true when every field is present and not blank.
pub fn validate(fields: &[Option<&str>]) -> bool {
    !fields.is_empty()
        && fields
            .iter()
            .all(|field| field.is_some_and(|value| !value.trim().is_empty()))
}

/// Like [`validate`], but the first field must also start with one of `prefixes`.
pub fn validate_with_prefix(fields: &[Option<&str>], prefixes: &[&str]) -> bool {
    validate(fields)
        && fields
            .first()
            .copied()
            .flatten()
            .is_some_and(|token| prefixes.iter().any(|prefix| token.starts_with(prefix)))
}

pub fn validate_mapbox_token(token: Option<&str>) -> bool {
    validate_with_prefix(&[token], MAPBOX_TOKEN_PREFIXES)
}

pub fn validate_geoapify_key(api_key: Option<&str>) -> bool {
    validate(&[api_key])
}

pub fn validate_session_secret(secret: Option<&str>) -> bool {
    validate(&[secret]) && secret.is_some_and(|s| s.trim().len() >= MIN_SESSION_SECRET_LEN)
}

/// Enabled/disabled state of each optional integration.
///
/// Computed once in `main` and passed by value to whatever needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntegrationStatus {
    pub mapbox: bool,
    pub geoapify: bool,
    pub image_store: bool,
    pub session_secret: bool,
}

impl IntegrationStatus {
    pub fn from_config(config: &Config) -> Self {
        let geocoding = &config.geocoding;
        let store = &config.image_store;

        Self {
            mapbox: validate_mapbox_token(geocoding.mapbox_token.as_deref()),
            geoapify: validate_geoapify_key(geocoding.geoapify_api_key.as_deref()),
            image_store: validate(&[
                store.endpoint.as_deref(),
                store.access_key.as_deref(),
                store.secret_key.as_deref(),
                store.bucket.as_deref(),
            ]),
            session_secret: validate_session_secret(config.session.secret.as_deref()),
        }
    }

    /// True when at least one geocoding provider can be used
    pub fn geocoding_available(&self) -> bool {
        self.mapbox || self.geoapify
    }

    /// Log the state of every integration (called once at startup)
    pub fn log_summary(&self) {
        if self.mapbox {
            tracing::info!("Mapbox token configured");
        } else {
            tracing::warn!(
                "Mapbox token missing or malformed (MAP_TOKEN must start with 'pk.' or 'sk.'). \
                 Mapbox geocoding and maps are disabled"
            );
        }

        if self.geoapify {
            tracing::info!("Geoapify API key configured");
        } else {
            tracing::warn!("Geoapify API key not configured. Geoapify geocoding is disabled");
        }

        if !self.geocoding_available() {
            tracing::warn!(
                "No geocoding provider available. Listings can still be created without location maps"
            );
        }

        if self.image_store {
            tracing::info!("Image store credentials configured");
        } else {
            tracing::warn!(
                "Image store is not configured. Image uploads are disabled; listings use the placeholder image"
            );
        }

        if self.session_secret {
            tracing::info!("Session secret configured");
        } else {
            tracing::warn!(
                "SESSION_SECRET missing or shorter than {} characters. \
                 Using a per-process secret; sessions will not survive restarts",
                MIN_SESSION_SECRET_LEN
            );
        }
    }
}

/// Mapbox token safe to expose to the map script, if any.
///
/// Only public (`pk.`) tokens are returned; secret tokens stay server-side.
pub fn public_map_token(config: &Config, status: &IntegrationStatus) -> Option<String> {
    if !status.mapbox {
        return None;
    }
    config
        .geocoding
        .mapbox_token
        .as_ref()
        .filter(|token| token.starts_with(MAPBOX_PUBLIC_TOKEN_PREFIX))
        .cloned()
}
