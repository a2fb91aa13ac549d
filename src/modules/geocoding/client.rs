use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{FailureKind, GeocodeOutcome, GeocodeQuery, Geocoder, Point, ProviderFailure};
use crate::core::config::GeocodingConfig;
use crate::core::error::{AppError, Result};
use crate::core::integrations::IntegrationStatus;

/// Only the best candidate is ever used
const RESULT_LIMIT: u8 = 1;

/// Supported forward-geocoding APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocodingProvider {
    Mapbox,
    Geoapify,
}

impl GeocodingProvider {
    pub fn name(&self) -> &'static str {
        match self {
            GeocodingProvider::Mapbox => "mapbox",
            GeocodingProvider::Geoapify => "geoapify",
        }
    }

    fn is_enabled(&self, status: &IntegrationStatus) -> bool {
        match self {
            GeocodingProvider::Mapbox => status.mapbox,
            GeocodingProvider::Geoapify => status.geoapify,
        }
    }

    /// Pick the provider to use.
    ///
    /// An explicit, enabled preference wins; otherwise Geoapify, then Mapbox.
    pub fn select(preferred: Option<&str>, status: &IntegrationStatus) -> Option<Self> {
        let preferred = match preferred {
            Some("mapbox") => Some(GeocodingProvider::Mapbox),
            Some("geoapify") => Some(GeocodingProvider::Geoapify),
            Some(other) => {
                tracing::warn!("Unknown GEOCODING_PROVIDER '{}', ignoring", other);
                None
            }
            None => None,
        };

        if let Some(provider) = preferred {
            if provider.is_enabled(status) {
                return Some(provider);
            }
            tracing::warn!(
                "GEOCODING_PROVIDER={} requested but not configured, falling back",
                provider.name()
            );
        }

        [GeocodingProvider::Geoapify, GeocodingProvider::Mapbox]
            .into_iter()
            .find(|provider| provider.is_enabled(status))
    }
}

/// GeoJSON feature collection returned by both providers
#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<FeatureGeometry>,
}

#[derive(Debug, Deserialize)]
struct FeatureGeometry {
    coordinates: Vec<f64>,
}

/// HTTP client for the selected geocoding provider
pub struct GeocodingClient {
    provider: GeocodingProvider,
    credential: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl GeocodingClient {
    pub fn new(
        provider: GeocodingProvider,
        credential: String,
        base_url: String,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent("Wanderlust/1.0")
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            provider,
            credential,
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Build the client for the enabled provider, or `None` when geocoding is disabled
    pub fn from_config(config: &GeocodingConfig, status: &IntegrationStatus) -> Result<Option<Self>> {
        let Some(provider) = GeocodingProvider::select(config.preferred_provider.as_deref(), status)
        else {
            return Ok(None);
        };

        let (credential, base_url) = match provider {
            GeocodingProvider::Mapbox => (&config.mapbox_token, &config.mapbox_base_url),
            GeocodingProvider::Geoapify => (&config.geoapify_api_key, &config.geoapify_base_url),
        };

        // Selection only returns validated providers, so the credential is present
        let credential = credential.clone().unwrap_or_default();

        Self::new(provider, credential, base_url.clone(), config.timeout).map(Some)
    }

    pub fn provider(&self) -> GeocodingProvider {
        self.provider
    }

    fn request_url(&self, query: &GeocodeQuery) -> String {
        let text = urlencoding::encode(query.as_str());
        let credential = urlencoding::encode(&self.credential);

        match self.provider {
            GeocodingProvider::Mapbox => format!(
                "{}/geocoding/v5/mapbox.places/{}.json?access_token={}&limit={}",
                self.base_url, text, credential, RESULT_LIMIT
            ),
            GeocodingProvider::Geoapify => format!(
                "{}/v1/geocode/search?text={}&limit={}&apiKey={}",
                self.base_url, text, RESULT_LIMIT, credential
            ),
        }
    }

    async fn lookup(&self, query: &GeocodeQuery) -> std::result::Result<Option<Point>, ProviderFailure> {
        let response = self
            .http_client
            .get(self.request_url(query))
            .send()
            .await
            .map_err(|e| {
                // Strip the URL: it carries the credential
                ProviderFailure::new(
                    FailureKind::Transient,
                    format!("request failed: {}", e.without_url()),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let body = response.bytes().await.map_err(|e| {
            ProviderFailure::new(
                FailureKind::Transient,
                format!("failed to read body: {}", e.without_url()),
            )
        })?;

        first_point(&body)
    }
}

#[async_trait]
impl Geocoder for GeocodingClient {
    fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    async fn geocode(&self, query: &GeocodeQuery) -> GeocodeOutcome {
        tracing::debug!("Geocoding '{}' via {}", query.as_str(), self.provider.name());

        match self.lookup(query).await {
            Ok(Some(point)) => GeocodeOutcome::Found(point),
            Ok(None) => GeocodeOutcome::NotFound,
            Err(failure) => {
                if failure.is_permanent() {
                    tracing::error!(
                        "{} rejected the configured credential: {}",
                        self.provider.name(),
                        failure.reason
                    );
                } else {
                    tracing::warn!("{} lookup failed: {}", self.provider.name(), failure);
                }
                GeocodeOutcome::ProviderError(failure)
            }
        }
    }
}

fn classify_status(status: StatusCode) -> ProviderFailure {
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FailureKind::Authentication,
        _ => FailureKind::Transient,
    };
    ProviderFailure::new(kind, format!("provider responded with status {}", status))
}

/// Extract the first candidate of a GeoJSON feature collection
fn first_point(body: &[u8]) -> std::result::Result<Option<Point>, ProviderFailure> {
    let collection: FeatureCollection = serde_json::from_slice(body).map_err(|e| {
        ProviderFailure::new(
            FailureKind::MalformedResponse,
            format!("failed to parse response: {}", e),
        )
    })?;

    let Some(feature) = collection.features.into_iter().next() else {
        return Ok(None);
    };

    feature
        .geometry
        .and_then(|geometry| Point::from_coordinates(&geometry.coordinates))
        .map(Some)
        .ok_or_else(|| {
            ProviderFailure::new(
                FailureKind::MalformedResponse,
                "first candidate has no usable point geometry",
            )
        })
}
