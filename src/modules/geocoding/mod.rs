//! Forward geocoding of free-text locations.
//!
//! One [`Geocoder`] capability with two provider variants (Mapbox and
//! Geoapify) chosen once at startup. A lookup never fails the caller: "no
//! match" and "provider unavailable" are ordinary [`GeocodeOutcome`] values.

mod client;

pub use client::GeocodingClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A WGS84 point stored as `[longitude, latitude]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub longitude: f64,
    pub latitude: f64,
}

impl Point {
    /// Build a point, rejecting non-finite or out-of-range coordinates
    pub fn new(longitude: f64, latitude: f64) -> Option<Self> {
        let valid = longitude.is_finite()
            && latitude.is_finite()
            && (-180.0..=180.0).contains(&longitude)
            && (-90.0..=90.0).contains(&latitude);
        valid.then_some(Self {
            longitude,
            latitude,
        })
    }

    /// Build a point from a GeoJSON coordinate array (exactly `[lng, lat]`)
    pub fn from_coordinates(coordinates: &[f64]) -> Option<Self> {
        match coordinates {
            [longitude, latitude] => Self::new(*longitude, *latitude),
            _ => None,
        }
    }
}

/// Location text that is guaranteed not to be blank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeQuery(String);

impl GeocodeQuery {
    pub fn new(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Why a provider call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Credential rejected (401/403). Permanent until configuration changes.
    Authentication,
    /// Network error, timeout or non-success status
    Transient,
    /// Body could not be decoded or holds an unusable geometry
    MalformedResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl ProviderFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.kind == FailureKind::Authentication
    }
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.reason)
    }
}

/// Result of a single geocoding attempt
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeOutcome {
    /// First (highest-ranked) candidate
    Found(Point),
    /// The provider answered with zero candidates
    NotFound,
    ProviderError(ProviderFailure),
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Provider name for logs
    fn provider_name(&self) -> &'static str;

    /// Resolve `query` with one provider call. Never retries.
    async fn geocode(&self, query: &GeocodeQuery) -> GeocodeOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_range_checks() {
        assert!(Point::new(73.83, 15.49).is_some());
        assert!(Point::new(180.0, -90.0).is_some());
        assert!(Point::new(180.1, 0.0).is_none());
        assert!(Point::new(0.0, 90.5).is_none());
        assert!(Point::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_point_from_coordinates_requires_pair() {
        assert_eq!(
            Point::from_coordinates(&[73.83, 15.49]),
            Some(Point {
                longitude: 73.83,
                latitude: 15.49
            })
        );
        assert!(Point::from_coordinates(&[73.83]).is_none());
        assert!(Point::from_coordinates(&[73.83, 15.49, 10.0]).is_none());
    }

    #[test]
    fn test_query_rejects_blank_text() {
        assert!(GeocodeQuery::new("").is_none());
        assert!(GeocodeQuery::new("  \t ").is_none());
        assert_eq!(GeocodeQuery::new("  Goa, India ").unwrap().as_str(), "Goa, India");
    }
}
