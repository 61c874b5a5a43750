#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reverse geocoding for facility coordinates.
//!
//! Converts a [`Coordinate`] into a human-readable address and the raw
//! address components (neighbourhood, village, ...) used by zone
//! detection. The service is configured via TOML files in `services/`:
//!
//! - **Nominatim / OpenStreetMap**: free, strict 1 req/sec usage policy,
//!   mandatory `User-Agent`.
//!
//! [`ReverseGeocoder`] wraps any [`ReverseGeocodeBackend`] with retry,
//! backoff and pacing so callers never issue concurrent requests.

pub mod nominatim;
pub mod reverse;
pub mod service_registry;

use std::collections::BTreeMap;

use async_trait::async_trait;
use dime_source_models::Coordinate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use nominatim::NominatimBackend;
pub use reverse::{RetryPolicy, ReverseGeocoder};

/// Address-component keys read as locality candidates, in priority order.
pub const LOCALITY_FIELDS: &[&str] = &["neighbourhood", "village", "suburb", "hamlet", "town"];

/// A reverse-geocoding result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseGeocodedPlace {
    /// Full formatted address, if the service returned one.
    pub display_name: Option<String>,
    /// Raw address components keyed by component name.
    pub address: BTreeMap<String, String>,
}

impl ReverseGeocodedPlace {
    /// Returns the formatted address when it carries content.
    #[must_use]
    pub fn address_line(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Non-empty locality-like components in [`LOCALITY_FIELDS`] order.
    pub fn locality_candidates(&self) -> impl Iterator<Item = &str> {
        LOCALITY_FIELDS.iter().filter_map(|field| {
            self.address
                .get(*field)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        })
    }
}

/// A reverse-geocoding service.
///
/// Implementations perform exactly one request per call; retries and
/// pacing are the job of [`ReverseGeocoder`].
#[async_trait]
pub trait ReverseGeocodeBackend: Send + Sync {
    /// Looks up the place at `coordinate`. `Ok(None)` means the service
    /// answered but has nothing there.
    async fn reverse(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<ReverseGeocodedPlace>, GeocodeError>;
}

/// Errors from reverse-geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error status.
    #[error("HTTP status {status}")]
    Status {
        /// Response status code.
        status: u16,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

impl GeocodeError {
    /// Whether retrying the same request may succeed.
    ///
    /// Timeouts, connection failures, HTTP 429 and HTTP 5xx are transient.
    /// Malformed bodies and other 4xx responses are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            Self::Status { status } => *status == 429 || (500..600).contains(status),
            Self::RateLimited => true,
            Self::Parse { .. } => false,
        }
    }
}
