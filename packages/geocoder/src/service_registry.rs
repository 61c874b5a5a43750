//! Compile-time registry of reverse-geocoding service configurations.
//!
//! Each service is defined in a TOML file under `services/`. The registry
//! embeds these at compile time and exposes them via [`all_services`] and
//! [`find_service`].

use std::time::Duration;

use serde::Deserialize;

/// A reverse-geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service may be used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Reverse endpoint URL.
    pub base_url: String,
    /// `User-Agent` sent with every request (mandatory for Nominatim).
    pub user_agent: String,
    /// Preferred response language (`accept-language`).
    pub language: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retry and pacing settings.
    pub retry: RetrySettings,
}

/// Retry and pacing settings, in milliseconds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetrySettings {
    /// Attempts per address lookup, including the first.
    pub max_attempts: u32,
    /// Base backoff, multiplied by the attempt number.
    pub backoff_ms: u64,
    /// Pause after a response without address content.
    pub empty_pause_ms: u64,
    /// Minimum spacing between consecutive requests.
    pub min_interval_ms: u64,
}

const fn default_true() -> bool {
    true
}

impl GeocodingService {
    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[("nominatim", include_str!("../services/nominatim.toml"))];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 1;

/// Returns all service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (the configs are embedded, so
/// this is caught by the tests below).
#[must_use]
pub fn all_services() -> Vec<GeocodingService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse geocoding service '{name}': {e}"))
        })
        .collect()
}

/// Returns the enabled service with the given id.
#[must_use]
pub fn find_service(id: &str) -> Option<GeocodingService> {
    all_services()
        .into_iter()
        .find(|s| s.enabled && s.id == id)
}
