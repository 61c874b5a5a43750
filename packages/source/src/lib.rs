#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Open-data source access for the DIME pipeline.
//!
//! Fetches facility records from a Socrata (SODA) portal, extracts
//! validated coordinates from their heterogeneous schemas, and exposes the
//! compile-time registry of known municipal datasets.

pub mod coordinates;
pub mod progress;
pub mod registry;
pub mod retry;
pub mod socrata;

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The portal answered with a status that will not succeed on retry.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: reqwest::StatusCode,
        /// Requested URL.
        url: String,
    },

    /// The response was well-formed JSON but not the expected shape.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse {
        /// Description of what went wrong.
        message: String,
    },
}
