#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the DIME server.
//!
//! Field names are Spanish because the map frontend reads them as-is.
//! They are separate from the snapshot types so the API contract can
//! evolve independently.

use serde::{Deserialize, Serialize};

/// A facility as shown on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiPlace {
    /// 1-based position in the source order.
    pub id: usize,
    /// Normalized name.
    pub nombre: String,
    /// Normalized category.
    pub categoria: String,
    /// Reverse address, or the formatted zone label.
    pub direccion: String,
    /// Location.
    pub ubicacion: ApiLocation,
}

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApiLocation {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The citizen's question.
    pub pregunta: String,
}

/// Reply of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The assistant's answer, or a fixed apology.
    pub respuesta: String,
}

/// Liveness banner served at `/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiBanner {
    /// Short status line.
    pub estado: String,
    /// Greeting.
    pub mensaje: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Places currently served.
    pub places: usize,
}

/// Reply of `POST /api/reload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    /// Places served after the reload.
    pub places: usize,
}
