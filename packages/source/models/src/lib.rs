#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset definition types, the raw record shape, and validated coordinates.
//!
//! Every municipal dataset is described by a [`DatasetDefinition`] (loaded
//! from TOML) that says where the facilities and gazetteer resources live
//! and which fields carry names, categories, zones, and coordinates.

use serde::{Deserialize, Serialize};

/// A record exactly as returned by the open-data portal.
///
/// No schema is guaranteed. Records are read, never mutated.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// A validated WGS84 coordinate.
///
/// Only constructible through [`Coordinate::new`], so a value of this type
/// always has finite, non-zero, in-range components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    /// Validates a latitude/longitude pair.
    ///
    /// Returns `None` if either component is non-finite or exactly zero
    /// (the portal's "not set" sentinel), if latitude is outside
    /// `[-90, 90]`, or if longitude is outside `[-180, 180]`.
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if lat == 0.0 || lng == 0.0 {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        Some(Self { lat, lng })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

/// A municipal dataset, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDefinition {
    /// Unique dataset identifier (e.g., `"tolu"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Municipality name as shown to citizens (e.g., "Santiago de Tolú").
    pub municipality: String,
    /// Facilities resource.
    pub places: PlacesSource,
    /// Official neighborhood/settlement list, if the portal publishes one.
    pub gazetteer: Option<GazetteerSource>,
}

impl DatasetDefinition {
    /// Returns the dataset identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// SODA resource holding the facilities records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesSource {
    /// Resource URL (e.g., `"https://www.datos.gov.co/resource/gi7q-5bgv.json"`).
    pub url: String,
    /// Maximum number of records requested (`$limit`).
    #[serde(default = "default_places_limit")]
    pub limit: u32,
    /// Field mapping for the facilities records.
    #[serde(default)]
    pub fields: PlaceFieldMapping,
}

/// SODA resource holding the official zone list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazetteerSource {
    /// Resource URL.
    pub url: String,
    /// Maximum number of entries requested (`$limit`).
    #[serde(default = "default_gazetteer_limit")]
    pub limit: u32,
    /// Field mapping for the gazetteer entries.
    #[serde(default)]
    pub fields: GazetteerFieldMapping,
}

/// Names of the facility fields the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceFieldMapping {
    /// Entity name.
    pub name: String,
    /// Entity category.
    pub category: String,
    /// Free-text zone label (e.g., `"URBANA"`).
    pub zone: String,
    /// `GeoJSON` point whose `coordinates` array is `[lng, lat]`.
    pub geo_point: String,
    /// Separate latitude scalar.
    pub latitude: String,
    /// Separate longitude scalar.
    pub longitude: String,
    /// Single `"lat,lng"` string.
    pub combined: String,
}

impl Default for PlaceFieldMapping {
    fn default() -> Self {
        Self {
            name: "infraestructura".to_string(),
            category: "categoria".to_string(),
            zone: "zona".to_string(),
            geo_point: "geo_loc".to_string(),
            latitude: "latitud".to_string(),
            longitude: "longitud".to_string(),
            combined: "coordenadas".to_string(),
        }
    }
}

/// Names of the gazetteer fields the loader reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazetteerFieldMapping {
    /// Zone name.
    pub name: String,
    /// Zone type (`Barrio`, `Corregimiento`, `Vereda`).
    pub kind: String,
}

impl Default for GazetteerFieldMapping {
    fn default() -> Self {
        Self {
            name: "nombre".to_string(),
            kind: "tipo".to_string(),
        }
    }
}

const fn default_places_limit() -> u32 {
    5000
}

const fn default_gazetteer_limit() -> u32 {
    1000
}
