#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Official gazetteer loading and hybrid zone detection.
//!
//! The municipal gazetteer (barrios, corregimientos, veredas) is fetched
//! once per enrichment run from the open-data portal. Each located record
//! is then assigned a zone by matching free text against the gazetteer,
//! falling back to a reverse-geocode lookup of locality names.

pub mod detect;
pub mod gazetteer;

use thiserror::Error;

pub use detect::detect_zone;
pub use gazetteer::Gazetteer;

/// Errors that can occur during neighborhood operations.
#[derive(Debug, Error)]
pub enum NeighborhoodError {
    /// Portal request failed.
    #[error("Source error: {0}")]
    Source(#[from] dime_source::SourceError),

    /// The dataset has no gazetteer resource.
    #[error("Dataset {dataset} has no gazetteer")]
    NoGazetteer {
        /// Dataset identifier.
        dataset: String,
    },
}
