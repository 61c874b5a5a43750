//! Dataset registry. Loads all dataset definitions from embedded TOML.
//!
//! Each `.toml` file in `packages/source/datasets/` is baked into the
//! binary at compile time via [`include_str!`]. Adding a municipality means
//! adding a TOML file and listing it below.

use dime_source_models::DatasetDefinition;

/// TOML configs embedded at compile time.
const DATASET_TOMLS: &[(&str, &str)] = &[("tolu", include_str!("../datasets/tolu.toml"))];

/// Dataset used when none is configured.
pub const DEFAULT_DATASET_ID: &str = "tolu";

/// Total number of configured datasets (used in tests).
#[cfg(test)]
const EXPECTED_DATASET_COUNT: usize = 1;

/// Returns all configured dataset definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (the configs are embedded, so
/// this is caught by the tests below).
#[must_use]
pub fn all_datasets() -> Vec<DatasetDefinition> {
    DATASET_TOMLS
        .iter()
        .map(|(name, toml)| {
            toml::de::from_str(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a dataset by id (case-insensitive).
#[must_use]
pub fn find_dataset(id: &str) -> Option<DatasetDefinition> {
    all_datasets()
        .into_iter()
        .find(|d| d.id.eq_ignore_ascii_case(id))
}
