#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Enrichment output types.
//!
//! An [`EnrichedRecord`] is the raw portal record with three extra fields
//! appended. The ordered list of enriched records is the [`Snapshot`]
//! persisted to disk and read back by the serving layer.

use std::time::Duration;

use dime_neighborhood_models::{DetectedZone, GENERAL_ZONE_NAME, ZoneKind};
use dime_source_models::RawRecord;
use serde::{Deserialize, Serialize};

/// A raw record plus the fields added by enrichment.
///
/// The raw fields are flattened on serialization, so the snapshot reads
/// as the portal's own records with `reverse_address`,
/// `detected_zone_name` and `detected_zone_kind` appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    /// The portal record, untouched.
    #[serde(flatten)]
    pub raw: RawRecord,
    /// Formatted address from reverse geocoding, if one was obtained.
    pub reverse_address: Option<String>,
    /// Detected zone name. Never empty.
    pub detected_zone_name: String,
    /// Detected zone kind.
    pub detected_zone_kind: ZoneKind,
}

impl EnrichedRecord {
    /// Wraps a located record with its geocoding results.
    #[must_use]
    pub fn new(raw: RawRecord, reverse_address: Option<String>, zone: &DetectedZone) -> Self {
        Self {
            raw,
            reverse_address,
            detected_zone_name: zone.name().to_string(),
            detected_zone_kind: zone.kind(),
        }
    }

    /// Wraps a record without a usable coordinate.
    #[must_use]
    pub fn unlocatable(raw: RawRecord) -> Self {
        Self {
            raw,
            reverse_address: None,
            detected_zone_name: GENERAL_ZONE_NAME.to_string(),
            detected_zone_kind: ZoneKind::General,
        }
    }

    /// Whether a gazetteer zone was positively detected.
    #[must_use]
    pub fn has_zone(&self) -> bool {
        self.detected_zone_kind != ZoneKind::General
    }

    /// Reverse address when it carries content.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.reverse_address
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// The ordered output of one enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    /// Records in fetch order.
    pub records: Vec<EnrichedRecord>,
}

impl Snapshot {
    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recomputes the counters derivable from the records alone.
    ///
    /// Unlocatable records cannot be told apart from located records whose
    /// lookup failed once persisted, so both count as missing addresses and
    /// `unlocatable` stays zero.
    #[must_use]
    pub fn summarize(&self) -> RunSummary {
        let addresses_found = self
            .records
            .iter()
            .filter(|r| r.address().is_some())
            .count();
        RunSummary {
            total: self.len(),
            addresses_found,
            addresses_missing: self.len() - addresses_found,
            unlocatable: 0,
            zones_detected: self.records.iter().filter(|r| r.has_zone()).count(),
            gazetteer_entries: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records fetched and written.
    pub total: usize,
    /// Records with a reverse address.
    pub addresses_found: usize,
    /// Records without one, unlocatable records included.
    pub addresses_missing: usize,
    /// Records without a usable coordinate.
    pub unlocatable: usize,
    /// Records with a gazetteer zone.
    pub zones_detected: usize,
    /// Entries in the gazetteer used for the run.
    pub gazetteer_entries: usize,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}
