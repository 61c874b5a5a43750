#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone types shared by the gazetteer loader, the zone detector and the
//! enriched snapshot.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Display name of the fallback zone.
pub const GENERAL_ZONE_NAME: &str = "Zona General";

/// Colombian administrative zone kind.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum ZoneKind {
    /// Urban neighborhood.
    Barrio,
    /// Rural district.
    Corregimiento,
    /// Rural hamlet.
    Vereda,
    /// No positive match.
    General,
}

impl ZoneKind {
    /// Whether a gazetteer entry may carry this kind.
    #[must_use]
    pub const fn is_gazetteer_kind(self) -> bool {
        !matches!(self, Self::General)
    }
}

/// One official zone from the municipal gazetteer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteerEntry {
    /// Upper-cased, trimmed zone name (e.g., `"PUERTO VIEJO"`).
    pub name: String,
    /// Zone kind.
    pub kind: ZoneKind,
}

/// Result of zone detection for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectedZone {
    /// A gazetteer entry matched.
    Matched {
        /// Title-cased zone name.
        name: String,
        /// Kind of the matched entry.
        kind: ZoneKind,
    },
    /// Nothing matched; renders as [`GENERAL_ZONE_NAME`].
    General,
}

impl DetectedZone {
    /// Display name. Never empty.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Matched { name, .. } => name,
            Self::General => GENERAL_ZONE_NAME,
        }
    }

    /// Zone kind; [`ZoneKind::General`] for the fallback.
    #[must_use]
    pub const fn kind(&self) -> ZoneKind {
        match self {
            Self::Matched { kind, .. } => *kind,
            Self::General => ZoneKind::General,
        }
    }

    /// Whether a gazetteer entry positively matched.
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kind_case_insensitively() {
        assert_eq!("barrio".parse::<ZoneKind>().unwrap(), ZoneKind::Barrio);
        assert_eq!("VEREDA".parse::<ZoneKind>().unwrap(), ZoneKind::Vereda);
        assert_eq!(
            "Corregimiento".parse::<ZoneKind>().unwrap(),
            ZoneKind::Corregimiento
        );
        assert!("Comuna".parse::<ZoneKind>().is_err());
    }

    #[test]
    fn kind_serializes_as_display_name() {
        assert_eq!(serde_json::to_string(&ZoneKind::Barrio).unwrap(), "\"Barrio\"");
        assert_eq!(ZoneKind::General.to_string(), "General");
        assert!(!ZoneKind::General.is_gazetteer_kind());
        assert!(ZoneKind::Vereda.is_gazetteer_kind());
    }

    #[test]
    fn general_zone_has_sentinel_name() {
        assert_eq!(DetectedZone::General.name(), "Zona General");
        assert_eq!(DetectedZone::General.kind(), ZoneKind::General);
        assert!(!DetectedZone::General.is_matched());

        let matched = DetectedZone::Matched {
            name: "Pita Abajo".to_string(),
            kind: ZoneKind::Corregimiento,
        };
        assert_eq!(matched.name(), "Pita Abajo");
        assert_eq!(matched.kind(), ZoneKind::Corregimiento);
        assert!(matched.is_matched());
    }
}
