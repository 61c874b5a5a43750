//! Hybrid zone detection.
//!
//! Stage 1 matches free text (a reverse address or the raw zone label)
//! against gazetteer names. Stage 2 reverse-geocodes the coordinate and
//! matches locality components (`neighbourhood`, `village`, `suburb`,
//! `hamlet`, `town`). Anything else resolves to [`DetectedZone::General`].
//!
//! Matching is plain substring containment in either direction, so short
//! gazetteer names can match unrelated words. This is kept as-is.

use dime_geocoder::{ReverseGeocodeBackend, ReverseGeocoder};
use dime_neighborhood_models::{DetectedZone, GazetteerEntry};
use dime_normalize::title_case;
use dime_source_models::Coordinate;

use crate::Gazetteer;

/// Resolves the zone of a located record.
///
/// Never fails: lookup errors and misses resolve to
/// [`DetectedZone::General`].
pub async fn detect_zone<B: ReverseGeocodeBackend>(
    coordinate: Coordinate,
    free_text: Option<&str>,
    gazetteer: &Gazetteer,
    geocoder: &ReverseGeocoder<B>,
) -> DetectedZone {
    if gazetteer.is_empty() {
        return DetectedZone::General;
    }

    if let Some(entry) = free_text.and_then(|text| match_text(text, gazetteer)) {
        log::debug!("Zone {} matched from text at {coordinate}", entry.name);
        return matched(entry);
    }

    let place = match geocoder.lookup(coordinate).await {
        Ok(Some(place)) => place,
        Ok(None) => return DetectedZone::General,
        Err(e) => {
            log::warn!("Zone lookup failed at {coordinate}: {e}");
            return DetectedZone::General;
        }
    };

    let candidates: Vec<String> = place
        .locality_candidates()
        .map(str::to_uppercase)
        .collect();

    match match_candidates(&candidates, gazetteer) {
        Some(entry) => {
            log::debug!("Zone {} matched from locality at {coordinate}", entry.name);
            matched(entry)
        }
        None => DetectedZone::General,
    }
}

/// Stage 1: first entry whose name is inside the text, or which contains
/// the text.
fn match_text<'a>(text: &str, gazetteer: &'a Gazetteer) -> Option<&'a GazetteerEntry> {
    let text = text.trim().to_uppercase();
    if text.is_empty() {
        return None;
    }
    gazetteer
        .entries()
        .iter()
        .find(|entry| text.contains(&entry.name) || entry.name.contains(&text))
}

/// Stage 2: exact or candidate-inside-entry first, then containment in
/// either direction. Candidate order takes precedence over gazetteer
/// order.
fn match_candidates<'a>(
    candidates: &[String],
    gazetteer: &'a Gazetteer,
) -> Option<&'a GazetteerEntry> {
    let entries = gazetteer.entries();

    let strict = candidates.iter().find_map(|candidate| {
        entries
            .iter()
            .find(|entry| entry.name == *candidate || entry.name.contains(candidate.as_str()))
    });

    strict.or_else(|| {
        candidates.iter().find_map(|candidate| {
            entries.iter().find(|entry| {
                entry.name.contains(candidate.as_str()) || candidate.contains(&entry.name)
            })
        })
    })
}

fn matched(entry: &GazetteerEntry) -> DetectedZone {
    DetectedZone::Matched {
        name: title_case(&entry.name),
        kind: entry.kind,
    }
}
