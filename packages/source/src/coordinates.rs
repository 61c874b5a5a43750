//! Coordinate extraction from heterogeneous facility records.
//!
//! The portal publishes locations in three shapes, sometimes several at
//! once on the same record:
//!
//! 1. A `GeoJSON` point (`{"coordinates": [lng, lat]}`)
//! 2. Separate latitude / longitude scalars
//! 3. A single `"lat,lng"` string, occasionally wrapped in quotes
//!
//! The first shape present on a record wins; values are never merged
//! across shapes.

use dime_source_models::{Coordinate, PlaceFieldMapping, RawRecord};

/// Extracts a validated coordinate from a raw record.
///
/// Returns `None` when no coordinate shape is present, when the winning
/// shape cannot be parsed, or when the parsed pair fails
/// [`Coordinate::new`] validation.
#[must_use]
pub fn extract_coordinate(record: &RawRecord, fields: &PlaceFieldMapping) -> Option<Coordinate> {
    if let Some(point) = record
        .get(&fields.geo_point)
        .filter(|v| is_truthy(v))
        .and_then(|v| v.get("coordinates"))
    {
        return from_geojson_point(point);
    }

    if record.contains_key(&fields.latitude) && record.contains_key(&fields.longitude) {
        let lat = record.get(&fields.latitude).and_then(parse_number)?;
        let lng = record.get(&fields.longitude).and_then(parse_number)?;
        return Coordinate::new(lat, lng);
    }

    if let Some(combined) = record.get(&fields.combined).filter(|v| is_truthy(v)) {
        return from_combined(combined);
    }

    None
}

/// `GeoJSON` order is `[lng, lat]`.
fn from_geojson_point(coordinates: &serde_json::Value) -> Option<Coordinate> {
    let items = coordinates.as_array()?;
    if items.len() < 2 {
        return None;
    }
    let lng = parse_number(&items[0])?;
    let lat = parse_number(&items[1])?;
    Coordinate::new(lat, lng)
}

/// Parses `"lat,lng"`, tolerating stray quote characters.
fn from_combined(value: &serde_json::Value) -> Option<Coordinate> {
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let cleaned: String = text.chars().filter(|c| *c != '"' && *c != '\'').collect();
    let mut parts = cleaned.split(',');
    let lat = parts.next()?.trim().parse::<f64>().ok()?;
    let lng = parts.next()?.trim().parse::<f64>().ok()?;
    Coordinate::new(lat, lng)
}

/// Reads a JSON number or numeric string as `f64`.
fn parse_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Null, empty strings, empty arrays, and empty objects count as unset.
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
        serde_json::Value::Number(_) => true,
    }
}
