//! Municipal gazetteer loader.
//!
//! The gazetteer is a single SODA resource listing every official zone
//! with its kind (`{"nombre": "PUERTO VIEJO", "tipo": "corregimiento"}`).
//! Entries without a name or a recognised kind are dropped and counted.

use dime_neighborhood_models::{GazetteerEntry, ZoneKind};
use dime_normalize::capitalize;
use dime_source::socrata::{self, SocrataQuery};
use dime_source_models::{DatasetDefinition, GazetteerFieldMapping, RawRecord};

use crate::NeighborhoodError;

/// Official zones in portal order. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gazetteer {
    entries: Vec<GazetteerEntry>,
}

impl Gazetteer {
    /// Wraps already-normalized entries.
    #[must_use]
    pub const fn new(entries: Vec<GazetteerEntry>) -> Self {
        Self { entries }
    }

    /// Entries in portal order.
    #[must_use]
    pub fn entries(&self) -> &[GazetteerEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds a gazetteer from raw portal records.
///
/// Returns the gazetteer and the number of dropped records.
#[must_use]
pub fn parse_entries(records: &[RawRecord], fields: &GazetteerFieldMapping) -> (Gazetteer, usize) {
    let mut entries = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for (i, record) in records.iter().enumerate() {
        let name = text_field(record, &fields.name);
        let kind = text_field(record, &fields.kind);

        let (Some(name), Some(kind)) = (name, kind) else {
            log::debug!("Gazetteer record {i}: missing name or kind, dropped");
            dropped += 1;
            continue;
        };

        let kind_label = capitalize(&kind);
        match kind_label.parse::<ZoneKind>() {
            Ok(kind) if kind.is_gazetteer_kind() => entries.push(GazetteerEntry {
                name: name.to_uppercase(),
                kind,
            }),
            _ => {
                log::warn!("Gazetteer record {i} ({name}): unknown zone kind {kind_label:?}, dropped");
                dropped += 1;
            }
        }
    }

    (Gazetteer::new(entries), dropped)
}

/// Fetches and parses the dataset's gazetteer.
///
/// # Errors
///
/// Returns [`NeighborhoodError`] if the dataset has no gazetteer or the
/// fetch fails.
pub async fn fetch(
    client: &reqwest::Client,
    dataset: &DatasetDefinition,
    app_token: Option<&str>,
) -> Result<Gazetteer, NeighborhoodError> {
    let source = dataset
        .gazetteer
        .as_ref()
        .ok_or_else(|| NeighborhoodError::NoGazetteer {
            dataset: dataset.id.clone(),
        })?;

    let query = SocrataQuery {
        url: &source.url,
        app_token,
        limit: source.limit,
        filter: None,
        label: "gazetteer",
    };
    let records = socrata::fetch_records(client, &query).await?;
    let (gazetteer, dropped) = parse_entries(&records, &source.fields);

    log::info!(
        "Loaded {} gazetteer entries ({dropped} dropped)",
        gazetteer.len()
    );
    Ok(gazetteer)
}

/// Loads the gazetteer, degrading to an empty one on any failure.
///
/// With an empty gazetteer every record's zone falls back to
/// "Zona General"; the run continues.
pub async fn load(
    client: &reqwest::Client,
    dataset: &DatasetDefinition,
    app_token: Option<&str>,
) -> Gazetteer {
    match fetch(client, dataset, app_token).await {
        Ok(gazetteer) => gazetteer,
        Err(e) => {
            log::warn!("Gazetteer unavailable, zones will fall back to General: {e}");
            Gazetteer::default()
        }
    }
}

/// Reads a field as trimmed, non-empty text. Numbers are accepted.
fn text_field(record: &RawRecord, field: &str) -> Option<String> {
    let text = match record.get(field)? {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: serde_json::Value) -> Vec<RawRecord> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn normalizes_names_and_kinds() {
        let (gazetteer, dropped) = parse_entries(
            &records(json!([
                { "nombre": "  Puerto Viejo ", "tipo": "CORREGIMIENTO" },
                { "nombre": "el palmar", "tipo": " vereda " },
                { "nombre": "Centro", "tipo": "barrio" }
            ])),
            &GazetteerFieldMapping::default(),
        );
        assert_eq!(dropped, 0);
        assert_eq!(
            gazetteer.entries(),
            &[
                GazetteerEntry {
                    name: "PUERTO VIEJO".to_string(),
                    kind: ZoneKind::Corregimiento
                },
                GazetteerEntry {
                    name: "EL PALMAR".to_string(),
                    kind: ZoneKind::Vereda
                },
                GazetteerEntry {
                    name: "CENTRO".to_string(),
                    kind: ZoneKind::Barrio
                },
            ]
        );
    }

    #[test]
    fn drops_incomplete_and_unknown_entries() {
        let (gazetteer, dropped) = parse_entries(
            &records(json!([
                { "nombre": "", "tipo": "Barrio" },
                { "nombre": "Centro" },
                { "nombre": "La Perla", "tipo": "   " },
                { "nombre": "Comuna 1", "tipo": "Comuna" },
                { "nombre": "General", "tipo": "General" },
                { "nombre": "Pita Abajo", "tipo": "Corregimiento" }
            ])),
            &GazetteerFieldMapping::default(),
        );
        assert_eq!(dropped, 5);
        assert_eq!(gazetteer.len(), 1);
        assert_eq!(gazetteer.entries()[0].name, "PITA ABAJO");
    }

    #[test]
    fn honors_custom_field_names() {
        let fields = GazetteerFieldMapping {
            name: "barrio".to_string(),
            kind: "clase".to_string(),
        };
        let (gazetteer, dropped) = parse_entries(
            &records(json!([{ "barrio": "Nueva Era", "clase": "Barrio" }])),
            &fields,
        );
        assert_eq!(dropped, 0);
        assert_eq!(gazetteer.entries()[0].name, "NUEVA ERA");
    }

    #[test]
    fn empty_input_is_empty_gazetteer() {
        let (gazetteer, dropped) = parse_entries(&[], &GazetteerFieldMapping::default());
        assert!(gazetteer.is_empty());
        assert_eq!(dropped, 0);
    }

    fn tolu() -> DatasetDefinition {
        dime_source::registry::find_dataset("tolu").unwrap()
    }

    #[tokio::test]
    async fn dataset_without_gazetteer_loads_empty() {
        let mut dataset = tolu();
        dataset.gazetteer = None;
        let client = reqwest::Client::new();

        assert!(matches!(
            fetch(&client, &dataset, None).await,
            Err(NeighborhoodError::NoGazetteer { .. })
        ));
        assert!(load(&client, &dataset, None).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_gazetteer_loads_empty() {
        let mut dataset = tolu();
        if let Some(source) = dataset.gazetteer.as_mut() {
            source.url = "http://127.0.0.1:1/gazetteer.json".to_string();
        }
        let client = reqwest::Client::new();

        assert!(load(&client, &dataset, None).await.is_empty());
    }
}
