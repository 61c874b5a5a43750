//! The served catalog: map places plus the assistant's text corpus.
//!
//! A [`Catalog`] is built once per load and never mutated. Reloads build a
//! new one and swap it in (see [`crate::AppState`]).

use std::path::PathBuf;

use dime_ingest::snapshot;
use dime_ingest_models::Snapshot;
use dime_neighborhood_models::ZoneKind;
use dime_normalize::Normalizer;
use dime_server_models::{ApiLocation, ApiPlace};
use dime_source::coordinates::extract_coordinate;
use dime_source::socrata;
use dime_source_models::{DatasetDefinition, RawRecord};

/// Characters of corpus handed to the model.
pub const CONTEXT_CHAR_LIMIT: usize = 25_000;

/// Where a catalog's records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrigin {
    /// The enriched snapshot on disk.
    Snapshot,
    /// A live, unenriched portal fetch.
    Live,
    /// Nothing could be loaded.
    Empty,
}

/// An immutable view of the facility data.
#[derive(Debug, Clone)]
pub struct Catalog {
    origin: CatalogOrigin,
    records: usize,
    places: Vec<ApiPlace>,
    corpus: String,
}

/// One record as the catalog sees it.
struct Entry<'a> {
    raw: &'a RawRecord,
    address: Option<&'a str>,
    zone: Option<(&'a str, ZoneKind)>,
}

impl Catalog {
    /// Builds the catalog from an enriched snapshot.
    #[must_use]
    pub fn from_snapshot(
        snapshot: &Snapshot,
        dataset: &DatasetDefinition,
        normalizer: &Normalizer,
    ) -> Self {
        let entries = snapshot.records.iter().map(|record| Entry {
            raw: &record.raw,
            address: record.address(),
            zone: record
                .has_zone()
                .then(|| (record.detected_zone_name.as_str(), record.detected_zone_kind)),
        });
        Self::build(CatalogOrigin::Snapshot, entries, dataset, normalizer)
    }

    /// Builds the catalog from raw portal records, without addresses or
    /// detected zones.
    #[must_use]
    pub fn from_live(
        records: &[RawRecord],
        dataset: &DatasetDefinition,
        normalizer: &Normalizer,
    ) -> Self {
        let entries = records.iter().map(|raw| Entry {
            raw,
            address: None,
            zone: None,
        });
        Self::build(CatalogOrigin::Live, entries, dataset, normalizer)
    }

    /// A catalog with no records.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            origin: CatalogOrigin::Empty,
            records: 0,
            places: Vec::new(),
            corpus: String::new(),
        }
    }

    fn build<'a>(
        origin: CatalogOrigin,
        entries: impl Iterator<Item = Entry<'a>>,
        dataset: &DatasetDefinition,
        normalizer: &Normalizer,
    ) -> Self {
        let fields = &dataset.places.fields;
        let mut corpus = format!(
            "LISTADO DE ENTIDADES OFICIALES DE {}:\n\n",
            dataset.municipality.to_uppercase()
        );
        let mut places = Vec::new();
        let mut records = 0;

        for (i, entry) in entries.enumerate() {
            records += 1;
            let name = text_field(entry.raw, &fields.name).map(|n| normalizer.normalize(n));
            let category =
                text_field(entry.raw, &fields.category).map(|c| normalizer.normalize(c));
            let zone_label = text_field(entry.raw, &fields.zone);

            corpus.push_str(&corpus_line(&entry, name.as_deref(), category.as_deref(), || {
                zone_label.map_or_else(
                    || "No registrada".to_string(),
                    |z| normalizer.normalize(z),
                )
            }));

            let Some(coordinate) = extract_coordinate(entry.raw, fields) else {
                continue;
            };
            places.push(ApiPlace {
                id: i + 1,
                nombre: name.unwrap_or_else(|| "Sin nombre".to_string()),
                categoria: category.unwrap_or_else(|| "Otros".to_string()),
                direccion: entry
                    .address
                    .map_or_else(|| normalizer.format_zone(zone_label), str::to_string),
                ubicacion: ApiLocation {
                    lat: coordinate.lat(),
                    lng: coordinate.lng(),
                },
            });
        }

        log::info!(
            "Catalog built from {origin:?}: {records} records, {} mappable places",
            places.len()
        );

        Self {
            origin,
            records,
            places,
            corpus,
        }
    }

    /// Where the records came from.
    #[must_use]
    pub const fn origin(&self) -> CatalogOrigin {
        self.origin
    }

    /// Number of records in the corpus.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records
    }

    /// Whether the catalog holds no records.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Places with a valid coordinate, in source order.
    #[must_use]
    pub fn places(&self) -> &[ApiPlace] {
        &self.places
    }

    /// The full text corpus.
    #[must_use]
    pub fn corpus(&self) -> &str {
        &self.corpus
    }

    /// The corpus cut to [`CONTEXT_CHAR_LIMIT`] characters.
    #[must_use]
    pub fn prompt_context(&self) -> &str {
        truncate_chars(&self.corpus, CONTEXT_CHAR_LIMIT)
    }
}

/// Loads catalogs for one dataset: the snapshot first, then a live fetch.
pub struct CatalogLoader {
    dataset: DatasetDefinition,
    snapshot_path: PathBuf,
    app_token: Option<String>,
    normalizer: Normalizer,
    client: reqwest::Client,
}

impl CatalogLoader {
    /// Creates a loader.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the HTTP client cannot be built.
    pub fn new(
        dataset: DatasetDefinition,
        snapshot_path: PathBuf,
        app_token: Option<String>,
        normalizer: Normalizer,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self {
            dataset,
            snapshot_path,
            app_token,
            normalizer,
            client,
        })
    }

    /// The dataset being served.
    #[must_use]
    pub const fn dataset(&self) -> &DatasetDefinition {
        &self.dataset
    }

    /// Builds a catalog from the snapshot, falling back to a live fetch,
    /// then to an empty catalog. Never fails.
    pub async fn load(&self) -> Catalog {
        match snapshot::load(&self.snapshot_path) {
            Ok(Some(snapshot)) => {
                log::info!(
                    "Loaded {} enriched records from {}",
                    snapshot.len(),
                    self.snapshot_path.display()
                );
                return Catalog::from_snapshot(&snapshot, &self.dataset, &self.normalizer);
            }
            Ok(None) => log::warn!(
                "No snapshot at {}, falling back to a live fetch",
                self.snapshot_path.display()
            ),
            Err(e) => log::error!(
                "Snapshot at {} is unreadable ({e}), falling back to a live fetch",
                self.snapshot_path.display()
            ),
        }

        match socrata::fetch_places(&self.client, &self.dataset, self.app_token.as_deref(), None)
            .await
        {
            Ok(records) => Catalog::from_live(&records, &self.dataset, &self.normalizer),
            Err(e) => {
                log::error!("Live fetch failed, serving an empty catalog: {e}");
                Catalog::empty()
            }
        }
    }
}

/// One corpus line: `- <Name> (<Category>). Dirección: <address>.` or
/// `Zona: <zona>.`, then ` <Kind>: <Zone>.` for a detected zone.
fn corpus_line(
    entry: &Entry<'_>,
    name: Option<&str>,
    category: Option<&str>,
    zone_label: impl FnOnce() -> String,
) -> String {
    let location = entry.address.map_or_else(
        || format!("Zona: {}", zone_label()),
        |address| format!("Dirección: {address}"),
    );
    let zone = entry
        .zone
        .map(|(zone, kind)| format!(" {kind}: {zone}."))
        .unwrap_or_default();
    format!(
        "- {} ({}). {location}.{zone}\n",
        name.unwrap_or("Entidad"),
        category.unwrap_or("General")
    )
}

fn text_field<'a>(record: &'a RawRecord, field: &str) -> Option<&'a str> {
    record
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(end, _)| &text[..end])
}
