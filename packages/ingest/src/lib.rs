#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Enrichment pipeline for municipal facility records.
//!
//! One run fetches the gazetteer, fetches the facility records, then walks
//! the records one at a time: extract a coordinate, reverse-geocode it,
//! detect its zone. The enriched records are written once at the end as a
//! [`Snapshot`] (see [`snapshot`]).

pub mod snapshot;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dime_geocoder::{
    GeocodeError, NominatimBackend, RetryPolicy, ReverseGeocodeBackend, ReverseGeocoder,
};
use dime_ingest_models::{EnrichedRecord, RunSummary, Snapshot};
use dime_neighborhood::{Gazetteer, detect_zone, gazetteer};
use dime_source::SourceError;
use dime_source::coordinates::extract_coordinate;
use dime_source::progress::ProgressCallback;
use dime_source::registry;
use dime_source::socrata;
use dime_source_models::{DatasetDefinition, PlaceFieldMapping, RawRecord};
use thiserror::Error;

/// Environment variable selecting the dataset id.
pub const DATASET_ENV_VAR: &str = "DIME_DATASET";

/// Environment variable holding the SODA application token.
pub const APP_TOKEN_ENV_VAR: &str = "SODA_APP_TOKEN";

/// Environment variable overriding the snapshot location.
pub const SNAPSHOT_PATH_ENV_VAR: &str = "DIME_SNAPSHOT_PATH";

/// Snapshot location when nothing else is configured.
pub const DEFAULT_SNAPSHOT_PATH: &str = "data/base_datos_enriquecida.json";

/// Pause after every per-record geocode attempt.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

/// Errors that abort an enrichment run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Fetching the facility records failed.
    #[error("Dataset fetch failed: {0}")]
    Source(#[from] SourceError),

    /// Geocoder setup failed.
    #[error("Geocoder setup failed: {0}")]
    Geocode(#[from] GeocodeError),

    /// HTTP client setup failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Snapshot I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No embedded dataset has the requested id.
    #[error("Unknown dataset {id:?} (available: {available})")]
    UnknownDataset {
        /// Requested id.
        id: String,
        /// Comma-separated ids of the embedded datasets.
        available: String,
    },
}

/// Everything a run needs besides the network.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Dataset to enrich.
    pub dataset: DatasetDefinition,
    /// SODA application token, if configured.
    pub app_token: Option<String>,
    /// Where the snapshot is written.
    pub output: PathBuf,
    /// Overrides the dataset's record limit.
    pub limit: Option<u32>,
    /// Pause after every per-record geocode attempt.
    pub pacing: Duration,
}

/// Returns all embedded dataset definitions.
#[must_use]
pub fn all_datasets() -> Vec<DatasetDefinition> {
    registry::all_datasets()
}

/// Resolves the dataset selected by the `--dataset` flag, falling back to
/// `DIME_DATASET` and then to the default dataset.
///
/// # Errors
///
/// Returns [`IngestError::UnknownDataset`] if no embedded dataset has the
/// selected id.
pub fn resolve_dataset(cli_choice: Option<String>) -> Result<DatasetDefinition, IngestError> {
    let id = cli_choice
        .or_else(|| non_empty_env(DATASET_ENV_VAR))
        .unwrap_or_else(|| registry::DEFAULT_DATASET_ID.to_string());

    registry::find_dataset(&id).ok_or_else(|| IngestError::UnknownDataset {
        available: all_datasets()
            .iter()
            .map(|d| d.id().to_string())
            .collect::<Vec<_>>()
            .join(", "),
        id,
    })
}

/// Resolves the snapshot path from the `--output` flag, falling back to
/// `DIME_SNAPSHOT_PATH` and then to [`DEFAULT_SNAPSHOT_PATH`].
#[must_use]
pub fn snapshot_path(cli_choice: Option<PathBuf>) -> PathBuf {
    cli_choice
        .or_else(|| non_empty_env(SNAPSHOT_PATH_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH))
}

/// Reads the SODA application token from `SODA_APP_TOKEN`.
#[must_use]
pub fn app_token_from_env() -> Option<String> {
    non_empty_env(APP_TOKEN_ENV_VAR)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Runs a full enrichment against the live portal and the configured
/// Nominatim instance, then writes the snapshot.
///
/// A gazetteer failure degrades to an empty gazetteer. A facility fetch
/// failure aborts before anything is written, so a previous snapshot
/// stays in place.
///
/// # Errors
///
/// Returns [`IngestError`] if the facility fetch, geocoder setup or
/// snapshot write fails.
pub async fn run(
    options: &IngestOptions,
    progress: Arc<dyn ProgressCallback>,
) -> Result<RunSummary, IngestError> {
    let start = Instant::now();
    let dataset = &options.dataset;
    log::info!("Enriching dataset: {} ({})", dataset.name(), dataset.id());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;
    let app_token = options.app_token.as_deref();
    if app_token.is_none() {
        log::warn!("{APP_TOKEN_ENV_VAR} is not set; portal requests may be throttled");
    }

    let gazetteer = gazetteer::load(&client, dataset, app_token).await;
    let records = socrata::fetch_places(&client, dataset, app_token, options.limit).await?;

    let service = NominatimBackend::service_from_env()?;
    let geocoder = ReverseGeocoder::new(
        NominatimBackend::new(&service)?,
        RetryPolicy::from(&service),
    );

    let (snapshot, mut summary) = enrich_records(
        records,
        &dataset.places.fields,
        &gazetteer,
        &geocoder,
        options.pacing,
        progress.as_ref(),
    )
    .await;

    snapshot::store(&options.output, &snapshot)?;
    summary.elapsed = start.elapsed();

    log::info!(
        "Wrote {} records to {} in {:.1}s",
        summary.total,
        options.output.display(),
        summary.elapsed.as_secs_f64()
    );
    log_summary(&summary);

    Ok(summary)
}

/// Enriches records sequentially, in input order.
///
/// Records without a usable coordinate are kept with no address and the
/// general zone. Every located record costs one address lookup (with
/// retries) and at most one zone lookup, followed by a `pacing` sleep.
/// Never fails: every per-record problem degrades to a sentinel.
pub async fn enrich_records<B: ReverseGeocodeBackend>(
    records: Vec<RawRecord>,
    fields: &PlaceFieldMapping,
    gazetteer: &Gazetteer,
    geocoder: &ReverseGeocoder<B>,
    pacing: Duration,
    progress: &dyn ProgressCallback,
) -> (Snapshot, RunSummary) {
    let start = Instant::now();
    let total = records.len();
    let mut summary = RunSummary {
        total,
        gazetteer_entries: gazetteer.len(),
        ..RunSummary::default()
    };
    let mut snapshot = Snapshot {
        records: Vec::with_capacity(total),
    };

    progress.set_total(total as u64);

    for (i, raw) in records.into_iter().enumerate() {
        let position = i + 1;
        let name = text_field(&raw, &fields.name).unwrap_or("Sin nombre");

        let Some(coordinate) = extract_coordinate(&raw, fields) else {
            log::warn!("[{position}/{total}] {name}: no usable coordinate, kept without address");
            summary.unlocatable += 1;
            progress.set_message(format!("{} | sin coordenadas", truncate(name, 30)));
            snapshot.records.push(EnrichedRecord::unlocatable(raw));
            progress.inc(1);
            continue;
        };

        let address = geocoder.address(coordinate).await;
        if address.is_none() {
            log::warn!("[{position}/{total}] {name}: no address at {coordinate}");
        }

        let zone_text = address
            .as_deref()
            .or_else(|| text_field(&raw, &fields.zone));
        let zone = detect_zone(coordinate, zone_text, gazetteer, geocoder).await;

        log::info!(
            "[{position}/{total}] {} -> {} | {}: {}",
            truncate(name, 30),
            address
                .as_deref()
                .map_or_else(|| "(sin dirección)".to_string(), |a| truncate(a, 50)),
            zone.kind(),
            zone.name()
        );

        progress.set_message(format!(
            "{} | {}: {}",
            truncate(name, 30),
            zone.kind(),
            zone.name()
        ));
        snapshot
            .records
            .push(EnrichedRecord::new(raw, address, &zone));
        progress.inc(1);

        tokio::time::sleep(pacing).await;
    }

    summary.addresses_found = snapshot
        .records
        .iter()
        .filter(|r| r.address().is_some())
        .count();
    summary.addresses_missing = total - summary.addresses_found;
    summary.zones_detected = snapshot.records.iter().filter(|r| r.has_zone()).count();
    summary.elapsed = start.elapsed();

    progress.finish(format!(
        "{total} records, {} addresses, {} zones",
        summary.addresses_found, summary.zones_detected
    ));

    (snapshot, summary)
}

/// Logs the end-of-run counters.
pub fn log_summary(summary: &RunSummary) {
    log::info!("Total records:      {}", summary.total);
    log::info!("Addresses found:    {}", summary.addresses_found);
    log::info!("Addresses missing:  {}", summary.addresses_missing);
    log::info!("Without coordinate: {}", summary.unlocatable);
    log::info!(
        "Zones detected:     {} (gazetteer: {} entries)",
        summary.zones_detected,
        summary.gazetteer_entries
    );
}

fn text_field<'a>(record: &'a RawRecord, field: &str) -> Option<&'a str> {
    record
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
