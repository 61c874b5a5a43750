//! Socrata SODA resource fetcher.
//!
//! Issues a single bounded `GET` against a SODA `resource/<id>.json`
//! endpoint using the `$limit` and `$where` query parameters and the
//! optional `X-App-Token` application token header.

use dime_source_models::{DatasetDefinition, PlaceFieldMapping, RawRecord};

use crate::{SourceError, retry};

/// Header carrying the SODA application token.
pub const APP_TOKEN_HEADER: &str = "X-App-Token";

/// A single SODA query.
pub struct SocrataQuery<'a> {
    /// Resource URL (e.g., `"https://www.datos.gov.co/resource/gi7q-5bgv.json"`).
    pub url: &'a str,
    /// SODA application token, if configured.
    pub app_token: Option<&'a str>,
    /// `$limit` value.
    pub limit: u32,
    /// Optional `$where` expression.
    pub filter: Option<String>,
    /// Label for log messages (e.g., `"facilities"`).
    pub label: &'a str,
}

/// Fetches a SODA resource and returns its records.
///
/// Array elements that are not JSON objects are skipped with a warning.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after retries, the portal
/// returns an error status, or the body is not a JSON array.
pub async fn fetch_records(
    client: &reqwest::Client,
    query: &SocrataQuery<'_>,
) -> Result<Vec<RawRecord>, SourceError> {
    let mut params: Vec<(&str, String)> = vec![("$limit", query.limit.to_string())];
    if let Some(filter) = &query.filter {
        params.push(("$where", filter.clone()));
    }

    log::info!(
        "Fetching {} from {} (limit={})",
        query.label,
        query.url,
        query.limit
    );

    let body = retry::send_json(|| {
        let mut req = client
            .get(query.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&params);
        if let Some(token) = query.app_token {
            req = req.header(APP_TOKEN_HEADER, token);
        }
        req
    })
    .await?;

    let serde_json::Value::Array(items) = body else {
        return Err(SourceError::UnexpectedResponse {
            message: format!("{} response is not a JSON array", query.label),
        });
    };

    let total = items.len();
    let records: Vec<RawRecord> = items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();

    if records.len() < total {
        log::warn!(
            "{}: skipped {} non-object elements",
            query.label,
            total - records.len()
        );
    }
    log::info!("Downloaded {} {} records", records.len(), query.label);

    Ok(records)
}

/// Fetches the facility records of a dataset, restricted to records that
/// carry at least one coordinate representation.
///
/// # Errors
///
/// Returns [`SourceError`] if the fetch fails (see [`fetch_records`]).
pub async fn fetch_places(
    client: &reqwest::Client,
    dataset: &DatasetDefinition,
    app_token: Option<&str>,
    limit: Option<u32>,
) -> Result<Vec<RawRecord>, SourceError> {
    let query = SocrataQuery {
        url: &dataset.places.url,
        app_token,
        limit: limit.unwrap_or(dataset.places.limit),
        filter: Some(coordinate_filter(&dataset.places.fields)),
        label: "facilities",
    };
    fetch_records(client, &query).await
}

/// Builds the SoQL `$where` expression requiring at least one coordinate
/// representation to be non-null.
#[must_use]
pub fn coordinate_filter(fields: &PlaceFieldMapping) -> String {
    format!(
        "{} IS NOT NULL OR {} IS NOT NULL OR ({} IS NOT NULL AND {} IS NOT NULL)",
        fields.combined, fields.geo_point, fields.latitude, fields.longitude
    )
}
