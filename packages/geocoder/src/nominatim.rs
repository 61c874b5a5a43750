//! Nominatim / OpenStreetMap reverse geocoder client.
//!
//! The public instance has strict usage rules: **1 request per second**
//! maximum and an identifying `User-Agent`. Pacing is enforced by
//! [`crate::ReverseGeocoder`], not here.
//!
//! See <https://nominatim.org/release-docs/develop/api/Reverse/>

use std::collections::BTreeMap;

use async_trait::async_trait;
use dime_source_models::Coordinate;

use crate::service_registry::{self, GeocodingService};
use crate::{GeocodeError, ReverseGeocodeBackend, ReverseGeocodedPlace};

/// Environment variable overriding the reverse endpoint URL.
pub const URL_ENV_VAR: &str = "NOMINATIM_URL";

/// Environment variable overriding the `User-Agent`.
pub const USER_AGENT_ENV_VAR: &str = "NOMINATIM_USER_AGENT";

/// Reverse-geocoding backend for a Nominatim instance.
#[derive(Debug, Clone)]
pub struct NominatimBackend {
    client: reqwest::Client,
    base_url: String,
    language: String,
}

impl NominatimBackend {
    /// Builds a client for the given service configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(service: &GeocodingService) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(service.user_agent.clone())
            .timeout(service.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: service.base_url.clone(),
            language: service.language.clone(),
        })
    }

    /// Returns the embedded `nominatim` service configuration with
    /// `NOMINATIM_URL` / `NOMINATIM_USER_AGENT` overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Parse`] if the service is missing or
    /// disabled in the embedded registry.
    pub fn service_from_env() -> Result<GeocodingService, GeocodeError> {
        let mut service =
            service_registry::find_service("nominatim").ok_or_else(|| GeocodeError::Parse {
                message: "nominatim service is not configured".to_string(),
            })?;

        if let Ok(url) = std::env::var(URL_ENV_VAR)
            && !url.trim().is_empty()
        {
            service.base_url = url.trim().to_string();
        }
        if let Ok(agent) = std::env::var(USER_AGENT_ENV_VAR)
            && !agent.trim().is_empty()
        {
            service.user_agent = agent.trim().to_string();
        }

        Ok(service)
    }
}

#[async_trait]
impl ReverseGeocodeBackend for NominatimBackend {
    async fn reverse(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<ReverseGeocodedPlace>, GeocodeError> {
        let lat = coordinate.lat().to_string();
        let lon = coordinate.lng().to_string();

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "jsonv2"),
                ("addressdetails", "1"),
                ("accept-language", self.language.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if !status.is_success() {
            return Err(GeocodeError::Status {
                status: status.as_u16(),
            });
        }

        let text = resp.text().await?;
        let body: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| GeocodeError::Parse {
                message: format!("Nominatim response is not JSON: {e}"),
            })?;
        parse_reverse_response(&body)
    }
}

/// Parses a Nominatim `/reverse` JSON response.
///
/// Nominatim answers `{"error": "Unable to geocode"}` for coordinates with
/// nothing nearby; that is a successful empty result, not an error.
fn parse_reverse_response(
    body: &serde_json::Value,
) -> Result<Option<ReverseGeocodedPlace>, GeocodeError> {
    let obj = body.as_object().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an object".to_string(),
    })?;

    if obj.contains_key("error") {
        return Ok(None);
    }

    let display_name = obj
        .get("display_name")
        .and_then(serde_json::Value::as_str)
        .map(String::from);

    let address: BTreeMap<String, String> = obj
        .get("address")
        .and_then(serde_json::Value::as_object)
        .map(|components| {
            components
                .iter()
                .filter_map(|(k, v)| match v {
                    serde_json::Value::String(s) => Some((k.clone(), s.clone())),
                    serde_json::Value::Number(n) => Some((k.clone(), n.to_string())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if display_name.is_none() && address.is_empty() {
        return Ok(None);
    }

    Ok(Some(ReverseGeocodedPlace {
        display_name,
        address,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reverse_result() {
        let body = serde_json::json!({
            "place_id": 1234,
            "lat": "9.52",
            "lon": "-75.58",
            "display_name": "Calle 15, Centro, Santiago de Tolú, Sucre, Colombia",
            "address": {
                "road": "Calle 15",
                "suburb": "Centro",
                "town": "Santiago de Tolú",
                "postcode": 705010
            }
        });
        let place = parse_reverse_response(&body).unwrap().unwrap();
        assert_eq!(
            place.address_line(),
            Some("Calle 15, Centro, Santiago de Tolú, Sucre, Colombia")
        );
        assert_eq!(place.address.get("suburb").map(String::as_str), Some("Centro"));
        assert_eq!(place.address.get("postcode").map(String::as_str), Some("705010"));
    }

    #[test]
    fn unable_to_geocode_is_empty() {
        let body = serde_json::json!({ "error": "Unable to geocode" });
        assert!(parse_reverse_response(&body).unwrap().is_none());
    }

    #[test]
    fn non_object_is_parse_error() {
        let body = serde_json::json!([]);
        assert!(matches!(
            parse_reverse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }

    #[test]
    fn builds_from_embedded_service() {
        let service = service_registry::find_service("nominatim").unwrap();
        let backend = NominatimBackend::new(&service).unwrap();
        assert_eq!(backend.language, "es");
        assert!(backend.base_url.ends_with("/reverse"));
    }
}
