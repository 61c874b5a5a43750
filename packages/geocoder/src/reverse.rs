//! Paced, retrying reverse geocoder.
//!
//! Every backend call goes through one async gate: calls are serialized
//! and spaced at least [`RetryPolicy::min_interval`] apart, measured from
//! the end of the previous call. Successful places are memoized per
//! coordinate, so zone detection after an address lookup at the same
//! coordinate costs no extra request.

use std::collections::HashMap;
use std::time::Duration;

use dime_source_models::Coordinate;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::service_registry::GeocodingService;
use crate::{GeocodeError, ReverseGeocodeBackend, ReverseGeocodedPlace};

/// Retry, backoff and pacing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per address lookup, including the first.
    pub max_attempts: u32,
    /// Base backoff; the wait before attempt `n + 1` is `backoff * n`.
    pub backoff: Duration,
    /// Pause after a response without address content.
    pub empty_pause: Duration,
    /// Minimum spacing between consecutive backend calls.
    pub min_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
            empty_pause: Duration::from_secs(1),
            min_interval: Duration::from_secs(1),
        }
    }
}

impl From<&GeocodingService> for RetryPolicy {
    fn from(service: &GeocodingService) -> Self {
        Self {
            max_attempts: service.retry.max_attempts.max(1),
            backoff: Duration::from_millis(service.retry.backoff_ms),
            empty_pause: Duration::from_millis(service.retry.empty_pause_ms),
            min_interval: Duration::from_millis(service.retry.min_interval_ms),
        }
    }
}

type CoordinateKey = (u64, u64);

fn key(coordinate: Coordinate) -> CoordinateKey {
    (coordinate.lat().to_bits(), coordinate.lng().to_bits())
}

/// Reverse geocoder that never propagates failures from
/// [`ReverseGeocoder::address`].
pub struct ReverseGeocoder<B> {
    backend: B,
    policy: RetryPolicy,
    last_call: Mutex<Option<Instant>>,
    cache: Mutex<HashMap<CoordinateKey, ReverseGeocodedPlace>>,
}

impl<B: ReverseGeocodeBackend> ReverseGeocoder<B> {
    /// Wraps a backend with the given policy.
    #[must_use]
    pub fn new(backend: B, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            last_call: Mutex::new(None),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the wrapped backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the active policy.
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns the formatted address at `coordinate`, or `None`.
    ///
    /// Transient failures are retried up to `max_attempts` times with
    /// growing backoff. Non-retryable failures give up immediately. A
    /// response without address content pauses for `empty_pause` and
    /// returns `None` without retrying.
    pub async fn address(&self, coordinate: Coordinate) -> Option<String> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.call(coordinate).await {
                Ok(place) => {
                    if let Some(line) = place.as_ref().and_then(ReverseGeocodedPlace::address_line)
                    {
                        return Some(line.to_string());
                    }
                    log::debug!("No address content at {coordinate}");
                    tokio::time::sleep(self.policy.empty_pause).await;
                    return None;
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.policy.backoff * attempt;
                    log::warn!(
                        "Reverse geocode {coordinate}: {e} (attempt {attempt}/{max_attempts}, retrying in {delay:?})"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    log::warn!(
                        "Reverse geocode {coordinate}: giving up after {max_attempts} attempts: {e}"
                    );
                    return None;
                }
                Err(e) => {
                    log::warn!("Reverse geocode {coordinate}: non-retryable error: {e}");
                    return None;
                }
            }
        }

        None
    }

    /// Performs a single paced lookup and returns the raw place.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`GeocodeError`] unchanged.
    pub async fn lookup(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<ReverseGeocodedPlace>, GeocodeError> {
        self.call(coordinate).await
    }

    async fn call(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<ReverseGeocodedPlace>, GeocodeError> {
        if let Some(place) = self.cache.lock().await.get(&key(coordinate)) {
            log::trace!("Reverse geocode cache hit for {coordinate}");
            return Ok(Some(place.clone()));
        }

        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.policy.min_interval {
                tokio::time::sleep(self.policy.min_interval - elapsed).await;
            }
        }

        let result = self.backend.reverse(coordinate).await;
        *last_call = Some(Instant::now());
        drop(last_call);

        if let Ok(Some(place)) = &result {
            self.cache
                .lock()
                .await
                .insert(key(coordinate), place.clone());
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    fn instant_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::ZERO,
            empty_pause: Duration::ZERO,
            min_interval: Duration::ZERO,
        }
    }

    fn tolu() -> Coordinate {
        Coordinate::new(9.52, -75.58).unwrap()
    }

    fn place(display_name: &str) -> ReverseGeocodedPlace {
        ReverseGeocodedPlace {
            display_name: Some(display_name.to_string()),
            address: [("suburb".to_string(), "Centro".to_string())]
                .into_iter()
                .collect(),
        }
    }

    #[derive(Clone, Copy)]
    enum Reply {
        Unavailable,
        Malformed,
        Found,
        Nothing,
    }

    /// Replays scripted replies, then repeats the last one.
    struct ScriptedBackend {
        replies: Vec<Reply>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(replies: &[Reply]) -> Self {
            Self {
                replies: replies.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReverseGeocodeBackend for ScriptedBackend {
        async fn reverse(
            &self,
            _coordinate: Coordinate,
        ) -> Result<Option<ReverseGeocodedPlace>, GeocodeError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies[n.min(self.replies.len() - 1)] {
                Reply::Unavailable => Err(GeocodeError::Status { status: 503 }),
                Reply::Malformed => Err(GeocodeError::Parse {
                    message: "not json".to_string(),
                }),
                Reply::Found => Ok(Some(place("Calle 15, Santiago de Tolú"))),
                Reply::Nothing => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn always_failing_backend_is_called_exactly_max_attempts() {
        let geocoder = ReverseGeocoder::new(ScriptedBackend::new(&[Reply::Unavailable]), instant_policy());
        assert_eq!(geocoder.address(tolu()).await, None);
        assert_eq!(geocoder.backend().calls(), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_is_called_once() {
        let geocoder = ReverseGeocoder::new(ScriptedBackend::new(&[Reply::Malformed]), instant_policy());
        assert_eq!(geocoder.address(tolu()).await, None);
        assert_eq!(geocoder.backend().calls(), 1);
    }

    #[tokio::test]
    async fn transient_failure_then_success() {
        let geocoder = ReverseGeocoder::new(
            ScriptedBackend::new(&[Reply::Unavailable, Reply::Found]),
            instant_policy(),
        );
        assert_eq!(
            geocoder.address(tolu()).await.as_deref(),
            Some("Calle 15, Santiago de Tolú")
        );
        assert_eq!(geocoder.backend().calls(), 2);
    }

    #[tokio::test]
    async fn empty_result_is_not_retried() {
        let geocoder = ReverseGeocoder::new(ScriptedBackend::new(&[Reply::Nothing]), instant_policy());
        assert_eq!(geocoder.address(tolu()).await, None);
        assert_eq!(geocoder.backend().calls(), 1);
    }

    #[tokio::test]
    async fn successful_place_is_memoized() {
        let geocoder = ReverseGeocoder::new(ScriptedBackend::new(&[Reply::Found]), instant_policy());
        assert!(geocoder.address(tolu()).await.is_some());
        let place = geocoder.lookup(tolu()).await.unwrap().unwrap();
        assert_eq!(place.address.get("suburb").map(String::as_str), Some("Centro"));
        assert_eq!(geocoder.backend().calls(), 1);
    }

    #[tokio::test]
    async fn lookup_propagates_errors_without_retry() {
        let geocoder = ReverseGeocoder::new(ScriptedBackend::new(&[Reply::Unavailable]), instant_policy());
        assert!(geocoder.lookup(tolu()).await.is_err());
        assert_eq!(geocoder.backend().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_calls_are_spaced() {
        let policy = RetryPolicy {
            min_interval: Duration::from_secs(1),
            ..instant_policy()
        };
        let geocoder = ReverseGeocoder::new(ScriptedBackend::new(&[Reply::Nothing]), policy);
        let start = Instant::now();
        let _ = geocoder.lookup(tolu()).await;
        let _ = geocoder.lookup(tolu()).await;
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(geocoder.backend().calls(), 2);
    }

    #[test]
    fn policy_from_embedded_service() {
        let service = crate::service_registry::find_service("nominatim").unwrap();
        let policy = RetryPolicy::from(&service);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_secs(2));
    }
}
