//! Nominatim geocoding with a JSON file cache and a client-side rate limit.
//!
//! Nominatim's usage policy caps anonymous clients at one request per
//! second; the limiter is enforced here so no caller can violate it by
//! accident. Results cache to a sidecar file keyed by the lowercased query.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::listing::Coordinates;

const RATE_LIMIT: Duration = Duration::from_millis(1100);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub canonical_name: String,
}

impl GeoPoint {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

pub struct GeocodingService {
    endpoint: String,
    cache_path: Option<PathBuf>,
    cache: Mutex<FxHashMap<String, GeoPoint>>,
    last_request: Mutex<Option<Instant>>,
    client: reqwest::Client,
}

impl GeocodingService {
    pub fn new(cache_path: Option<PathBuf>) -> Self {
        Self::with_endpoint("https://nominatim.openstreetmap.org/search", cache_path)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, cache_path: Option<PathBuf>) -> Self {
        let cache = cache_path
            .as_ref()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|raw| serde_json::from_str::<FxHashMap<String, GeoPoint>>(&raw).ok())
            .unwrap_or_default();

        GeocodingService {
            endpoint: endpoint.into(),
            cache_path,
            cache: Mutex::new(cache),
            last_request: Mutex::new(None),
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .gzip(true)
                .user_agent("lexcanon/0.1 (concept canonicalization engine)")
                .build()
                .expect("failed to build geocoding HTTP client"),
        }
    }

    /// Resolve a location name to coordinates. Cache first, then Nominatim;
    /// any failure is a `None`, never an error.
    pub async fn geocode(&self, location_name: &str) -> Option<GeoPoint> {
        let key = location_name.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        if let Some(point) = self.cache.lock().expect("geocode cache poisoned").get(&key) {
            return Some(point.clone());
        }

        self.respect_rate_limit().await;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", key.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .await;
        let body: Value = match response {
            Ok(r) if r.status().is_success() => r.json().await.ok()?,
            Ok(r) => {
                tracing::debug!(status = %r.status(), location_name, "geocoding rejected");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, location_name, "geocoding unreachable");
                return None;
            }
        };

        let hit = body.as_array()?.first()?;
        let point = GeoPoint {
            lat: hit["lat"].as_str()?.parse().ok()?,
            lng: hit["lon"].as_str()?.parse().ok()?,
            canonical_name: hit["display_name"]
                .as_str()
                .map(|name| name.split(',').next().unwrap_or(name).trim().to_string())
                .unwrap_or_else(|| key.clone()),
        };

        self.cache
            .lock()
            .expect("geocode cache poisoned")
            .insert(key, point.clone());
        self.save_cache();
        Some(point)
    }

    async fn respect_rate_limit(&self) {
        let wait = {
            let mut last = self.last_request.lock().expect("rate limit poisoned");
            let now = Instant::now();
            let wait = match *last {
                Some(previous) if now.duration_since(previous) < RATE_LIMIT => {
                    RATE_LIMIT - now.duration_since(previous)
                }
                _ => Duration::ZERO,
            };
            *last = Some(now + wait);
            wait
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    fn save_cache(&self) {
        let Some(path) = &self.cache_path else {
            return;
        };
        let snapshot = self.cache.lock().expect("geocode cache poisoned").clone();
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    tracing::warn!(error = %e, "could not save geocoding cache");
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not serialize geocoding cache"),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().expect("geocode cache poisoned").len()
    }
}

/// Great-circle distance in kilometers.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn haversine_known_distance() {
        // Bengaluru to Mumbai, roughly 840 km.
        let bengaluru = Coordinates {
            lat: 12.9716,
            lng: 77.5946,
        };
        let mumbai = Coordinates {
            lat: 19.0760,
            lng: 72.8777,
        };
        let distance = haversine_km(bengaluru, mumbai);
        assert!((700.0..1000.0).contains(&distance), "got {distance}");
        assert!(haversine_km(bengaluru, bengaluru) < 1e-6);
    }

    #[tokio::test]
    async fn cache_file_is_consulted_before_the_network() {
        let dir = TempDir::new().expect("tempdir");
        let cache_path = dir.path().join("geocoding_cache.json");
        std::fs::write(
            &cache_path,
            r#"{"bengaluru": {"lat": 12.9716, "lng": 77.5946, "canonical_name": "Bengaluru"}}"#,
        )
        .expect("seed cache");

        // Unroutable endpoint: a network attempt would fail, so a result
        // proves the cache answered.
        let service =
            GeocodingService::with_endpoint("http://127.0.0.1:9/search", Some(cache_path));
        let point = service.geocode("Bengaluru").await.expect("cached hit");
        assert_eq!(point.canonical_name, "Bengaluru");
        assert!((point.lat - 12.9716).abs() < 1e-9);

        // Unknown location degrades to None.
        assert!(service.geocode("nowhere-at-all").await.is_none());
    }

    #[tokio::test]
    async fn empty_names_short_circuit() {
        let service = GeocodingService::with_endpoint("http://127.0.0.1:9/search", None);
        assert!(service.geocode("  ").await.is_none());
        assert_eq!(service.cached_len(), 0);
    }
}
