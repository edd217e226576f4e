//! Reverse geocoding with a TTL cache in front of it.
//!
//! [`AddressLookup`] is the caller-facing entry point: it answers from the
//! [`GeocodeCache`] when it can, otherwise asks the [`ReverseGeocoder`],
//! shortens the answer with the [`AddressFormatter`] and caches the short
//! form. One cache instance is meant to be shared process-wide.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use crate::address::AddressFormatter;
use crate::error::ProviderError;
use crate::geo::GeoPoint;
use crate::traits::ReverseGeocoder;

const PROVIDER: &str = "nominatim";

#[derive(Debug, Clone)]
struct CacheEntry {
    address: String,
    /// `None` when the TTL was too large to represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Address memo keyed by coordinates rounded to 6 decimal digits.
///
/// Expired entries are never returned. They are dropped on the lookup that
/// finds them, or in bulk by [`sweep`](Self::sweep).
#[derive(Debug, Default)]
pub struct GeocodeCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, point: GeoPoint) -> Option<String> {
        let key = point.rounded_key();
        let mut entries = self.entries.lock();
        match entries.get(&key) {
            Some(entry) if entry.is_live(Instant::now()) => Some(entry.address.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Inserts or overwrites the entry for `point`.
    pub fn store(&self, point: GeoPoint, address: impl Into<String>, ttl: Duration) {
        let entry = CacheEntry {
            address: address.into(),
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.lock().insert(point.rounded_key(), entry);
    }

    /// Evicts every expired entry and returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocodeCacheConfig {
    pub ttl_secs: u64,
}

impl Default for GeocodeCacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NominatimConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            timeout_secs: 5,
            user_agent: concat!("jeepney-router/", env!("CARGO_PKG_VERSION")).to_string(),
            accept_language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    config: NominatimConfig,
    client: reqwest::blocking::Client,
}

impl NominatimGeocoder {
    pub fn new(config: NominatimConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }
}

impl ReverseGeocoder for NominatimGeocoder {
    fn reverse_geocode(&self, point: GeoPoint) -> Result<String, ProviderError> {
        let url = format!("{}/reverse", self.config.base_url.trim_end_matches('/'));
        let params = [
            ("lat", point.latitude().to_string()),
            ("lon", point.longitude().to_string()),
            ("format", "jsonv2".to_string()),
            ("accept-language", self.config.accept_language.clone()),
        ];

        debug!(%point, "reverse geocoding");

        let response = self
            .client
            .get(url)
            .query(&params)
            .send()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::status(PROVIDER, status.as_u16(), &body));
        }

        let body = response
            .json::<NominatimReverse>()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, err))?;

        display_name(body, point)
    }
}

fn display_name(body: NominatimReverse, point: GeoPoint) -> Result<String, ProviderError> {
    match body.display_name {
        Some(name) if !name.trim().is_empty() => Ok(name),
        _ => Err(ProviderError::NotFound {
            provider: PROVIDER.to_string(),
            query: body.error.unwrap_or_else(|| point.to_string()),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    display_name: Option<String>,
    error: Option<String>,
}

/// Cache-first address resolution.
pub struct AddressLookup {
    geocoder: Arc<dyn ReverseGeocoder>,
    cache: Arc<GeocodeCache>,
    formatter: AddressFormatter,
    ttl: Duration,
}

impl std::fmt::Debug for AddressLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressLookup")
            .field("cache_entries", &self.cache.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl AddressLookup {
    pub fn new(geocoder: Arc<dyn ReverseGeocoder>, cache: Arc<GeocodeCache>, ttl: Duration) -> Self {
        Self {
            geocoder,
            cache,
            formatter: AddressFormatter::default(),
            ttl,
        }
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: AddressFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    /// Short display address for `point`, or `None` if the provider's
    /// answer was blank.
    pub fn lookup_address(&self, point: GeoPoint) -> Result<Option<String>, ProviderError> {
        if let Some(hit) = self.cache.lookup(point) {
            debug!(%point, "geocode cache hit");
            return Ok(Some(hit));
        }

        let raw = self.geocoder.reverse_geocode(point)?;
        let Some(address) = self.formatter.format(&raw) else {
            return Ok(None);
        };

        self.cache.store(point, address.clone(), self.ttl);
        Ok(Some(address))
    }
}
