//! Capabilities of the external providers the router talks to.
//!
//! These are intentionally minimal. Each HTTP adapter in this crate
//! implements one of them, and tests substitute in-memory fakes.

use crate::error::ProviderError;
use crate::geo::GeoPoint;

/// Axis order of an inline coordinate pair on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// `[latitude, longitude]`
    LatLng,
    /// `[longitude, latitude]` (GeoJSON)
    LngLat,
}

/// Route geometry exactly as a provider returned it.
///
/// The resolver owns the translation into (latitude, longitude) points.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderRoute {
    /// Inline coordinate pairs in the provider's axis order.
    Coordinates {
        pairs: Vec<[f64; 2]>,
        order: AxisOrder,
    },
    /// An encoded polyline requiring the polyline codec.
    Encoded { polyline: String, precision: u32 },
}

/// A path-finding service queried for a driving route between two points.
pub trait RoutingProvider: Send + Sync {
    /// Short provider name used in logs and [`crate::resolver::RouteSource`].
    fn name(&self) -> &str;

    /// Issues one request. Implementations never retry.
    fn fetch_route(&self, from: GeoPoint, to: GeoPoint) -> Result<ProviderRoute, ProviderError>;
}

/// Converts a coordinate pair into a raw, verbose display address.
pub trait ReverseGeocoder: Send + Sync {
    fn reverse_geocode(&self, point: GeoPoint) -> Result<String, ProviderError>;
}

/// A generative text service that can be asked for strict JSON output.
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Sends `system` as the instruction and `user` as the message, requesting
    /// a JSON document. Returns the raw text of the model's answer.
    fn generate_json(&self, system: &str, user: &str) -> Result<String, ProviderError>;
}
