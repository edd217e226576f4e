//! Straight-line route provider (fallback when every routing service fails).
//!
//! Connects the two endpoints directly. Ignores roads entirely but is
//! always available, which makes it the last link of every resolver chain.

use crate::error::ProviderError;
use crate::geo::GeoPoint;
use crate::traits::{AxisOrder, ProviderRoute, RoutingProvider};

pub const STRAIGHT_LINE: &str = "straight-line";

/// Provider that answers with the two-point segment `[from, to]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLine;

impl StraightLine {
    /// Infallible form used by the resolver as its terminal degradation.
    pub fn segment(from: GeoPoint, to: GeoPoint) -> Vec<GeoPoint> {
        vec![from, to]
    }
}

impl RoutingProvider for StraightLine {
    fn name(&self) -> &str {
        STRAIGHT_LINE
    }

    fn fetch_route(&self, from: GeoPoint, to: GeoPoint) -> Result<ProviderRoute, ProviderError> {
        Ok(ProviderRoute::Coordinates {
            pairs: Self::segment(from, to)
                .into_iter()
                .map(|p| [p.latitude(), p.longitude()])
                .collect(),
            order: AxisOrder::LatLng,
        })
    }
}
