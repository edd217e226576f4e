//! Route resolution over an ordered chain of routing providers.
//!
//! Providers are queried one after another, never concurrently: provider
//! N+1 only runs once provider N has failed. The first usable answer wins.
//! When every provider fails the resolver degrades to the straight segment
//! between the endpoints, so [`RouteResolver::resolve`] cannot fail.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ProviderError;
use crate::geo::GeoPoint;
use crate::polyline::{self, Polyline};
use crate::straight_line::{STRAIGHT_LINE, StraightLine};
use crate::traits::{AxisOrder, ProviderRoute, RoutingProvider};

/// Default distance a provider path may start or end away from the request.
pub const DEFAULT_MAX_ENDPOINT_OFFSET_KM: f64 = 5.0;

/// Where a [`RoutePath`] came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "provider", rename_all = "snake_case")]
pub enum RouteSource {
    /// A road path returned by the named provider.
    Provider(String),
    /// Terminal degradation: the direct segment between the endpoints.
    StraightLine,
}

/// An ordered path of at least two points from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePath {
    points: Vec<GeoPoint>,
    source: RouteSource,
}

impl RoutePath {
    pub fn straight_line(from: GeoPoint, to: GeoPoint) -> Self {
        Self {
            points: StraightLine::segment(from, to),
            source: RouteSource::StraightLine,
        }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<GeoPoint> {
        self.points
    }

    pub fn source(&self) -> &RouteSource {
        &self.source
    }

    /// True for the straight-line degradation, which callers style differently.
    pub fn is_fallback(&self) -> bool {
        self.source == RouteSource::StraightLine
    }

    pub fn start(&self) -> GeoPoint {
        self.points[0]
    }

    pub fn end(&self) -> GeoPoint {
        self.points[self.points.len() - 1]
    }

    /// Sum of great-circle distances between consecutive points.
    pub fn distance_km(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance_km(&pair[1]))
            .sum()
    }

    pub fn to_polyline(&self) -> Polyline {
        Polyline::new(
            self.points
                .iter()
                .map(|p| (p.latitude(), p.longitude()))
                .collect(),
        )
    }
}

pub struct RouteResolver {
    providers: Vec<Box<dyn RoutingProvider>>,
    max_endpoint_offset_km: f64,
}

impl std::fmt::Debug for RouteResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteResolver")
            .field("providers", &self.provider_names())
            .field("max_endpoint_offset_km", &self.max_endpoint_offset_km)
            .finish()
    }
}

impl RouteResolver {
    /// Builds a resolver that tries `providers` in the given order.
    pub fn new(providers: Vec<Box<dyn RoutingProvider>>) -> Self {
        Self {
            providers,
            max_endpoint_offset_km: DEFAULT_MAX_ENDPOINT_OFFSET_KM,
        }
    }

    #[must_use]
    pub fn with_max_endpoint_offset_km(mut self, km: f64) -> Self {
        self.max_endpoint_offset_km = km;
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn resolve(&self, from: GeoPoint, to: GeoPoint) -> RoutePath {
        self.resolve_until(from, to, None)
    }

    /// Like [`resolve`](Self::resolve), but once `deadline` has passed the
    /// remaining providers are skipped and the straight line is returned.
    ///
    /// The deadline is checked before each provider starts. A call already
    /// in flight is not interrupted and is bounded only by that provider's
    /// own HTTP timeout, so the worst case is `deadline` plus one provider
    /// timeout. A path it returns late is still used.
    pub fn resolve_within(&self, from: GeoPoint, to: GeoPoint, deadline: Instant) -> RoutePath {
        self.resolve_until(from, to, Some(deadline))
    }

    fn resolve_until(&self, from: GeoPoint, to: GeoPoint, deadline: Option<Instant>) -> RoutePath {
        for provider in &self.providers {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(
                    provider = provider.name(),
                    "routing deadline passed, skipping remaining providers"
                );
                break;
            }

            match self.attempt(provider.as_ref(), from, to) {
                Ok(points) => {
                    debug!(
                        provider = provider.name(),
                        points = points.len(),
                        "route resolved"
                    );
                    let source = if provider.name() == STRAIGHT_LINE {
                        RouteSource::StraightLine
                    } else {
                        RouteSource::Provider(provider.name().to_string())
                    };
                    return RoutePath { points, source };
                }
                Err(err) => {
                    warn!(
                        provider = provider.name(),
                        status = ?err.http_status(),
                        error = %err,
                        "routing provider failed, trying next"
                    );
                }
            }
        }

        info!(%from, %to, "no routing provider succeeded, using straight line");
        RoutePath::straight_line(from, to)
    }

    fn attempt(
        &self,
        provider: &dyn RoutingProvider,
        from: GeoPoint,
        to: GeoPoint,
    ) -> Result<Vec<GeoPoint>, ProviderError> {
        let route = provider.fetch_route(from, to)?;
        let mut points = to_geo_points(provider.name(), route)?;

        let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) else {
            return Err(ProviderError::EmptyRoute {
                provider: provider.name().to_string(),
            });
        };

        let start_offset = first.distance_km(&from);
        let end_offset = last.distance_km(&to);
        if start_offset > self.max_endpoint_offset_km || end_offset > self.max_endpoint_offset_km {
            return Err(ProviderError::Implausible {
                provider: provider.name().to_string(),
                message: format!(
                    "path endpoints are {start_offset:.2} km and {end_offset:.2} km from the request"
                ),
            });
        }

        // Anchor the road path to the exact pins.
        if first != from {
            points.insert(0, from);
        }
        if last != to || points.len() < 2 {
            points.push(to);
        }

        Ok(points)
    }
}

/// Translates a provider's wire geometry into validated (lat, lng) points.
fn to_geo_points(provider: &str, route: ProviderRoute) -> Result<Vec<GeoPoint>, ProviderError> {
    let raw: Vec<(f64, f64)> = match route {
        ProviderRoute::Coordinates { pairs, order } => pairs
            .into_iter()
            .map(|[a, b]| match order {
                AxisOrder::LatLng => (a, b),
                AxisOrder::LngLat => (b, a),
            })
            .collect(),
        ProviderRoute::Encoded {
            polyline: encoded,
            precision,
        } => polyline::decode(&encoded, precision)
            .map_err(|source| ProviderError::Decode {
                provider: provider.to_string(),
                source,
            })?
            .into_points(),
    };

    raw.into_iter()
        .map(|(lat, lng)| {
            GeoPoint::new(lat, lng).map_err(|err| ProviderError::Implausible {
                provider: provider.to_string(),
                message: err.to_string(),
            })
        })
        .collect()
}
