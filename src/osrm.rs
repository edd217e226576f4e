//! OSRM HTTP adapter for driving routes.

use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderError;
use crate::geo::GeoPoint;
use crate::traits::{AxisOrder, ProviderRoute, RoutingProvider};

const PROVIDER: &str = "osrm";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn route_url(&self, from: GeoPoint, to: GeoPoint) -> String {
        // OSRM wants longitude first.
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=full&geometries=geojson",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            from.longitude(),
            from.latitude(),
            to.longitude(),
            to.latitude(),
        )
    }
}

impl RoutingProvider for OsrmClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn fetch_route(&self, from: GeoPoint, to: GeoPoint) -> Result<ProviderRoute, ProviderError> {
        let response = self
            .client
            .get(self.route_url(from, to))
            .send()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::status(PROVIDER, status.as_u16(), &body));
        }

        let body = response
            .json::<OsrmRouteResponse>()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, err))?;

        let pairs = route_pairs(body)?;
        debug!(points = pairs.len(), "osrm route received");
        Ok(ProviderRoute::Coordinates {
            pairs,
            order: AxisOrder::LngLat,
        })
    }
}

fn route_pairs(body: OsrmRouteResponse) -> Result<Vec<[f64; 2]>, ProviderError> {
    if body.code != "Ok" {
        return match body.code.as_str() {
            "NoRoute" | "NoSegment" => Err(ProviderError::EmptyRoute {
                provider: PROVIDER.to_string(),
            }),
            _ => Err(ProviderError::malformed(
                PROVIDER,
                format!(
                    "code {}: {}",
                    body.code,
                    body.message.unwrap_or_default()
                ),
            )),
        };
    }

    let route = body
        .routes
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::EmptyRoute {
            provider: PROVIDER.to_string(),
        })?;

    if route.geometry.coordinates.is_empty() {
        return Err(ProviderError::EmptyRoute {
            provider: PROVIDER.to_string(),
        });
    }

    Ok(route.geometry.coordinates)
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    routes: Option<Vec<OsrmRoute>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}
