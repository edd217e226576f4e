//! OpenRouteService directions adapter.
//!
//! Used as the secondary routing provider. Its JSON endpoint returns the
//! route geometry as an encoded polyline, so decoding is left to the
//! resolver.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::geo::GeoPoint;
use crate::polyline::DEFAULT_PRECISION;
use crate::traits::{ProviderRoute, RoutingProvider};

const PROVIDER: &str = "openrouteservice";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenRouteServiceConfig {
    pub base_url: String,
    pub profile: String,
    /// Sent in the `Authorization` header, never logged.
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

impl Default for OpenRouteServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openrouteservice.org".to_string(),
            profile: "driving-car".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenRouteServiceClient {
    config: OpenRouteServiceConfig,
    client: reqwest::blocking::Client,
}

impl OpenRouteServiceClient {
    pub fn new(config: OpenRouteServiceConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl RoutingProvider for OpenRouteServiceClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn fetch_route(&self, from: GeoPoint, to: GeoPoint) -> Result<ProviderRoute, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::Configuration {
                provider: PROVIDER.to_string(),
                message: "api_key is not set".to_string(),
            })?;

        let url = format!(
            "{}/v2/directions/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile
        );
        let request = DirectionsRequest {
            coordinates: [
                [from.longitude(), from.latitude()],
                [to.longitude(), to.latitude()],
            ],
        };

        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, api_key.expose_secret())
            .json(&request)
            .send()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::status(PROVIDER, status.as_u16(), &body));
        }

        let body = response
            .json::<DirectionsResponse>()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, err))?;

        let polyline = first_geometry(body)?;
        debug!(encoded_len = polyline.len(), "openrouteservice route received");
        Ok(ProviderRoute::Encoded {
            polyline,
            precision: DEFAULT_PRECISION,
        })
    }
}

fn first_geometry(body: DirectionsResponse) -> Result<String, ProviderError> {
    body.routes
        .into_iter()
        .map(|route| route.geometry)
        .find(|geometry| !geometry.is_empty())
        .ok_or_else(|| ProviderError::EmptyRoute {
            provider: PROVIDER.to_string(),
        })
}

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    coordinates: [[f64; 2]; 2],
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    geometry: String,
}
