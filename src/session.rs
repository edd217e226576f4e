//! Caller-facing API for UI and CLI layers.
//!
//! [`Services`] holds the process-wide collaborators (resolver, geocode
//! cache, label pool, transit client) and hands out one [`TripSession`] per
//! user session. Sessions own their waypoints; everything else is shared.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::config::AppConfig;
use crate::error::{SessionError, SetupError};
use crate::gemini::GeminiClient;
use crate::geo::GeoPoint;
use crate::geocode::{AddressLookup, GeocodeCache, NominatimGeocoder};
use crate::openrouteservice::OpenRouteServiceClient;
use crate::osrm::OsrmClient;
use crate::resolver::{RoutePath, RouteResolver};
use crate::traits::RoutingProvider;
use crate::transit::{TransitCatalog, TransitSuggestion, TransitSuggestionClient};
use crate::waypoints::{LabelUpgrader, Waypoint, WaypointPair, WaypointStore};

#[derive(Debug, Clone)]
pub struct Services {
    resolver: Arc<RouteResolver>,
    lookup: Arc<AddressLookup>,
    labeler: Option<LabelUpgrader>,
    transit: Option<Arc<TransitSuggestionClient>>,
    route_deadline: Option<Duration>,
}

impl Services {
    pub fn new(resolver: Arc<RouteResolver>, lookup: Arc<AddressLookup>) -> Self {
        Self {
            resolver,
            lookup,
            labeler: None,
            transit: None,
            route_deadline: None,
        }
    }

    #[must_use]
    pub fn with_labeler(mut self, labeler: LabelUpgrader) -> Self {
        self.labeler = Some(labeler);
        self
    }

    #[must_use]
    pub fn with_transit(mut self, transit: Arc<TransitSuggestionClient>) -> Self {
        self.transit = Some(transit);
        self
    }

    #[must_use]
    pub fn with_route_deadline(mut self, deadline: Duration) -> Self {
        self.route_deadline = Some(deadline);
        self
    }

    /// Wires the HTTP providers described by `config`.
    ///
    /// OpenRouteService joins the routing chain only when it has an API key,
    /// and transit suggestions are enabled only when both a Gemini key and a
    /// catalog path are configured.
    pub fn from_config(config: &AppConfig) -> Result<Self, SetupError> {
        let mut providers: Vec<Box<dyn RoutingProvider>> = Vec::new();
        if config.routing.osrm_enabled {
            providers.push(Box::new(OsrmClient::new(config.osrm.clone())?));
        }
        if config.openrouteservice.api_key.is_some() {
            providers.push(Box::new(OpenRouteServiceClient::new(
                config.openrouteservice.clone(),
            )?));
        }
        let resolver = RouteResolver::new(providers)
            .with_max_endpoint_offset_km(config.routing.max_endpoint_offset_km);

        let geocoder = NominatimGeocoder::new(config.nominatim.clone())?;
        let lookup = Arc::new(AddressLookup::new(
            Arc::new(geocoder),
            Arc::new(GeocodeCache::new()),
            config.geocode_ttl(),
        ));

        let mut services = Self::new(Arc::new(resolver), Arc::clone(&lookup))
            .with_labeler(LabelUpgrader::new(lookup, config.label_threads)?)
            .with_route_deadline(config.routing.deadline());

        match (&config.gemini.api_key, &config.transit.catalog_path) {
            (Some(_), Some(path)) => {
                let catalog = TransitCatalog::from_path(path)?;
                let generator = GeminiClient::new(config.gemini.clone())?;
                services = services.with_transit(Arc::new(TransitSuggestionClient::new(
                    Arc::new(generator),
                    Arc::new(catalog),
                )));
            }
            _ => info!("transit suggestions disabled: gemini api_key or catalog_path missing"),
        }

        info!(providers = ?services.resolver.provider_names(), "services ready");
        Ok(services)
    }

    pub fn session(&self) -> TripSession {
        let waypoints = match &self.labeler {
            Some(labeler) => WaypointStore::with_labeler(labeler.clone()),
            None => WaypointStore::new(),
        };
        TripSession {
            waypoints,
            services: self.clone(),
        }
    }

    pub fn resolver(&self) -> &RouteResolver {
        &self.resolver
    }

    pub fn lookup(&self) -> &AddressLookup {
        &self.lookup
    }
}

/// One user's trip planning state.
#[derive(Debug)]
pub struct TripSession {
    waypoints: WaypointStore,
    services: Services,
}

impl TripSession {
    pub fn set_from(&self, point: GeoPoint, label_hint: Option<String>) -> Result<Waypoint, SessionError> {
        Ok(self.waypoints.set_from(point, label_hint)?)
    }

    pub fn set_to(&self, point: GeoPoint, label_hint: Option<String>) -> Result<Waypoint, SessionError> {
        Ok(self.waypoints.set_to(point, label_hint)?)
    }

    pub fn drop_pin(&self, point: GeoPoint) {
        self.waypoints.drop_pin(point);
    }

    pub fn set_from_pin(&self) -> Result<Waypoint, SessionError> {
        Ok(self.waypoints.set_from_pin(None)?)
    }

    pub fn set_to_pin(&self) -> Result<Waypoint, SessionError> {
        Ok(self.waypoints.set_to_pin(None)?)
    }

    pub fn clear(&self) {
        self.waypoints.clear();
    }

    pub fn waypoints(&self) -> &WaypointStore {
        &self.waypoints
    }

    pub fn snapshot(&self) -> WaypointPair {
        self.waypoints.snapshot()
    }

    /// Path between two arbitrary points. Never fails.
    pub fn resolve(&self, from: GeoPoint, to: GeoPoint) -> RoutePath {
        match self.services.route_deadline {
            Some(budget) => self
                .services
                .resolver
                .resolve_within(from, to, Instant::now() + budget),
            None => self.services.resolver.resolve(from, to),
        }
    }

    /// Path between the session's From and To waypoints.
    pub fn route(&self) -> Result<RoutePath, SessionError> {
        let pair = self.waypoints.snapshot();
        let (Some(from), Some(to)) = (pair.from, pair.to) else {
            return Err(SessionError::MissingWaypoint);
        };
        Ok(self.resolve(from.point(), to.point()))
    }

    pub fn suggest(&self) -> Result<TransitSuggestion, SessionError> {
        let transit = self
            .services
            .transit
            .as_ref()
            .ok_or(SessionError::TransitUnavailable)?;
        Ok(transit.suggest_for(&self.waypoints.snapshot())?)
    }

    pub fn lookup_address(&self, point: GeoPoint) -> Result<Option<String>, SessionError> {
        Ok(self.services.lookup.lookup_address(point)?)
    }
}
