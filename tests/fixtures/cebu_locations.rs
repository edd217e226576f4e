//! Real Cebu City / Mandaue locations for test fixtures.
//!
//! Coordinates sourced from OpenStreetMap.

use jeepney_router::geo::GeoPoint;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng).unwrap()
    }
}

pub const USER_CURRENT_LOCATION: Location = Location::new("Current location", 10.3173, 123.9057);
pub const DESTINATION_LOCATION: Location = Location::new("Destination", 10.3126, 123.9181);

pub const LANDMARKS: &[Location] = &[
    Location::new("Fuente Osmeña Circle", 10.3111, 123.8930),
    Location::new("Ayala Center Cebu", 10.3181, 123.9050),
    Location::new("SM City Cebu", 10.3116, 123.9183),
    Location::new("Colon Street", 10.2969, 123.9016),
    Location::new("Carbon Market", 10.2925, 123.8989),
    Location::new("IT Park", 10.3300, 123.9059),
];

/// A short catalog in the shape the transit provider expects.
pub fn sample_catalog_json() -> &'static str {
    r#"{
        "routes": [
            {"id": "04L", "name": "Lahug - Carbon", "stops": [[10.3300, 123.9059], [10.3111, 123.8930], [10.2925, 123.8989]]},
            {"id": "12G", "name": "Labangon - SM", "stops": [[10.2990, 123.8800], [10.3111, 123.8930], [10.3116, 123.9183]]},
            {"id": "17B", "name": "Apas - Carbon", "stops": [[10.3350, 123.9050], [10.3181, 123.9050], [10.2925, 123.8989]]}
        ]
    }"#
}
