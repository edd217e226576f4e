//! jeepney-router core
//!
//! Waypoint handling, provider-chain route resolution with straight-line
//! degradation, encoded polyline decoding, cached reverse geocoding and
//! jeepney ride suggestions from a text-generation provider.

pub mod address;
pub mod config;
pub mod error;
pub mod gemini;
pub mod geo;
pub mod geocode;
pub mod openrouteservice;
pub mod osrm;
pub mod polyline;
pub mod resolver;
pub mod session;
pub mod straight_line;
pub mod traits;
pub mod transit;
pub mod waypoints;
