//! Encoded polyline codec for route geometries.
//!
//! Providers that speak the Encoded Polyline Algorithm Format hand back a
//! compact string; this module turns it into a [`Polyline`] of decoded
//! (latitude, longitude) points and back. The format carries no checksum, so
//! a malformed string that still uses legal bytes decodes to garbage. Callers
//! must sanity-bound the result before showing it to anyone.

use serde::{Deserialize, Serialize};

use crate::error::PolylineError;

/// Precision used by Google and OpenRouteService (1e-5 degrees).
pub const DEFAULT_PRECISION: u32 = 5;

/// Largest bit offset a single value may reach before it no longer fits.
const MAX_SHIFT: u32 = 55;

/// A polyline representing a route geometry as decoded coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    /// Creates a new Polyline from decoded coordinate points.
    ///
    /// Each point is a (latitude, longitude) tuple.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Returns a reference to the coordinate points.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Consumes the polyline and returns the owned coordinate points.
    pub fn into_points(self) -> Vec<(f64, f64)> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Decodes `encoded` into (latitude, longitude) points.
///
/// `precision` must match the one the string was encoded with; a mismatch is
/// undetectable and scales every coordinate by a power of ten.
pub fn decode(encoded: &str, precision: u32) -> Result<Polyline, PolylineError> {
    let factor = 10f64.powi(precision as i32);
    let bytes = encoded.as_bytes();

    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        let start = index;
        lat = lat
            .checked_add(next_delta(bytes, &mut index)?)
            .ok_or(PolylineError::Overflow { offset: start })?;
        let start = index;
        lng = lng
            .checked_add(next_delta(bytes, &mut index)?)
            .ok_or(PolylineError::Overflow { offset: start })?;
        points.push((lat as f64 / factor, lng as f64 / factor));
    }

    Ok(Polyline::new(points))
}

/// Encodes (latitude, longitude) points at the given precision.
pub fn encode(points: &[(f64, f64)], precision: u32) -> String {
    let factor = 10f64.powi(precision as i32);
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for &(lat, lng) in points {
        let lat = (lat * factor).round() as i64;
        let lng = (lng * factor).round() as i64;
        push_delta(lat - prev_lat, &mut out);
        push_delta(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let offset = *index;
        let byte = *bytes
            .get(offset)
            .ok_or(PolylineError::Truncated { offset })?;
        if !(63..=126).contains(&byte) {
            return Err(PolylineError::InvalidByte { offset, byte });
        }
        if shift > MAX_SHIFT {
            return Err(PolylineError::Overflow { offset });
        }

        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        *index += 1;

        if chunk & 0x20 == 0 {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

fn push_delta(value: i64, out: &mut String) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 };
    while value >= 0x20 {
        out.push(char::from((0x20 | (value & 0x1f)) as u8 + 63));
        value >>= 5;
    }
    out.push(char::from(value as u8 + 63));
}
