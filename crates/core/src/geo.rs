//! Coordinates and great-circle distance.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Build coordinates, returning `None` when either value is out of range.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let coords = Self { lat, lng };
        coords.is_valid().then_some(coords)
    }

    /// Whether both values fall inside the legal latitude/longitude bounds.
    ///
    /// NaN fails both range checks.
    pub fn is_valid(&self) -> bool {
        (MIN_LATITUDE..=MAX_LATITUDE).contains(&self.lat)
            && (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&self.lng)
    }

    /// Like [`Coordinates::is_valid`], but reports which bound was violated.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&self.lat) {
            return Err(CoreError::Validation(format!(
                "Latitude must be between {MIN_LATITUDE} and {MAX_LATITUDE}, got {}",
                self.lat
            )));
        }
        if !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&self.lng) {
            return Err(CoreError::Validation(format!(
                "Longitude must be between {MIN_LONGITUDE} and {MAX_LONGITUDE}, got {}",
                self.lng
            )));
        }
        Ok(())
    }
}

/// Canonical `lat,lng` form, which [`crate::coordinates::extract_coordinates`]
/// parses back to the same value.
impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Great-circle distance between two points in kilometres (haversine).
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push `h` a hair above 1 for antipodal points.
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}
