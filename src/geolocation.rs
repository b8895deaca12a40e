use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Coordinates
///
/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("latitude must be between -90 and 90, got {0}")]
    Latitude(f64),
    #[error("longitude must be between -180 and 180, got {0}")]
    Longitude(f64),
}

impl Coordinates {
    /// Builds a position, rejecting out-of-range or non-finite values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self { latitude, longitude })
    }
}

/// LocationVerdict
///
/// Outcome of a geofence check: whether the position is on campus and how far it is
/// from the campus centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LocationVerdict {
    pub within_radius: bool,
    pub distance_meters: f64,
}

/// haversine_distance
///
/// Great-circle distance between two positions, in meters.
pub fn haversine_distance(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points.
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_METERS * c
}

/// verify_location
///
/// Compares a reported position against the campus geofence. A position exactly on
/// the boundary counts as inside.
pub fn verify_location(position: Coordinates, campus: Coordinates, radius_meters: f64) -> LocationVerdict {
    let distance_meters = haversine_distance(position, campus);
    LocationVerdict {
        within_radius: distance_meters <= radius_meters,
        distance_meters,
    }
}
