//! Great-circle math used by the proximity queries.
//!
//! The store narrows candidates with a [`BoundingBox`] on indexed
//! latitude/longitude columns, then filters and orders them with
//! [`haversine_km`].

use serde::{Deserialize, Serialize};

use crate::constants::EARTH_RADIUS_KM;
use crate::error::InputError;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InputError> {
        let in_range = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !in_range {
            return Err(InputError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Latitude/longitude rectangle enclosing a search circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Box around `center` that contains every point within `radius_km`.
    ///
    /// The longitude half-width is the widest point of the spherical cap,
    /// `asin(sin d / cos lat)`. When the cap reaches a pole, or the box would
    /// cross the antimeridian, the longitude span is the whole range.
    pub fn around(center: GeoPoint, radius_km: f64) -> Self {
        let angular = radius_km / EARTH_RADIUS_KM;
        let lat_delta = angular.to_degrees();
        let min_lat = (center.latitude - lat_delta).max(-90.0);
        let max_lat = (center.latitude + lat_delta).min(90.0);

        let sin_d = angular.min(std::f64::consts::FRAC_PI_2).sin();
        let cos_lat = center.latitude.to_radians().cos();
        let lng_delta = if sin_d >= cos_lat {
            180.0
        } else {
            (sin_d / cos_lat).asin().to_degrees()
        };

        let (min_lng, max_lng) = if lng_delta >= 180.0
            || center.longitude - lng_delta < -180.0
            || center.longitude + lng_delta > 180.0
        {
            (-180.0, 180.0)
        } else {
            (center.longitude - lng_delta, center.longitude + lng_delta)
        };

        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }
}

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
