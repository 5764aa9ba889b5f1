//! Great-circle distance between coordinates.
//!
//! Coordinates reach the service as JSON numbers, numeric strings, or query
//! string values. [`CoordinateInput`] accepts all of them; [`GeoPoint`] only
//! holds validated, finite, in-range degrees.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::HubError;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude or longitude as supplied by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum CoordinateInput {
    /// JSON number.
    Number(f64),
    /// Numeric string, e.g. `"19.4326"`.
    Text(String),
}

impl CoordinateInput {
    /// Coerces the input into degrees.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if the value is not a finite number.
    pub fn to_degrees(&self) -> Result<f64, HubError> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                HubError::Validation("Invalid latitude or longitude values".to_string())
            })?,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(HubError::Validation(
                "Invalid latitude or longitude values".to_string(),
            ))
        }
    }
}

impl From<f64> for CoordinateInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CoordinateInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A validated point on the globe, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    /// Latitude in `[-90, 90]`.
    pub lat: f64,
    /// Longitude in `[-180, 180]`.
    pub lng: f64,
}

impl GeoPoint {
    /// The degenerate origin used when coordinates are unknown.
    pub const ORIGIN: Self = Self { lat: 0.0, lng: 0.0 };

    /// Builds a point from raw client input.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] for non-numeric or out-of-range
    /// values.
    pub fn parse(lat: &CoordinateInput, lng: &CoordinateInput) -> Result<Self, HubError> {
        let lat = lat.to_degrees()?;
        let lng = lng.to_degrees()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(HubError::Validation(format!(
                "coordinates out of range: lat {lat}, lng {lng}"
            )));
        }
        Ok(Self { lat, lng })
    }

    /// Haversine distance to `other` in kilometres.
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos()
                * other.lat.to_radians().cos()
                * (d_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }
}

/// Haversine distance between two raw coordinate pairs.
///
/// # Errors
///
/// Returns [`HubError::Validation`] if any of the four values is invalid.
pub fn haversine_km(
    lat1: &CoordinateInput,
    lng1: &CoordinateInput,
    lat2: &CoordinateInput,
    lng2: &CoordinateInput,
) -> Result<f64, HubError> {
    let from = GeoPoint::parse(lat1, lng1)?;
    let to = GeoPoint::parse(lat2, lng2)?;
    Ok(from.distance_km(&to))
}
