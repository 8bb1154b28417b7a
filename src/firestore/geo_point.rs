//! Firestore GeoPoint type

use crate::error::AdminError;
use serde::{Deserialize, Serialize};

use super::field_value::FirestoreValue;

/// Geographic point (latitude/longitude)
///
/// Doubles as the wire payload of `geoPointValue`; proto3 JSON omits zero
/// coordinates, so both fields default to `0.0` on decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (range: -90 to 90)
    #[serde(default)]
    pub latitude: f64,

    /// Longitude in degrees (range: -180 to 180)
    #[serde(default)]
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new geographic point
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AdminError> {
        // Validate latitude (error cases first)
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(AdminError::InvalidForm(format!(
                "latitude must be in range [-90, 90], got {}",
                latitude
            )));
        }

        // Validate longitude (error cases first)
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(AdminError::InvalidForm(format!(
                "longitude must be in range [-180, 180], got {}",
                longitude
            )));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Create a point, clamping coordinates into range
    ///
    /// Non-finite coordinates become `0.0`.
    pub fn clamped(latitude: f64, longitude: f64) -> Self {
        let finite_or_zero = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            latitude: finite_or_zero(latitude).clamp(-90.0, 90.0),
            longitude: finite_or_zero(longitude).clamp(-180.0, 180.0),
        }
    }

    /// Convert to a Firestore value for use in documents
    pub fn to_value(&self) -> FirestoreValue {
        FirestoreValue::GeoPointValue(*self)
    }
}
