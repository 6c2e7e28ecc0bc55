//! Common types for the geoscene environment abstraction.

use crate::error::EnvError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A WGS84 geographic coordinate.
///
/// Altitude is optional: many fixes carry no usable vertical component, and
/// the projector treats a missing altitude as "no vertical correction".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    latitude: f64,
    longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    altitude: Option<f64>,
}

impl GeoCoordinate {
    /// Creates a coordinate without altitude.
    ///
    /// # Errors
    /// `EnvError::InvalidCoordinate` if latitude is outside [-90, 90],
    /// longitude outside [-180, 180], or either is not finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, EnvError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(EnvError::coordinate(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(EnvError::coordinate(format!(
                "longitude {longitude} outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
            altitude: None,
        })
    }

    /// Creates a coordinate with an altitude in meters.
    pub fn with_altitude(latitude: f64, longitude: f64, altitude: f64) -> Result<Self, EnvError> {
        if !altitude.is_finite() {
            return Err(EnvError::coordinate(format!("altitude {altitude} is not finite")));
        }
        Ok(Self {
            altitude: Some(altitude),
            ..Self::new(latitude, longitude)?
        })
    }

    /// Creates a coordinate from computed values, wrapping longitude into
    /// [-180, 180] and clamping latitude to [-90, 90].
    ///
    /// # Errors
    /// `EnvError::InvalidCoordinate` if any component is not finite.
    pub fn wrapped(latitude: f64, longitude: f64, altitude: Option<f64>) -> Result<Self, EnvError> {
        if !latitude.is_finite() || !longitude.is_finite() || altitude.is_some_and(|a| !a.is_finite()) {
            return Err(EnvError::coordinate(format!(
                "non-finite component in ({latitude}, {longitude}, {altitude:?})"
            )));
        }
        let longitude = (longitude + 180.0).rem_euclid(360.0) - 180.0;
        Ok(Self {
            latitude: latitude.clamp(-90.0, 90.0),
            longitude,
            altitude,
        })
    }

    /// Latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Altitude in meters, if known.
    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    /// Returns a copy with the altitude replaced.
    pub fn at_altitude(self, altitude: Option<f64>) -> Self {
        Self { altitude, ..self }
    }

    /// True when both coordinates name the same horizontal position.
    pub fn same_position(&self, other: &Self) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

impl std::fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.altitude {
            Some(alt) => write!(f, "({:.6}, {:.6}, {:.1}m)", self.latitude, self.longitude, alt),
            None => write!(f, "({:.6}, {:.6})", self.latitude, self.longitude),
        }
    }
}

/// Opaque handle naming a placed node in the registry.
///
/// Uses UUID v4 so handles stay unique across registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(pub Uuid);

impl NodeHandle {
    /// Creates a new random handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic handle from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NodeHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 8 chars are enough for log lines
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(GeoCoordinate::new(37.7749, -122.4194).is_ok());
        assert!(GeoCoordinate::new(91.0, 0.0).is_err());
        assert!(GeoCoordinate::new(0.0, -180.5).is_err());
        assert!(GeoCoordinate::new(f64::NAN, 0.0).is_err());
        assert!(GeoCoordinate::with_altitude(0.0, 0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_coordinate_altitude() {
        let c = GeoCoordinate::with_altitude(29.4259671, -98.4861419, 300.0).unwrap();
        assert_eq!(c.altitude(), Some(300.0));
        assert_eq!(c.at_altitude(None).altitude(), None);
        assert!(c.same_position(&c.at_altitude(Some(12.0))));
    }

    #[test]
    fn test_wrapped_normalizes_longitude() {
        let c = GeoCoordinate::wrapped(95.0, 190.0, None).unwrap();
        assert_eq!(c.latitude(), 90.0);
        assert!((c.longitude() - -170.0).abs() < 1e-9);

        assert!(GeoCoordinate::wrapped(0.0, f64::NAN, None).is_err());
    }

    #[test]
    fn test_coordinate_serde_omits_missing_altitude() {
        let c = GeoCoordinate::new(47.6205, -122.3493).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert!(!json.contains("altitude"));

        let back: GeoCoordinate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_handle_from_seed_is_deterministic() {
        assert_eq!(NodeHandle::from_seed(7), NodeHandle::from_seed(7));
        assert_ne!(NodeHandle::from_seed(7), NodeHandle::from_seed(8));
        assert_eq!(NodeHandle::from_seed(7).to_string().len(), 8);
    }
}
