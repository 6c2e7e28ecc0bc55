//! The per-tick reference frame snapshot.

use crate::context::{LocationSource, TrackingSource};
use crate::types::GeoCoordinate;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A position in the scene-local frame, in meters.
///
/// Right-handed: `+x` east, `+y` up, `-z` north (before heading offset).
pub type LocalPosition = Vector3<f64>;

/// The live pairing of the tracked local position and the geographic
/// estimate for the same instant.
///
/// Captured once per tick and never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFrame {
    /// Device position in the scene-local frame
    pub current_local_position: Option<LocalPosition>,

    /// Geographic location paired with `current_local_position`
    pub current_geo_location: Option<GeoCoordinate>,

    /// Best (possibly fused) geographic estimate
    pub best_geo_estimate: Option<GeoCoordinate>,

    /// Compass heading (degrees from true north)
    pub heading: Option<f64>,

    /// Compass heading accuracy (degrees)
    pub heading_accuracy: Option<f64>,

    /// Clockwise rotation between true north and scene `-z` (degrees)
    pub scene_heading_offset: f64,

    /// Host timestamp for this snapshot (seconds)
    pub timestamp: f64,
}

impl ReferenceFrame {
    /// Captures a snapshot from the tracking and location sources.
    pub fn capture<T, L>(tracking: &T, location: &L) -> Self
    where
        T: TrackingSource + ?Sized,
        L: LocationSource + ?Sized,
    {
        Self {
            current_local_position: tracking.current_local_position(),
            current_geo_location: location.current_geo_location(),
            best_geo_estimate: location.best_location_estimate(),
            heading: location.current_heading(),
            heading_accuracy: location.heading_accuracy(),
            scene_heading_offset: location.scene_heading_offset(),
            timestamp: 0.0,
        }
    }

    /// Builds a complete frame where the raw and best estimates coincide.
    pub fn at(local: LocalPosition, geo: GeoCoordinate) -> Self {
        Self {
            current_local_position: Some(local),
            current_geo_location: Some(geo),
            best_geo_estimate: Some(geo),
            ..Self::default()
        }
    }

    /// Sets the snapshot timestamp.
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sets the scene heading offset.
    pub fn with_heading_offset(mut self, degrees: f64) -> Self {
        self.scene_heading_offset = degrees;
        self
    }

    /// True when every field an anchored update needs is present.
    pub fn is_complete(&self) -> bool {
        self.current_local_position.is_some()
            && self.current_geo_location.is_some()
            && self.best_geo_estimate.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticSource;

    #[test]
    fn test_capture_copies_sources() {
        let geo = GeoCoordinate::new(37.3314, -122.0312).unwrap();
        let source = StaticSource::new(Vector3::new(1.0, 2.0, 3.0), geo).with_heading(90.0, 5.0);

        let frame = ReferenceFrame::capture(&source, &source);

        assert_eq!(frame.current_local_position, Some(Vector3::new(1.0, 2.0, 3.0)));
        assert_eq!(frame.current_geo_location, Some(geo));
        assert_eq!(frame.best_geo_estimate, Some(geo));
        assert_eq!(frame.heading, Some(90.0));
        assert_eq!(frame.heading_accuracy, Some(5.0));
        assert!(frame.is_complete());
    }

    #[test]
    fn test_empty_frame_is_incomplete() {
        let frame = ReferenceFrame::default();
        assert!(!frame.is_complete());

        let geo = GeoCoordinate::new(0.0, 0.0).unwrap();
        let partial = ReferenceFrame {
            current_geo_location: Some(geo),
            ..ReferenceFrame::default()
        };
        assert!(!partial.is_complete());
    }
}
