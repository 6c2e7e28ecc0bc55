//! Fixed implementation of the source traits.

use crate::context::{LocationSource, TrackingSource};
use crate::frame::LocalPosition;
use crate::types::GeoCoordinate;

/// A source that always reports the same pose and fix.
///
/// Useful for hosts without live tracking (previews, tests) and as the
/// stand-in for a device that stands still.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    local: Option<LocalPosition>,
    geo: Option<GeoCoordinate>,
    best: Option<GeoCoordinate>,
    heading: Option<f64>,
    heading_accuracy: Option<f64>,
    heading_offset: f64,
}

impl StaticSource {
    /// Creates a source reporting `local` paired with `geo`.
    pub fn new(local: LocalPosition, geo: GeoCoordinate) -> Self {
        Self {
            local: Some(local),
            geo: Some(geo),
            best: Some(geo),
            ..Self::default()
        }
    }

    /// Overrides the best estimate (distinct from the raw fix).
    pub fn with_best_estimate(mut self, best: Option<GeoCoordinate>) -> Self {
        self.best = best;
        self
    }

    /// Sets the compass heading and its accuracy.
    pub fn with_heading(mut self, heading: f64, accuracy: f64) -> Self {
        self.heading = Some(heading);
        self.heading_accuracy = Some(accuracy);
        self
    }

    /// Sets the scene heading offset in degrees.
    pub fn with_heading_offset(mut self, degrees: f64) -> Self {
        self.heading_offset = degrees;
        self
    }
}

impl TrackingSource for StaticSource {
    fn current_local_position(&self) -> Option<LocalPosition> {
        self.local
    }
}

impl LocationSource for StaticSource {
    fn current_geo_location(&self) -> Option<GeoCoordinate> {
        self.geo
    }

    fn best_location_estimate(&self) -> Option<GeoCoordinate> {
        self.best
    }

    fn current_heading(&self) -> Option<f64> {
        self.heading
    }

    fn heading_accuracy(&self) -> Option<f64> {
        self.heading_accuracy
    }

    fn scene_heading_offset(&self) -> f64 {
        self.heading_offset
    }
}
