//! Scene location estimator.
//!
//! Pairs GPS fixes with the tracked position at which they arrived, and
//! answers "where is the device now" by carrying the best fix along the
//! tracked motion since it was recorded. This is the concrete
//! [`LocationSource`] the simulation feeds into every frame.

use geoscene_core::projector::normalize_degrees;
use geoscene_core::{GeoProjector, PlacementError};
use geoscene_env::{EnvError, GeoCoordinate, LocalPosition, LocationSource, ReferenceFrame};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Estimates recorded this close (m) to an existing one replace it.
const SAME_POSITION_EPSILON: f64 = 0.01;

/// How the current location is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationEstimateMethod {
    /// Latest raw GPS fix, as reported
    CoreLocationDataOnly,
    /// Best estimate translated along the tracked motion since it was taken
    #[default]
    MostRelevantEstimate,
}

/// Configuration for the estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Estimates older than this are pruned (default: 15 s)
    pub max_estimate_age: f64,

    /// Estimates recorded farther than this from the device are pruned (default: 100 m)
    pub scene_limit: f64,

    pub method: LocationEstimateMethod,

    /// Heading offset nudge per adjustment (default: 1°)
    pub heading_step: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            max_estimate_age: 15.0,
            scene_limit: 100.0,
            method: LocationEstimateMethod::MostRelevantEstimate,
            heading_step: 1.0,
        }
    }
}

/// A GPS fix tied to the tracked position where it was received.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneLocationEstimate {
    pub location: GeoCoordinate,
    pub position: LocalPosition,
    /// Horizontal accuracy (m); smaller is better
    pub accuracy: f64,
    pub timestamp: f64,
}

impl SceneLocationEstimate {
    /// Moves the estimate's location along `position - self.position`.
    pub fn translated_location(
        &self,
        position: &LocalPosition,
        heading_offset: f64,
    ) -> Result<GeoCoordinate, EnvError> {
        let frame = ReferenceFrame::at(self.position, self.location).with_heading_offset(heading_offset);
        GeoProjector::unproject(position, &frame).map_err(|e| match e {
            PlacementError::Environment(env) => env,
            other => EnvError::estimate(other.to_string()),
        })
    }
}

/// Keeps recent estimates and derives the device's geographic location.
#[derive(Debug, Clone, Default)]
pub struct SceneLocationManager {
    config: EstimatorConfig,
    estimates: Vec<SceneLocationEstimate>,
    latest_fix: Option<GeoCoordinate>,
    current_position: Option<LocalPosition>,
    heading: Option<(f64, f64)>,
    heading_offset: f64,
}

impl SceneLocationManager {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn estimates(&self) -> &[SceneLocationEstimate] {
        &self.estimates
    }

    /// Records an estimate.
    ///
    /// # Errors
    /// `InvalidEstimate` for a negative or non-finite accuracy, a non-finite
    /// timestamp, or a non-finite position.
    pub fn add_estimate(&mut self, estimate: SceneLocationEstimate) -> Result<(), EnvError> {
        if !estimate.accuracy.is_finite() || estimate.accuracy < 0.0 {
            return Err(EnvError::estimate(format!("accuracy {} rejected", estimate.accuracy)));
        }
        if !estimate.timestamp.is_finite() || estimate.position.iter().any(|c| !c.is_finite()) {
            return Err(EnvError::estimate("non-finite position or timestamp"));
        }

        self.estimates
            .retain(|e| (e.position - estimate.position).norm() > SAME_POSITION_EPSILON);
        self.estimates.push(estimate);
        Ok(())
    }

    /// Handles a GPS fix received while the device was at `position`.
    pub fn location_update(
        &mut self,
        location: GeoCoordinate,
        accuracy: f64,
        position: LocalPosition,
        timestamp: f64,
    ) -> Result<(), EnvError> {
        self.add_estimate(SceneLocationEstimate {
            location,
            position,
            accuracy,
            timestamp,
        })?;
        self.latest_fix = Some(location);
        self.current_position = Some(position);
        Ok(())
    }

    /// Updates the tracked position the estimates are carried to.
    pub fn set_current_position(&mut self, position: Option<LocalPosition>) {
        self.current_position = position;
    }

    pub fn set_heading(&mut self, heading: f64, accuracy: f64) {
        self.heading = Some((heading, accuracy));
    }

    /// Most accurate estimate, ties broken by the most recent.
    pub fn best_estimate(&self) -> Option<&SceneLocationEstimate> {
        self.estimates.iter().min_by(|a, b| {
            a.accuracy
                .total_cmp(&b.accuracy)
                .then(b.timestamp.total_cmp(&a.timestamp))
        })
    }

    /// The device location at `position`, per the configured method.
    ///
    /// # Errors
    /// `NoEstimate` before any fix was recorded.
    pub fn current_location(&self, position: &LocalPosition) -> Result<GeoCoordinate, EnvError> {
        match self.config.method {
            LocationEstimateMethod::CoreLocationDataOnly => self.latest_fix.ok_or(EnvError::NoEstimate),
            LocationEstimateMethod::MostRelevantEstimate => self.translated_best(position),
        }
    }

    fn translated_best(&self, position: &LocalPosition) -> Result<GeoCoordinate, EnvError> {
        let best = self.best_estimate().ok_or(EnvError::NoEstimate)?;
        best.translated_location(position, self.heading_offset)
    }

    /// Drops estimates older than `max_estimate_age` or recorded farther
    /// than `scene_limit` from `current_position`.
    pub fn prune(&mut self, now: f64, current_position: &LocalPosition) {
        let before = self.estimates.len();
        let max_age = self.config.max_estimate_age;
        let limit = self.config.scene_limit;
        self.estimates.retain(|e| {
            let offset = e.position - current_position;
            now - e.timestamp <= max_age && offset.x.hypot(offset.z) <= limit
        });
        if self.estimates.len() < before {
            debug!("Pruned {} location estimates", before - self.estimates.len());
        }
    }

    pub fn heading_offset(&self) -> f64 {
        self.heading_offset
    }

    /// Rotates the scene heading offset clockwise by one step.
    pub fn move_heading_clockwise(&mut self) {
        self.heading_offset = normalize_degrees(self.heading_offset + self.config.heading_step);
    }

    /// Rotates the scene heading offset anticlockwise by one step.
    pub fn move_heading_anticlockwise(&mut self) {
        self.heading_offset = normalize_degrees(self.heading_offset - self.config.heading_step);
    }
}

impl LocationSource for SceneLocationManager {
    fn current_geo_location(&self) -> Option<GeoCoordinate> {
        let position = self.current_position?;
        self.current_location(&position).ok()
    }

    fn best_location_estimate(&self) -> Option<GeoCoordinate> {
        let position = self.current_position?;
        self.translated_best(&position).ok()
    }

    fn current_heading(&self) -> Option<f64> {
        self.heading.map(|(h, _)| h)
    }

    fn heading_accuracy(&self) -> Option<f64> {
        self.heading.map(|(_, a)| a)
    }

    fn scene_heading_offset(&self) -> f64 {
        self.heading_offset
    }
}
