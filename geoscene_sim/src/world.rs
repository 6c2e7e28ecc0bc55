//! SimWorld - A walking viewer with imperfect tracking and GPS.
//!
//! The world keeps the ground truth (true geographic location and true
//! displacement) and derives the two imperfect views the engine sees:
//! - Tracking: true displacement + random-walk drift + relocalization jumps,
//!   expressed in a scene frame that may be misaligned with true north
//! - GPS: true location + Gaussian noise, fed to the [`SceneLocationManager`]

use crate::estimator::{EstimatorConfig, SceneLocationManager};
use geoscene_core::{EngineConfig, GeoProjector, LocationTranslation, PlacementResult};
use geoscene_env::{GeoCoordinate, LocalPosition, ReferenceFrame, TrackingSource};
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Tick rate in Hz
    pub tick_rate_hz: u32,

    /// Simulation duration in seconds
    pub duration_secs: f64,

    /// Starting latitude of the viewer
    pub origin_latitude: f64,

    /// Starting longitude of the viewer
    pub origin_longitude: f64,

    /// Walking speed (m/s)
    pub walk_speed: f64,

    /// Walking direction (degrees from true north)
    pub walk_bearing: f64,

    /// Seconds between GPS fixes
    pub gps_interval_secs: f64,

    /// Time before the first GPS fix (s)
    pub gps_start_delay_secs: f64,

    /// GPS horizontal noise standard deviation (m)
    pub gps_noise_std: f64,

    /// Tracking random-walk drift (m per √s)
    pub tracking_drift_std: f64,

    /// Seconds between relocalization jumps (0 = never)
    pub relocalization_interval_secs: f64,

    /// Size of a relocalization jump (m)
    pub relocalization_jump: f64,

    /// Tracking unavailable between these times (s)
    pub tracking_loss: Option<(f64, f64)>,

    /// True misalignment of the tracking frame (degrees clockwise from north)
    pub tracking_heading_offset: f64,

    /// Placement engine configuration
    pub engine: EngineConfig,

    /// Location estimator configuration
    pub estimator: EstimatorConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_rate_hz: 30,
            duration_secs: 20.0,
            origin_latitude: 37.3314,
            origin_longitude: -122.0312,
            walk_speed: 1.4,
            walk_bearing: 60.0,
            gps_interval_secs: 1.0,
            gps_start_delay_secs: 0.5,
            gps_noise_std: 3.0,
            tracking_drift_std: 0.02,
            relocalization_interval_secs: 0.0,
            relocalization_jump: 0.0,
            tracking_loss: None,
            tracking_heading_offset: 0.0,
            engine: EngineConfig::default(),
            estimator: EstimatorConfig::default(),
        }
    }
}

impl SimConfig {
    /// Loads a configuration from a JSON file; missing fields keep defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Simulation time step (s).
    pub fn dt(&self) -> f64 {
        1.0 / f64::from(self.tick_rate_hz.max(1))
    }

    /// Number of ticks in the configured duration.
    pub fn total_ticks(&self) -> u64 {
        (self.duration_secs.max(0.0) * f64::from(self.tick_rate_hz.max(1))) as u64
    }
}

/// Something noteworthy that happened during a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    GpsFix { accuracy: f64 },
    Relocalized { jump: [f64; 3] },
    TrackingLost,
    TrackingRestored,
}

/// The simulated viewer and its sensors.
pub struct SimWorld {
    config: SimConfig,
    rng: ChaCha8Rng,
    time: f64,
    origin: GeoCoordinate,
    true_location: GeoCoordinate,
    true_offset: Vector3<f64>,
    drift: Vector3<f64>,
    tracking_lost: bool,
    estimator: SceneLocationManager,
    next_gps: f64,
    next_relocalization: f64,
}

impl SimWorld {
    /// Creates a world at the configured origin.
    pub fn new(config: SimConfig) -> PlacementResult<Self> {
        let origin = GeoCoordinate::new(config.origin_latitude, config.origin_longitude)?;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            time: 0.0,
            origin,
            true_location: origin,
            true_offset: Vector3::zeros(),
            drift: Vector3::zeros(),
            tracking_lost: false,
            estimator: SceneLocationManager::new(config.estimator),
            next_gps: config.gps_start_delay_secs,
            next_relocalization: if config.relocalization_interval_secs > 0.0 {
                config.relocalization_interval_secs
            } else {
                f64::INFINITY
            },
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn origin(&self) -> &GeoCoordinate {
        &self.origin
    }

    pub fn true_location(&self) -> &GeoCoordinate {
        &self.true_location
    }

    pub fn estimator(&self) -> &SceneLocationManager {
        &self.estimator
    }

    pub fn estimator_mut(&mut self) -> &mut SceneLocationManager {
        &mut self.estimator
    }

    /// Captures the reference frame the host would hand the engine.
    pub fn frame(&self) -> ReferenceFrame {
        ReferenceFrame::capture(self, &self.estimator).with_timestamp(self.time)
    }

    /// Advances the world by one tick.
    pub fn step(&mut self) -> PlacementResult<Vec<WorldEvent>> {
        let dt = self.config.dt();
        let mut events = Vec::new();
        self.time += dt;

        // Ground truth motion
        let distance = self.config.walk_speed * dt;
        self.true_location = GeoProjector::destination(&self.true_location, self.config.walk_bearing, distance)?;
        let bearing = self.config.walk_bearing.to_radians();
        self.true_offset += self.to_tracking_frame(distance * bearing.sin(), distance * bearing.cos());

        // Tracking error
        if self.config.tracking_drift_std > 0.0 {
            if let Ok(normal) = Normal::new(0.0, self.config.tracking_drift_std * dt.sqrt()) {
                self.drift.x += normal.sample(&mut self.rng);
                self.drift.z += normal.sample(&mut self.rng);
            }
        }
        if self.time >= self.next_relocalization {
            let angle = self.rng.gen_range(0.0..std::f64::consts::TAU);
            let jump = Vector3::new(angle.cos(), 0.0, angle.sin()) * self.config.relocalization_jump;
            self.drift += jump;
            self.next_relocalization += self.config.relocalization_interval_secs;
            debug!("Relocalized at t={:.2}s by {:.2} m", self.time, jump.norm());
            events.push(WorldEvent::Relocalized { jump: [jump.x, jump.y, jump.z] });
        }

        let lost = self
            .config
            .tracking_loss
            .is_some_and(|(start, end)| self.time >= start && self.time < end);
        if lost != self.tracking_lost {
            events.push(if lost { WorldEvent::TrackingLost } else { WorldEvent::TrackingRestored });
            self.tracking_lost = lost;
        }

        let tracked = self.current_local_position();
        self.estimator.set_current_position(tracked);
        self.estimator.set_heading(self.config.walk_bearing, 10.0);

        // GPS fixes only pair with a tracked pose
        if let Some(position) = tracked {
            if self.time >= self.next_gps {
                let accuracy = self.gps_fix(position)?;
                self.next_gps += self.config.gps_interval_secs.max(dt);
                events.push(WorldEvent::GpsFix { accuracy });
            }
            self.estimator.prune(self.time, &position);
        }

        Ok(events)
    }

    fn gps_fix(&mut self, position: LocalPosition) -> PlacementResult<f64> {
        let std = self.config.gps_noise_std.max(0.0);
        let (east, north) = match Normal::new(0.0, std) {
            Ok(normal) if std > 0.0 => (normal.sample(&mut self.rng), normal.sample(&mut self.rng)),
            _ => (0.0, 0.0),
        };
        let fix = GeoProjector::translated(&self.true_location, &LocationTranslation { east, north, up: 0.0 })?;
        // Reported accuracy is only loosely related to the actual error
        let accuracy = (std * self.rng.gen_range(0.8..2.0)).max(1.0);
        self.estimator.location_update(fix, accuracy, position, self.time)?;
        Ok(accuracy)
    }

    /// Maps a true east/north displacement into the (possibly misaligned)
    /// tracking frame.
    fn to_tracking_frame(&self, east: f64, north: f64) -> Vector3<f64> {
        let (sin_o, cos_o) = self.config.tracking_heading_offset.to_radians().sin_cos();
        let scene_east = east * cos_o - north * sin_o;
        let scene_north = north * cos_o + east * sin_o;
        Vector3::new(scene_east, 0.0, -scene_north)
    }

    /// Horizontal distance between the estimated and true location.
    pub fn location_error(&self) -> Option<f64> {
        let frame = self.frame();
        frame
            .current_geo_location
            .map(|estimate| GeoProjector::surface_distance(&estimate, &self.true_location))
    }
}

impl TrackingSource for SimWorld {
    fn current_local_position(&self) -> Option<LocalPosition> {
        if self.tracking_lost {
            None
        } else {
            Some(self.true_offset + self.drift)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geoscene_env::LocationSource;

    fn quiet() -> SimConfig {
        SimConfig {
            gps_noise_std: 0.0,
            tracking_drift_std: 0.0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_no_location_before_first_fix() {
        let mut world = SimWorld::new(SimConfig {
            gps_start_delay_secs: 1.0,
            ..quiet()
        })
        .unwrap();
        world.step().unwrap();

        let frame = world.frame();
        assert!(frame.current_local_position.is_some());
        assert!(frame.current_geo_location.is_none());
    }

    #[test]
    fn test_perfect_sensors_track_truth() {
        let mut world = SimWorld::new(quiet()).unwrap();
        for _ in 0..300 {
            world.step().unwrap();
        }
        assert!(world.location_error().unwrap() < 0.05);

        let walked = world.frame().current_local_position.unwrap();
        assert_relative_eq!(walked.norm(), 1.4 * 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_misaligned_frame_is_corrected_by_heading_offset() {
        // A single early fix, carried 13 m along the misaligned frame
        let config = SimConfig {
            tracking_heading_offset: 5.0,
            gps_interval_secs: 100.0,
            ..quiet()
        };
        let mut world = SimWorld::new(config).unwrap();
        for _ in 0..300 {
            world.step().unwrap();
        }
        let misaligned = world.location_error().unwrap();

        for _ in 0..5 {
            world.estimator_mut().move_heading_clockwise();
        }
        let aligned = world.location_error().unwrap();
        assert!(aligned < misaligned);
        assert!(aligned < 0.05);
    }

    #[test]
    fn test_tracking_loss_window() {
        let mut world = SimWorld::new(SimConfig {
            tracking_loss: Some((0.5, 1.0)),
            ..quiet()
        })
        .unwrap();

        let mut events = Vec::new();
        for _ in 0..45 {
            events.extend(world.step().unwrap());
        }
        assert!(events.contains(&WorldEvent::TrackingLost));
        assert!(events.contains(&WorldEvent::TrackingRestored));
        assert!(world.frame().current_local_position.is_some());
    }

    #[test]
    fn test_same_seed_same_world() {
        let run = |seed| {
            let mut world = SimWorld::new(SimConfig { seed, ..SimConfig::default() }).unwrap();
            for _ in 0..120 {
                world.step().unwrap();
            }
            world.estimator().best_location_estimate()
        };
        assert_eq!(run(7), run(7));
        assert_ne!(run(7), run(8));
    }

    #[test]
    fn test_config_json_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{"seed": 9, "walk_speed": 2.0}"#).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.walk_speed, 2.0);
        assert_eq!(config.tick_rate_hz, 30);
        assert_eq!(config.total_ticks(), 600);
    }
}
