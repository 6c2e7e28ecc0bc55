//! Source traits for the tracking and location subsystems.

use crate::frame::LocalPosition;
use crate::types::GeoCoordinate;

/// The camera-tracking engine, as seen by the placement engine.
///
/// # Implementations
///
/// - **Production**: wraps the host's visual-odometry session
/// - **Simulation**: a drifting walker in `geoscene_sim`
/// - **Fixed**: [`StaticSource`](crate::StaticSource) for tests and demos
pub trait TrackingSource {
    /// Returns the device's current position in the scene-local frame.
    ///
    /// `None` until tracking has produced at least one pose.
    fn current_local_position(&self) -> Option<LocalPosition>;
}

/// The GPS/compass fusion component ("location manager").
///
/// All methods return `None` while the corresponding data is unavailable.
/// The engine treats missing data as a deferred state, never as an error.
pub trait LocationSource {
    /// Returns the geographic location paired with the current local position.
    ///
    /// `None` until a geo fix is available.
    fn current_geo_location(&self) -> Option<GeoCoordinate>;

    /// Returns a possibly smoothed/fused estimate, independent of raw GPS.
    ///
    /// Used for distance computations to reduce jitter.
    fn best_location_estimate(&self) -> Option<GeoCoordinate>;

    /// Returns the compass heading in degrees from true north.
    fn current_heading(&self) -> Option<f64>;

    /// Returns the heading accuracy in degrees.
    fn heading_accuracy(&self) -> Option<f64>;

    /// Returns the clockwise rotation (degrees) between true north and the
    /// scene's `-z` axis.
    ///
    /// Defaults to 0 for tracking sessions aligned to true north.
    fn scene_heading_offset(&self) -> f64 {
        0.0
    }
}
