//! Engine tunables.

use h3o::Resolution;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// ENGINE
// ============================================================================

/// Configuration for the placement engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Distance (m) beyond which the adjusted distance saturates (default: 100)
    pub far_field_distance: f64,

    /// Largest change (m) of the adjusted distance per non-setup tick (default: 0.5)
    pub max_adjusted_step: f64,

    /// Animation length for non-setup commits (default: 100 ms)
    #[serde(with = "duration_millis")]
    pub transition_duration: Duration,

    /// H3 resolution of the anchor index (default: Resolution::Nine ~174m cells)
    pub spatial_resolution: Resolution,

    /// Geometry options for blob extrusion
    pub blob: BlobConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            far_field_distance: 100.0,
            max_adjusted_step: 0.5,
            transition_duration: Duration::from_millis(100),
            spatial_resolution: Resolution::Nine,
            blob: BlobConfig::default(),
        }
    }
}

// ============================================================================
// BLOB
// ============================================================================

/// Configuration for blob footprint extrusion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    /// Fixed yaw applied after toppling the path into the scene (degrees, default: 0)
    ///
    /// The path is laid out from bearings converted to radians with +y north,
    /// so toppling alone already leaves north on scene -z. Only set this to
    /// compensate for a footprint drawn against a rotated basemap.
    pub heading_correction_degrees: f64,

    /// Footprint extent (m) above which flat projection is flagged (default: 5 km)
    pub max_flat_extent: f64,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            heading_correction_degrees: 0.0,
            max_flat_extent: 5_000.0,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
