//! Distance-adaptive scale strategies.
//!
//! A scheme maps `(distance, adjusted_distance)` to a scale factor. The raw
//! distance is the geodesic distance to the viewer; the adjusted distance is
//! the smoothed value saturated at the far-field clamp (see
//! [`crate::placement::AdjustedDistance`]).

use crate::error::{PlacementError, PlacementResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Floor for any scale that comes out non-positive or non-finite.
pub const MIN_SCALE: f64 = 1e-3;

/// Floor for the `Normal` scheme, so a node at the viewer stays visible.
pub const MIN_NORMAL_SCALE: f64 = 0.05;

/// Slope of the `Normal` scheme per metre of adjusted distance.
pub const NORMAL_SLOPE: f64 = 0.181;

/// Raw distance where the `Normal` far-field attenuation starts (m).
pub const FAR_ATTENUATION_START: f64 = 3_000.0;

/// Raw distance where the `Normal` far-field attenuation is complete (m).
pub const FAR_ATTENUATION_END: f64 = 4_000.0;

/// Scale multiplier once the far-field attenuation is complete.
pub const FAR_ATTENUATION_FACTOR: f64 = 0.75;

/// Strategy for sizing a node from its distance to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum ScalingScheme {
    /// Always 1
    #[default]
    Fixed,

    /// Grows with adjusted distance, attenuated far away
    Normal,

    /// `scale` beyond `threshold` (adjusted), 1 otherwise
    Tiered { threshold: f64, scale: f64 },

    /// Two steps: `first_scale` beyond `first_threshold`, `second_scale`
    /// beyond `second_threshold`
    DoubleTiered {
        first_threshold: f64,
        first_scale: f64,
        second_threshold: f64,
        second_scale: f64,
    },

    /// Shrinks linearly to zero at `threshold`
    Linear { threshold: f64 },

    /// Like `Linear` but holds 1 inside `buffer`
    LinearBuffer { threshold: f64, buffer: f64 },
}

impl ScalingScheme {
    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Normal => "normal",
            Self::Tiered { .. } => "tiered",
            Self::DoubleTiered { .. } => "double_tiered",
            Self::Linear { .. } => "linear",
            Self::LinearBuffer { .. } => "linear_buffer",
        }
    }

    /// Unclamped scale. May be zero (e.g. `Linear` past its threshold).
    pub fn raw_scale(&self, distance: f64, adjusted: f64) -> f64 {
        match *self {
            Self::Fixed => 1.0,
            Self::Normal => (NORMAL_SLOPE * adjusted).max(MIN_NORMAL_SCALE) * far_attenuation(distance),
            Self::Tiered { threshold, scale } => {
                if adjusted > threshold {
                    scale
                } else {
                    1.0
                }
            }
            Self::DoubleTiered {
                first_threshold,
                first_scale,
                second_threshold,
                second_scale,
            } => {
                if adjusted > second_threshold {
                    second_scale
                } else if adjusted > first_threshold {
                    first_scale
                } else {
                    1.0
                }
            }
            Self::Linear { threshold } => linear(adjusted, threshold),
            Self::LinearBuffer { threshold, buffer } => {
                if adjusted.abs() < buffer.abs() {
                    1.0
                } else {
                    linear(adjusted, threshold)
                }
            }
        }
    }

    /// Scale factor, always strictly positive.
    ///
    /// Degenerate results are clamped to [`MIN_SCALE`] and logged.
    pub fn scale(&self, distance: f64, adjusted: f64) -> f64 {
        match self.checked_scale(distance, adjusted) {
            Ok(scale) => scale,
            Err(e) => {
                warn!("{}, clamping to {}", e, MIN_SCALE);
                MIN_SCALE
            }
        }
    }

    /// Scale factor, or `DegenerateScale` if it is not strictly positive.
    pub fn checked_scale(&self, distance: f64, adjusted: f64) -> PlacementResult<f64> {
        let value = self.raw_scale(distance, adjusted);
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(PlacementError::DegenerateScale {
                scheme: self.name(),
                value,
            })
        }
    }
}

fn linear(adjusted: f64, threshold: f64) -> f64 {
    if threshold == 0.0 {
        return 0.0;
    }
    (1.0 - adjusted.abs() / threshold.abs()).max(0.0)
}

/// 1.0 below 3 km, 0.75 above 4 km, linear in between.
fn far_attenuation(distance: f64) -> f64 {
    let t = ((distance - FAR_ATTENUATION_START) / (FAR_ATTENUATION_END - FAR_ATTENUATION_START))
        .clamp(0.0, 1.0);
    1.0 - t * (1.0 - FAR_ATTENUATION_FACTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fixed_is_one() {
        assert_eq!(ScalingScheme::Fixed.scale(0.0, 0.0), 1.0);
        assert_eq!(ScalingScheme::Fixed.scale(1e6, 100.0), 1.0);
    }

    #[test]
    fn test_normal_positive_at_zero() {
        let s = ScalingScheme::Normal.scale(0.0, 0.0);
        assert_eq!(s, MIN_NORMAL_SCALE);
        assert!(s > 0.0);
    }

    #[test]
    fn test_normal_near_field_slope() {
        assert_relative_eq!(ScalingScheme::Normal.scale(50.0, 50.0), 0.181 * 50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normal_far_smaller_than_mid() {
        let mid = ScalingScheme::Normal.scale(1_000.0, 100.0);
        let far = ScalingScheme::Normal.scale(10_000.0, 100.0);
        assert!(far < mid);
        assert!(far > 0.0);
        assert_relative_eq!(far, mid * 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_normal_attenuation_is_continuous() {
        let before = ScalingScheme::Normal.scale(2_999.999, 100.0);
        let after = ScalingScheme::Normal.scale(3_000.001, 100.0);
        assert!((before - after).abs() < 1e-4);

        let halfway = ScalingScheme::Normal.scale(3_500.0, 100.0);
        assert_relative_eq!(halfway, 0.181 * 100.0 * 0.875, epsilon = 1e-9);
    }

    #[test]
    fn test_normal_monotonic_in_adjusted() {
        let mut last = 0.0;
        for step in 0..=100 {
            let s = ScalingScheme::Normal.scale(500.0, step as f64);
            assert!(s >= last);
            last = s;
        }
    }

    #[test]
    fn test_tiered() {
        let scheme = ScalingScheme::Tiered { threshold: 50.0, scale: 2.0 };
        assert_eq!(scheme.scale(10.0, 10.0), 1.0);
        assert_eq!(scheme.scale(80.0, 80.0), 2.0);
    }

    #[test]
    fn test_double_tiered() {
        let scheme = ScalingScheme::DoubleTiered {
            first_threshold: 20.0,
            first_scale: 1.5,
            second_threshold: 60.0,
            second_scale: 3.0,
        };
        assert_eq!(scheme.scale(0.0, 10.0), 1.0);
        assert_eq!(scheme.scale(0.0, 30.0), 1.5);
        assert_eq!(scheme.scale(0.0, 90.0), 3.0);
    }

    #[test]
    fn test_linear_clamps_past_threshold() {
        let scheme = ScalingScheme::Linear { threshold: 100.0 };
        assert_relative_eq!(scheme.scale(0.0, 25.0), 0.75);
        assert_eq!(scheme.raw_scale(0.0, 100.0), 0.0);
        assert_eq!(scheme.scale(0.0, 100.0), MIN_SCALE);
        assert!(scheme.checked_scale(0.0, 150.0).is_err());
    }

    #[test]
    fn test_linear_buffer() {
        let scheme = ScalingScheme::LinearBuffer { threshold: 100.0, buffer: 30.0 };
        assert_eq!(scheme.scale(0.0, 10.0), 1.0);
        assert_relative_eq!(scheme.scale(0.0, 50.0), 0.5);
    }

    #[test]
    fn test_degenerate_tier_clamped() {
        let scheme = ScalingScheme::Tiered { threshold: 1.0, scale: -2.0 };
        assert_eq!(scheme.scale(5.0, 5.0), MIN_SCALE);

        match scheme.checked_scale(5.0, 5.0) {
            Err(PlacementError::DegenerateScale { scheme, value }) => {
                assert_eq!(scheme, "tiered");
                assert_eq!(value, -2.0);
            }
            other => panic!("expected DegenerateScale, got {other:?}"),
        }
    }

    #[test]
    fn test_serde_tagged() {
        let scheme = ScalingScheme::Tiered { threshold: 10.0, scale: 0.5 };
        let json = serde_json::to_string(&scheme).unwrap();
        assert!(json.contains("\"scheme\":\"tiered\""));
        assert_eq!(serde_json::from_str::<ScalingScheme>(&json).unwrap(), scheme);
    }
}
