//! The "PLACEMENT" Engine - Per-tick node update
//!
//! Re-derives each node's scene transform from its geographic anchor and the
//! current reference frame:
//! 1. Project the anchor into the scene
//! 2. Distance to the best location estimate → render order hint
//! 3. Adjusted distance (saturated, rate-limited)
//! 4. Scheme scale → node or billboard content
//! 5. Commit the transform (instant on setup, animated otherwise)

use crate::config::EngineConfig;
use crate::node::{PlacedNode, PlacementState, TransformCommit, RENDER_ORDER_BASE};
use crate::projector::GeoProjector;
use geoscene_env::ReferenceFrame;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Result of one node update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOutcome {
    /// Transform committed
    Updated,
    /// Reference data missing; transform untouched
    Deferred,
    /// Unanchored node; nothing to do
    Pinned,
    /// Options keep the node where its setup update put it
    Frozen,
}

// ============================================================================
// ADJUSTED DISTANCE
// ============================================================================

/// Smoothed distance used for scaling.
///
/// Tracks `min(distance, far_field_distance)`, moving at most
/// `max_adjusted_step` per tick after setup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustedDistance {
    value: Option<f64>,
}

impl AdjustedDistance {
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Advances toward the clamped `distance` and returns the new value.
    pub fn advance(&mut self, distance: f64, setup: bool, config: &EngineConfig) -> f64 {
        let target = distance.max(0.0).min(config.far_field_distance);
        let next = match self.value {
            Some(current) if !setup => {
                let step = config.max_adjusted_step.abs();
                current + (target - current).clamp(-step, step)
            }
            _ => target,
        };
        self.value = Some(next);
        next
    }
}

/// Render order for a node `distance` metres away; nearer draws later.
pub fn render_order_hint(distance: f64) -> i64 {
    RENDER_ORDER_BASE.saturating_sub((distance.max(0.0) * 1000.0).round() as i64)
}

// ============================================================================
// UPDATE
// ============================================================================

impl PlacedNode {
    /// Re-derives position and scale from `frame`.
    ///
    /// `setup` marks the first update after placement: the adjusted distance
    /// jumps to its target and the commit is instant. `on_complete` runs
    /// after a commit.
    pub fn update<F>(
        &mut self,
        frame: &ReferenceFrame,
        setup: bool,
        config: &EngineConfig,
        on_complete: F,
    ) -> UpdateOutcome
    where
        F: FnOnce(&PlacedNode),
    {
        let Some(anchor) = self.anchor else {
            return UpdateOutcome::Pinned;
        };
        if !setup && !self.options.continually_update && self.state == PlacementState::Placed {
            return UpdateOutcome::Frozen;
        }

        let (Some(reference), Some(best)) = (frame.current_geo_location, frame.best_geo_estimate) else {
            debug!("Node {} deferred: no location estimate", self.handle);
            return UpdateOutcome::Deferred;
        };

        let anchor = if self.options.ignore_altitude {
            anchor.at_altitude(reference.altitude())
        } else {
            anchor
        };

        let target = match GeoProjector::project(&anchor, frame) {
            Ok(target) => target,
            Err(e) => {
                debug!("Node {} deferred: {}", self.handle, e);
                return UpdateOutcome::Deferred;
            }
        };

        let distance = GeoProjector::distance(&anchor, &best);
        if !setup && !self.options.continually_adjust_within_range && distance < config.far_field_distance {
            return UpdateOutcome::Frozen;
        }

        self.render_order_hint = render_order_hint(distance);
        let adjusted = self.adjusted.advance(distance, setup, config);
        let scale = self.scaling.scale(distance, adjusted);

        let mut transform = self.transform;
        transform.position = target;
        match self.billboard {
            Some(billboard) => {
                let content_scale = if billboard.scale_relative_to_distance {
                    billboard.authored_scale
                } else {
                    scale
                };
                transform.scale = Vector3::repeat(1.0);
                if let Some(camera) = frame.current_local_position {
                    transform.rotation = billboard.facing_rotation(&target, &camera);
                }
                self.content.apply(content_scale);
            }
            None => transform.scale = Vector3::repeat(scale),
        }

        let commit = TransformCommit {
            transform,
            duration: if setup { Duration::ZERO } else { config.transition_duration },
        };
        self.transform = transform;
        self.last_commit = Some(commit);
        self.last_distance = Some(distance);
        self.state = PlacementState::Placed;

        on_complete(self);
        UpdateOutcome::Updated
    }

    /// Pins an unanchored node at `position` and marks it placed.
    pub fn pin_at(&mut self, position: Vector3<f64>) {
        self.transform.position = position;
        self.last_commit = Some(TransformCommit {
            transform: self.transform,
            duration: Duration::ZERO,
        });
        self.state = PlacementState::Placed;
    }
}
