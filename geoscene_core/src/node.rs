//! Placed nodes: anchor, transform and content state.
//!
//! A single [`PlacedNode`] covers every specialization. Billboards carry a
//! [`BillboardConfig`]; volumetric and blob nodes do not, and always use
//! the `Fixed` scaling scheme.

use crate::config::BlobConfig;
use crate::error::{PlacementError, PlacementResult};
use crate::geometry::{build_geometry_with, GeometryDescriptor, GeometryKind};
use crate::placement::AdjustedDistance;
use crate::scaling::ScalingScheme;
use geoscene_env::{GeoCoordinate, NodeHandle};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Render order of a node at zero distance. Farther nodes get smaller hints.
pub const RENDER_ORDER_BASE: i64 = i64::MAX - 1000;

/// Vertical pivot offset of billboard content, in units of its scale.
pub const BILLBOARD_PIVOT_FACTOR: f64 = 1.1;

// ============================================================================
// TRANSFORM
// ============================================================================

/// Node transform in the scene-local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub scale: Vector3<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vector3::zeros())
    }
}

impl Transform {
    /// Unrotated, unit-scale transform at `position`.
    pub fn at(position: Vector3<f64>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
        }
    }

    /// Linear position/scale and spherical rotation interpolation.
    ///
    /// `t` is clamped to [0, 1].
    pub fn interpolate(&self, other: &Transform, t: f64) -> Transform {
        let t = t.clamp(0.0, 1.0);
        Transform {
            position: self.position.lerp(&other.position, t),
            rotation: self
                .rotation
                .try_slerp(&other.rotation, t, 1e-9)
                .unwrap_or(other.rotation),
            scale: self.scale.lerp(&other.scale, t),
        }
    }
}

/// An atomic transform commit and its animation length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformCommit {
    pub transform: Transform,
    pub duration: Duration,
}

impl TransformCommit {
    /// Where a host animating from `from` should be `elapsed` into the commit.
    pub fn sample(&self, from: &Transform, elapsed: Duration) -> Transform {
        if self.duration.is_zero() {
            return self.transform;
        }
        from.interpolate(&self.transform, elapsed.as_secs_f64() / self.duration.as_secs_f64())
    }
}

// ============================================================================
// CONTENT / BILLBOARD
// ============================================================================

/// Scale and pivot of the node's content and its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTransform {
    pub scale: f64,
    pub pivot: Vector3<f64>,
    pub child_scales: Vec<f64>,
}

impl Default for ContentTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pivot: Vector3::zeros(),
            child_scales: Vec::new(),
        }
    }
}

impl ContentTransform {
    /// Applies `scale` to the content and every child, with the pivot
    /// dropped below the anchor proportionally.
    pub fn apply(&mut self, scale: f64) {
        self.scale = scale;
        self.pivot = Vector3::new(0.0, -BILLBOARD_PIVOT_FACTOR * scale, 0.0);
        self.child_scales.iter_mut().for_each(|s| *s = scale);
    }
}

/// Axes a billboard may rotate about to face the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BillboardAxis {
    /// Yaw only; stays upright
    #[default]
    Y,
    All,
}

/// Camera-facing behaviour of planar nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BillboardConfig {
    /// Keep `authored_scale` instead of the distance-derived scale
    pub scale_relative_to_distance: bool,
    pub authored_scale: f64,
    pub axis: BillboardAxis,
}

impl Default for BillboardConfig {
    fn default() -> Self {
        Self {
            scale_relative_to_distance: false,
            authored_scale: 1.0,
            axis: BillboardAxis::Y,
        }
    }
}

impl BillboardConfig {
    /// Rotation turning the content's `+z` toward `camera`.
    pub fn facing_rotation(&self, node: &Vector3<f64>, camera: &Vector3<f64>) -> UnitQuaternion<f64> {
        let mut dir = camera - node;
        if self.axis == BillboardAxis::Y {
            dir.y = 0.0;
        }
        if dir.norm() < 1e-9 {
            return UnitQuaternion::identity();
        }
        match self.axis {
            BillboardAxis::Y => UnitQuaternion::from_axis_angle(&Vector3::y_axis(), dir.x.atan2(dir.z)),
            BillboardAxis::All => UnitQuaternion::face_towards(&dir, &Vector3::y()),
        }
    }
}

// ============================================================================
// OPTIONS / STATE
// ============================================================================

/// Per-node placement behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementOptions {
    /// Project at the reference altitude instead of the anchor's
    pub ignore_altitude: bool,

    /// Re-project every tick (otherwise placed once at setup)
    pub continually_update: bool,

    /// Re-project nodes inside the far-field distance after setup
    pub continually_adjust_within_range: bool,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            ignore_altitude: false,
            continually_update: true,
            continually_adjust_within_range: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementState {
    /// Waiting for reference data before the setup update
    Pending,
    Placed,
}

// ============================================================================
// NODE
// ============================================================================

/// A node positioned in the scene from a geographic anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedNode {
    pub handle: NodeHandle,

    /// `None` pins the node at the viewer's position on placement
    pub anchor: Option<GeoCoordinate>,

    pub transform: Transform,
    pub content: ContentTransform,
    pub tag: Option<String>,
    pub render_order_hint: i64,
    pub kind: GeometryKind,
    pub geometry: GeometryDescriptor,
    pub scaling: ScalingScheme,
    pub billboard: Option<BillboardConfig>,
    pub options: PlacementOptions,
    pub state: PlacementState,

    /// Most recent commit, for hosts that animate
    pub last_commit: Option<TransformCommit>,

    /// Distance to the best estimate at the last update (m)
    pub last_distance: Option<f64>,

    pub(crate) adjusted: AdjustedDistance,
}

impl PlacedNode {
    fn with_geometry(
        anchor: Option<GeoCoordinate>,
        kind: GeometryKind,
        geometry: GeometryDescriptor,
        scaling: ScalingScheme,
        billboard: Option<BillboardConfig>,
    ) -> Self {
        Self {
            handle: NodeHandle::new(),
            anchor,
            transform: Transform::default(),
            content: ContentTransform::default(),
            tag: None,
            render_order_hint: RENDER_ORDER_BASE,
            kind,
            geometry,
            scaling,
            billboard,
            options: PlacementOptions::default(),
            state: PlacementState::Pending,
            last_commit: None,
            last_distance: None,
            adjusted: AdjustedDistance::default(),
        }
    }

    /// A camera-facing image or layer node.
    ///
    /// # Errors
    /// `InvalidGeometry` for non-planar kinds or a zero-sized plane.
    pub fn billboard(
        anchor: Option<GeoCoordinate>,
        kind: GeometryKind,
        scaling: ScalingScheme,
    ) -> PlacementResult<Self> {
        if !kind.is_planar() {
            return Err(PlacementError::geometry(format!(
                "billboard needs an image or layer, got {}",
                kind.name()
            )));
        }
        let geometry = build_geometry_with(&kind, &BlobConfig::default())?;
        Ok(Self::with_geometry(anchor, kind, geometry, scaling, Some(BillboardConfig::default())))
    }

    /// A solid node (box, sphere, cylinder, torus, text) at a fixed anchor.
    pub fn volumetric(anchor: Option<GeoCoordinate>, kind: GeometryKind) -> PlacementResult<Self> {
        match kind {
            GeometryKind::Image { .. } | GeometryKind::Layer { .. } => Err(PlacementError::geometry(
                format!("{} is a billboard kind", kind.name()),
            )),
            GeometryKind::Blob(_) => Err(PlacementError::geometry("use PlacedNode::blob for footprints")),
            _ => {
                let geometry = build_geometry_with(&kind, &BlobConfig::default())?;
                Ok(Self::with_geometry(anchor, kind, geometry, ScalingScheme::Fixed, None))
            }
        }
    }

    /// An extruded footprint anchored at its boundary's centroid.
    pub fn blob(shape: crate::blob::BlobShape, config: &BlobConfig) -> PlacementResult<Self> {
        let kind = GeometryKind::Blob(shape);
        let geometry = build_geometry_with(&kind, config)?;
        let anchor = geometry.anchor;
        Ok(Self::with_geometry(anchor, kind, geometry, ScalingScheme::Fixed, None))
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_options(mut self, options: PlacementOptions) -> Self {
        self.options = options;
        self
    }

    /// Overrides the billboard behaviour. No-op for non-billboards.
    pub fn with_billboard(mut self, config: BillboardConfig) -> Self {
        if self.billboard.is_some() {
            self.billboard = Some(config);
        }
        self
    }

    /// Registers `count` child content nodes that follow the content scale.
    pub fn with_children(mut self, count: usize) -> Self {
        self.content.child_scales = vec![self.content.scale; count];
        self
    }

    /// Uses a deterministic handle.
    pub fn with_handle(mut self, handle: NodeHandle) -> Self {
        self.handle = handle;
        self
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn is_billboard(&self) -> bool {
        self.billboard.is_some()
    }

    /// Current adjusted distance, once set up.
    pub fn adjusted_distance(&self) -> Option<f64> {
        self.adjusted.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_interpolate() {
        let a = Transform::at(Vector3::zeros());
        let mut b = Transform::at(Vector3::new(10.0, 0.0, -4.0));
        b.rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.0);
        b.scale = Vector3::repeat(3.0);

        let mid = a.interpolate(&b, 0.5);
        assert_relative_eq!(mid.position, Vector3::new(5.0, 0.0, -2.0));
        assert_relative_eq!(mid.rotation.angle(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(mid.scale, Vector3::repeat(2.0));

        assert_eq!(a.interpolate(&b, 7.0), a.interpolate(&b, 1.0));
    }

    #[test]
    fn test_commit_sample_zero_duration_jumps() {
        let from = Transform::default();
        let commit = TransformCommit {
            transform: Transform::at(Vector3::new(1.0, 2.0, 3.0)),
            duration: Duration::ZERO,
        };
        assert_eq!(commit.sample(&from, Duration::ZERO), commit.transform);
    }

    #[test]
    fn test_commit_sample_halfway() {
        let from = Transform::default();
        let commit = TransformCommit {
            transform: Transform::at(Vector3::new(4.0, 0.0, 0.0)),
            duration: Duration::from_millis(100),
        };
        let t = commit.sample(&from, Duration::from_millis(25));
        assert_relative_eq!(t.position.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_content_apply_moves_pivot_and_children() {
        let mut content = ContentTransform {
            child_scales: vec![1.0, 1.0],
            ..ContentTransform::default()
        };
        content.apply(2.0);

        assert_eq!(content.scale, 2.0);
        assert_relative_eq!(content.pivot.y, -2.2);
        assert_eq!(content.child_scales, vec![2.0, 2.0]);
    }

    #[test]
    fn test_billboard_yaw_only_stays_upright() {
        let config = BillboardConfig::default();
        let rotation = config.facing_rotation(&Vector3::zeros(), &Vector3::new(5.0, 40.0, 0.0));

        let forward = rotation * Vector3::z();
        assert_relative_eq!(forward, Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(rotation * Vector3::y(), Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_billboard_full_axis_tilts() {
        let config = BillboardConfig {
            axis: BillboardAxis::All,
            ..BillboardConfig::default()
        };
        let rotation = config.facing_rotation(&Vector3::zeros(), &Vector3::new(0.0, 3.0, 4.0));
        let forward = rotation * Vector3::z();
        assert_relative_eq!(forward, Vector3::new(0.0, 0.6, 0.8), epsilon = 1e-12);
    }

    #[test]
    fn test_constructors_validate_kind() {
        let image = GeometryKind::Image { width_px: 100, height_px: 100 };
        let sphere = GeometryKind::Sphere { radius: 1.0 };

        assert!(PlacedNode::billboard(None, sphere.clone(), ScalingScheme::Normal).is_err());
        assert!(PlacedNode::volumetric(None, image.clone()).is_err());

        let node = PlacedNode::billboard(None, image, ScalingScheme::Normal).unwrap();
        assert!(node.is_billboard());
        assert_eq!(node.state, PlacementState::Pending);

        let node = PlacedNode::volumetric(None, sphere).unwrap().with_billboard(BillboardConfig::default());
        assert_eq!(node.scaling, ScalingScheme::Fixed);
        assert!(!node.is_billboard());
    }

    #[test]
    fn test_blob_node_anchor_is_centroid() {
        let boundary = vec![
            GeoCoordinate::new(30.679, -97.679).unwrap(),
            GeoCoordinate::new(30.499, -97.969).unwrap(),
            GeoCoordinate::new(30.921, -97.541).unwrap(),
        ];
        let shape = crate::blob::BlobShape::new(boundary, Some(300.0), 5_556.0);
        let node = PlacedNode::blob(shape, &BlobConfig::default()).unwrap();

        let anchor = node.anchor.unwrap();
        assert_relative_eq!(anchor.latitude(), 30.699666666666666, epsilon = 1e-9);
        assert_eq!(node.scaling, ScalingScheme::Fixed);
    }
}
