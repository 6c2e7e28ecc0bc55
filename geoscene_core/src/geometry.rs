//! Geometry construction for placed nodes.
//!
//! Node specializations are variants of [`GeometryKind`]; [`build_geometry`]
//! validates the dimensions and returns what a renderer needs to
//! instantiate the content: its extents and fixed content orientation.

use crate::blob::{BlobPathBuilder, BlobShape, ExtrudedSolid};
use crate::config::BlobConfig;
use crate::error::{PlacementError, PlacementResult};
use geoscene_env::GeoCoordinate;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Pixels per metre for image and layer planes.
pub const PIXELS_PER_METRE: f64 = 100.0;

/// Approximate advance of a glyph relative to the text size.
const GLYPH_ASPECT: f64 = 0.6;

/// What a node draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeometryKind {
    Box { width: f64, height: f64, length: f64 },
    Sphere { radius: f64 },
    Cylinder { radius: f64, height: f64 },
    Torus { ring_radius: f64, pipe_radius: f64 },
    Text { text: String, size: f64, extrusion_depth: f64 },
    Blob(BlobShape),
    /// Camera-facing image plane
    Image { width_px: u32, height_px: u32 },
    /// Camera-facing plane backed by a host-drawn layer
    Layer { width_px: u32, height_px: u32 },
}

impl GeometryKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Box { .. } => "box",
            Self::Sphere { .. } => "sphere",
            Self::Cylinder { .. } => "cylinder",
            Self::Torus { .. } => "torus",
            Self::Text { .. } => "text",
            Self::Blob(_) => "blob",
            Self::Image { .. } => "image",
            Self::Layer { .. } => "layer",
        }
    }

    /// True for flat content meant to face the camera.
    pub fn is_planar(&self) -> bool {
        matches!(self, Self::Image { .. } | Self::Layer { .. })
    }
}

/// Renderer-facing result of geometry construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryDescriptor {
    /// Axis-aligned size in the node frame after `content_rotation` (m)
    pub extents: Vector3<f64>,

    /// Fixed rotation of the content inside its node
    pub content_rotation: UnitQuaternion<f64>,

    /// Blob anchor (centroid at floor altitude)
    pub anchor: Option<GeoCoordinate>,

    /// Extruded prism, for blobs
    pub solid: Option<ExtrudedSolid>,
}

impl GeometryDescriptor {
    fn sized(extents: Vector3<f64>) -> Self {
        Self {
            extents,
            content_rotation: UnitQuaternion::identity(),
            anchor: None,
            solid: None,
        }
    }
}

/// Builds geometry with the default blob configuration.
pub fn build_geometry(kind: &GeometryKind) -> PlacementResult<GeometryDescriptor> {
    build_geometry_with(kind, &BlobConfig::default())
}

/// Validates `kind` and describes its content.
///
/// # Errors
/// `InvalidGeometry` for non-positive or non-finite dimensions, empty text,
/// and degenerate blob boundaries.
pub fn build_geometry_with(kind: &GeometryKind, blob: &BlobConfig) -> PlacementResult<GeometryDescriptor> {
    match kind {
        GeometryKind::Box { width, height, length } => {
            positive("box width", *width)?;
            positive("box height", *height)?;
            positive("box length", *length)?;
            Ok(GeometryDescriptor::sized(Vector3::new(*width, *height, *length)))
        }
        GeometryKind::Sphere { radius } => {
            positive("sphere radius", *radius)?;
            Ok(GeometryDescriptor::sized(Vector3::repeat(2.0 * radius)))
        }
        GeometryKind::Cylinder { radius, height } => {
            positive("cylinder radius", *radius)?;
            positive("cylinder height", *height)?;
            Ok(GeometryDescriptor::sized(Vector3::new(2.0 * radius, *height, 2.0 * radius)))
        }
        GeometryKind::Torus { ring_radius, pipe_radius } => {
            positive("torus ring radius", *ring_radius)?;
            positive("torus pipe radius", *pipe_radius)?;
            // Rolled 90° about Z: the ring stands upright, axis along X
            let outer = 2.0 * (ring_radius + pipe_radius);
            Ok(GeometryDescriptor {
                content_rotation: UnitQuaternion::from_axis_angle(
                    &Vector3::z_axis(),
                    std::f64::consts::FRAC_PI_2,
                ),
                ..GeometryDescriptor::sized(Vector3::new(2.0 * pipe_radius, outer, outer))
            })
        }
        GeometryKind::Text { text, size, extrusion_depth } => {
            if text.trim().is_empty() {
                return Err(PlacementError::geometry("text is empty"));
            }
            positive("text size", *size)?;
            if !extrusion_depth.is_finite() || *extrusion_depth < 0.0 {
                return Err(PlacementError::geometry(format!(
                    "text extrusion depth must be non-negative, got {extrusion_depth}"
                )));
            }
            let width = text.chars().count() as f64 * size * GLYPH_ASPECT;
            Ok(GeometryDescriptor::sized(Vector3::new(width, *size, *extrusion_depth)))
        }
        GeometryKind::Blob(shape) => {
            let (path, solid) = BlobPathBuilder::new(*blob).build_solid(shape)?;
            Ok(GeometryDescriptor {
                extents: solid.scene_extents(),
                content_rotation: solid.orientation,
                anchor: Some(*path.anchor()),
                solid: Some(solid),
            })
        }
        GeometryKind::Image { width_px, height_px } | GeometryKind::Layer { width_px, height_px } => {
            if *width_px == 0 || *height_px == 0 {
                return Err(PlacementError::geometry(format!(
                    "{} has zero size {width_px}x{height_px}",
                    kind.name()
                )));
            }
            Ok(GeometryDescriptor::sized(Vector3::new(
                f64::from(*width_px) / PIXELS_PER_METRE,
                f64::from(*height_px) / PIXELS_PER_METRE,
                0.0,
            )))
        }
    }
}

fn positive(what: &str, value: f64) -> PlacementResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PlacementError::geometry(format!("{what} must be positive, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_extents() {
        let g = build_geometry(&GeometryKind::Box { width: 1.0, height: 2.0, length: 3.0 }).unwrap();
        assert_eq!(g.extents, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(g.content_rotation, UnitQuaternion::identity());
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(build_geometry(&GeometryKind::Sphere { radius: 0.0 }).is_err());
        assert!(build_geometry(&GeometryKind::Cylinder { radius: 1.0, height: f64::NAN }).is_err());
        assert!(build_geometry(&GeometryKind::Box { width: -1.0, height: 1.0, length: 1.0 }).is_err());
        assert!(build_geometry(&GeometryKind::Image { width_px: 0, height_px: 10 }).is_err());
        assert!(build_geometry(&GeometryKind::Text {
            text: "  ".into(),
            size: 1.0,
            extrusion_depth: 0.1
        })
        .is_err());
    }

    #[test]
    fn test_torus_is_rolled() {
        let g = build_geometry(&GeometryKind::Torus { ring_radius: 2.0, pipe_radius: 0.5 }).unwrap();
        assert_relative_eq!(g.content_rotation.angle(), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);

        // Axis (+y before the roll) now lies along X
        let axis = g.content_rotation * Vector3::y();
        assert_relative_eq!(axis.x.abs(), 1.0, epsilon = 1e-12);
        assert_eq!(g.extents, Vector3::new(1.0, 5.0, 5.0));
    }

    #[test]
    fn test_image_plane_size() {
        let g = build_geometry(&GeometryKind::Image { width_px: 300, height_px: 150 }).unwrap();
        assert_relative_eq!(g.extents.x, 3.0);
        assert_relative_eq!(g.extents.y, 1.5);
        assert_eq!(g.extents.z, 0.0);
    }

    #[test]
    fn test_blob_is_toppled_and_anchored() {
        let boundary = vec![
            GeoCoordinate::new(30.679, -97.679).unwrap(),
            GeoCoordinate::new(30.499, -97.969).unwrap(),
            GeoCoordinate::new(30.921, -97.541).unwrap(),
        ];
        let kind = GeometryKind::Blob(BlobShape::new(boundary, Some(300.0), 5_556.0));
        let g = build_geometry(&kind).unwrap();

        assert_eq!(g.anchor.unwrap().altitude(), Some(300.0));
        assert_relative_eq!(g.extents.y, 5_556.0, epsilon = 1e-6);
        assert!(g.solid.is_some());

        // Extrusion axis maps to scene up
        let up = g.content_rotation * Vector3::z();
        assert_relative_eq!(up.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_blob_with_two_points_fails() {
        let boundary = vec![
            GeoCoordinate::new(30.679, -97.679).unwrap(),
            GeoCoordinate::new(30.499, -97.969).unwrap(),
        ];
        let kind = GeometryKind::Blob(BlobShape::new(boundary, None, 10.0));
        assert!(matches!(build_geometry(&kind), Err(PlacementError::InvalidGeometry(_))));
    }
}
