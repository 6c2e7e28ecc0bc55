//! The "BLOB" Builder - Extruded footprints from geographic boundaries
//!
//! A blob is a closed footprint given as an ordered ring of geographic
//! points. The ring is flattened around its centroid by bearing/distance
//! projection, then extruded upward into a prism:
//! 1. Centroid (arithmetic mean of latitudes and longitudes) as the anchor
//! 2. Planar path: `x = d·cos(90° − b)`, `y = d·sin(90° − b)` per point
//! 3. Closed edge loop (last point joins the first)
//! 4. Extrusion to `height`, toppled into scene orientation

use crate::config::BlobConfig;
use crate::error::{PlacementError, PlacementResult};
use crate::projector::GeoProjector;
use geoscene_env::GeoCoordinate;
use nalgebra::{UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Rings with area at or below this fraction of `extent²` count as flat.
const MIN_AREA_RATIO: f64 = 1e-9;

/// Input description of a blob: boundary ring, floor altitude and height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobShape {
    /// Ordered boundary, not closed (the first point is not repeated)
    pub boundary: Vec<GeoCoordinate>,

    /// Altitude of the footprint floor (m)
    pub floor: Option<f64>,

    /// Extrusion height (m)
    pub height: f64,
}

impl BlobShape {
    pub fn new(boundary: Vec<GeoCoordinate>, floor: Option<f64>, height: f64) -> Self {
        Self { boundary, floor, height }
    }
}

/// Arithmetic mean of the boundary's latitudes and longitudes, at `floor`.
///
/// # Errors
/// `InvalidGeometry` for an empty boundary or a non-finite floor.
pub fn centroid(points: &[GeoCoordinate], floor: Option<f64>) -> PlacementResult<GeoCoordinate> {
    if points.is_empty() {
        return Err(PlacementError::geometry("centroid of an empty boundary"));
    }
    if floor.is_some_and(|f| !f.is_finite()) {
        return Err(PlacementError::geometry(format!("floor {floor:?} is not finite")));
    }
    let n = points.len() as f64;
    let latitude = points.iter().map(GeoCoordinate::latitude).sum::<f64>() / n;
    let longitude = points.iter().map(GeoCoordinate::longitude).sum::<f64>() / n;
    Ok(GeoCoordinate::wrapped(latitude, longitude, floor)?)
}

// ============================================================================
// PATH
// ============================================================================

/// A closed planar footprint around its anchor.
///
/// Path coordinates are metres: `+x` east, `+y` north.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobPath {
    anchor: GeoCoordinate,
    vertices: Vec<Vector2<f64>>,
}

impl BlobPath {
    /// The centroid the path is laid out around.
    pub fn anchor(&self) -> &GeoCoordinate {
        &self.anchor
    }

    pub fn vertices(&self) -> &[Vector2<f64>] {
        &self.vertices
    }

    /// Consecutive edges, closed from the last vertex back to the first.
    pub fn edges(&self) -> impl Iterator<Item = (Vector2<f64>, Vector2<f64>)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Enclosed area in m² (shoelace).
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    fn signed_area(&self) -> f64 {
        self.edges().map(|(a, b)| a.x * b.y - b.x * a.y).sum::<f64>() / 2.0
    }

    /// Largest distance between any two vertices (m).
    pub fn footprint_extent(&self) -> f64 {
        let mut extent: f64 = 0.0;
        for (i, a) in self.vertices.iter().enumerate() {
            for b in &self.vertices[i + 1..] {
                extent = extent.max((a - b).norm());
            }
        }
        extent
    }

    /// Extrudes the footprint upward by `height` metres.
    ///
    /// The path plane is rotated −90° about X so path `+y` (north) becomes
    /// scene `-z` and the extrusion axis becomes scene `+y`, then yawed
    /// clockwise by `heading_correction_degrees`.
    pub fn extrude(&self, height: f64, config: &BlobConfig) -> PlacementResult<ExtrudedSolid> {
        if !height.is_finite() || height <= 0.0 {
            return Err(PlacementError::geometry(format!(
                "extrusion height must be positive, got {height}"
            )));
        }
        if !config.heading_correction_degrees.is_finite() {
            return Err(PlacementError::geometry("heading correction is not finite"));
        }

        let topple = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -std::f64::consts::FRAC_PI_2);
        // Compass-clockwise seen from above is a negative turn about +y
        let yaw = UnitQuaternion::from_axis_angle(
            &Vector3::y_axis(),
            -config.heading_correction_degrees.to_radians(),
        );

        let n = self.vertices.len();
        Ok(ExtrudedSolid {
            bottom: self.vertices.iter().map(|v| Vector3::new(v.x, v.y, 0.0)).collect(),
            top: self.vertices.iter().map(|v| Vector3::new(v.x, v.y, height)).collect(),
            sides: (0..n).map(|i| [i, (i + 1) % n]).collect(),
            height,
            orientation: yaw * topple,
        })
    }
}

/// Builds [`BlobPath`]s from geographic boundaries.
#[derive(Debug, Clone, Default)]
pub struct BlobPathBuilder {
    config: BlobConfig,
}

impl BlobPathBuilder {
    pub fn new(config: BlobConfig) -> Self {
        Self { config }
    }

    /// Flattens `boundary` around its centroid.
    ///
    /// # Errors
    /// `InvalidGeometry` for fewer than 3 points or a zero-area ring.
    pub fn build(&self, boundary: &[GeoCoordinate], floor: Option<f64>) -> PlacementResult<BlobPath> {
        if boundary.len() < 3 {
            return Err(PlacementError::geometry(format!(
                "blob boundary needs at least 3 points, got {}",
                boundary.len()
            )));
        }

        let anchor = centroid(boundary, floor)?;
        let vertices = boundary
            .iter()
            .map(|p| {
                let d = GeoProjector::surface_distance(&anchor, p);
                let b = GeoProjector::bearing(&anchor, p);
                let theta = (90.0 - b).to_radians();
                Vector2::new(d * theta.cos(), d * theta.sin())
            })
            .collect();

        let path = BlobPath { anchor, vertices };
        let extent = path.footprint_extent();
        let area = path.area();
        if !(area > MIN_AREA_RATIO * extent * extent) {
            return Err(PlacementError::geometry(format!(
                "blob boundary encloses no area ({area:.3e} m² over {extent:.0} m)"
            )));
        }

        if extent > self.config.max_flat_extent {
            warn!(
                "Blob footprint at {} spans {:.0} m (> {:.0} m), flat projection may distort it",
                anchor, extent, self.config.max_flat_extent
            );
        }
        Ok(path)
    }

    /// Builds the path for `shape` and extrudes it.
    pub fn build_solid(&self, shape: &BlobShape) -> PlacementResult<(BlobPath, ExtrudedSolid)> {
        let path = self.build(&shape.boundary, shape.floor)?;
        let solid = path.extrude(shape.height, &self.config)?;
        Ok((path, solid))
    }
}

// ============================================================================
// SOLID
// ============================================================================

/// A prism over a blob footprint.
///
/// Rings are stored in path space (`z` = extrusion); `orientation` maps path
/// space into the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrudedSolid {
    pub bottom: Vec<Vector3<f64>>,
    pub top: Vec<Vector3<f64>>,
    /// Side quads as vertex index pairs `[i, j]`: bottom i, bottom j, top j, top i
    pub sides: Vec<[usize; 2]>,
    pub height: f64,
    pub orientation: UnitQuaternion<f64>,
}

impl ExtrudedSolid {
    /// Bottom and top rings rotated into scene orientation.
    pub fn scene_vertices(&self) -> Vec<Vector3<f64>> {
        self.bottom
            .iter()
            .chain(&self.top)
            .map(|v| self.orientation * v)
            .collect()
    }

    /// Axis-aligned scene extents `(x, y, z)`.
    pub fn scene_extents(&self) -> Vector3<f64> {
        let vertices = self.scene_vertices();
        let mut min = Vector3::repeat(f64::INFINITY);
        let mut max = Vector3::repeat(f64::NEG_INFINITY);
        for v in &vertices {
            min = min.inf(v);
            max = max.sup(v);
        }
        if vertices.is_empty() {
            Vector3::zeros()
        } else {
            max - min
        }
    }
}
