//! The "PROJECTION" Engine - Geographic ↔ scene-local mapping
//!
//! Converts WGS84 coordinates into offsets in the tracking engine's local
//! Euclidean frame and back. Distances and bearings are geodesic (Karney,
//! via `geo`), but the mapping into the scene is locally flat: an anchor is
//! placed at `(distance, bearing)` from the reference on a tangent plane.
//! That is accurate at the scale of tens of kilometers; there is no
//! great-circle-aware fallback beyond that.
//!
//! Scene convention: `+x` east, `+y` up, `-z` north, with the horizontal
//! axes rotated by the frame's `scene_heading_offset`.

use crate::error::{PlacementError, PlacementResult};
use geo::{GeodesicBearing, GeodesicDestination, GeodesicDistance, Point};
use geoscene_env::{GeoCoordinate, LocalPosition, ReferenceFrame};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// East/north/up offset between two coordinates, in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationTranslation {
    pub east: f64,
    pub north: f64,
    /// Altitude difference; 0 when either altitude is unknown
    pub up: f64,
}

impl LocationTranslation {
    /// Horizontal length of the offset.
    pub fn horizontal(&self) -> f64 {
        self.east.hypot(self.north)
    }
}

/// Stateless geographic projector.
pub struct GeoProjector;

impl GeoProjector {
    /// Geodesic surface distance in meters, ignoring altitude.
    pub fn surface_distance(a: &GeoCoordinate, b: &GeoCoordinate) -> f64 {
        if a.same_position(b) {
            return 0.0;
        }
        to_point(a).geodesic_distance(&to_point(b))
    }

    /// Distance in meters between two coordinates.
    ///
    /// Blends in the vertical displacement when both altitudes are known.
    pub fn distance(a: &GeoCoordinate, b: &GeoCoordinate) -> f64 {
        let surface = Self::surface_distance(a, b);
        match (a.altitude(), b.altitude()) {
            (Some(alt_a), Some(alt_b)) => surface.hypot(alt_b - alt_a),
            _ => surface,
        }
    }

    /// Initial compass bearing from `a` to `b`, in [0, 360).
    ///
    /// Defined as 0 when the two coordinates coincide.
    pub fn bearing(a: &GeoCoordinate, b: &GeoCoordinate) -> f64 {
        if a.same_position(b) {
            return 0.0;
        }
        normalize_degrees(to_point(a).geodesic_bearing(to_point(b)))
    }

    /// The coordinate reached by travelling `distance` meters from `origin`
    /// along the initial `bearing` (degrees). Keeps the origin's altitude.
    pub fn destination(
        origin: &GeoCoordinate,
        bearing: f64,
        distance: f64,
    ) -> PlacementResult<GeoCoordinate> {
        if !bearing.is_finite() || !distance.is_finite() {
            return Err(PlacementError::geometry(format!(
                "destination needs finite bearing/distance, got {bearing}/{distance}"
            )));
        }
        if distance == 0.0 {
            return Ok(*origin);
        }
        let p = to_point(origin).geodesic_destination(bearing, distance);
        Ok(GeoCoordinate::wrapped(p.y(), p.x(), origin.altitude())?)
    }

    /// Geodesic midpoint of `a` and `b`; altitude averaged when both known.
    pub fn midpoint(a: &GeoCoordinate, b: &GeoCoordinate) -> PlacementResult<GeoCoordinate> {
        let half = Self::surface_distance(a, b) / 2.0;
        let mid = Self::destination(a, Self::bearing(a, b), half)?;
        let altitude = match (a.altitude(), b.altitude()) {
            (Some(x), Some(y)) => Some((x + y) / 2.0),
            _ => None,
        };
        Ok(mid.at_altitude(altitude))
    }

    /// East/north/up offset from `from` to `to`.
    pub fn translation(from: &GeoCoordinate, to: &GeoCoordinate) -> LocationTranslation {
        let distance = Self::surface_distance(from, to);
        let up = match (from.altitude(), to.altitude()) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        };
        if distance == 0.0 {
            return LocationTranslation { east: 0.0, north: 0.0, up };
        }
        let bearing = Self::bearing(from, to).to_radians();
        LocationTranslation {
            east: distance * bearing.sin(),
            north: distance * bearing.cos(),
            up,
        }
    }

    /// Applies a translation to `origin` (inverse of [`Self::translation`]).
    pub fn translated(
        origin: &GeoCoordinate,
        translation: &LocationTranslation,
    ) -> PlacementResult<GeoCoordinate> {
        let horizontal = translation.horizontal();
        let altitude = origin.altitude().map(|a| a + translation.up);
        if horizontal == 0.0 {
            return Ok(origin.at_altitude(altitude));
        }
        let bearing = normalize_degrees(translation.east.atan2(translation.north).to_degrees());
        let moved = Self::destination(origin, bearing, horizontal)?;
        Ok(moved.at_altitude(altitude))
    }

    /// Projects `anchor` into the scene-local frame of `frame`.
    ///
    /// # Errors
    /// `MissingReferenceData` if the frame has no local position or no geo
    /// location yet.
    pub fn project(anchor: &GeoCoordinate, frame: &ReferenceFrame) -> PlacementResult<LocalPosition> {
        let origin = frame
            .current_local_position
            .ok_or(PlacementError::MissingReferenceData("current local position"))?;
        let reference = frame
            .current_geo_location
            .ok_or(PlacementError::MissingReferenceData("current geo location"))?;

        let translation = Self::translation(&reference, anchor);
        Ok(origin + to_scene(&translation, frame.scene_heading_offset))
    }

    /// Maps a scene-local position back to a geographic coordinate.
    pub fn unproject(position: &LocalPosition, frame: &ReferenceFrame) -> PlacementResult<GeoCoordinate> {
        let origin = frame
            .current_local_position
            .ok_or(PlacementError::MissingReferenceData("current local position"))?;
        let reference = frame
            .current_geo_location
            .ok_or(PlacementError::MissingReferenceData("current geo location"))?;

        let translation = from_scene(&(position - origin), frame.scene_heading_offset);
        Self::translated(&reference, &translation)
    }
}

/// Rotates an east/north/up offset into scene axes.
fn to_scene(t: &LocationTranslation, heading_offset: f64) -> Vector3<f64> {
    let (sin_o, cos_o) = heading_offset.to_radians().sin_cos();
    let scene_east = t.east * cos_o - t.north * sin_o;
    let scene_north = t.north * cos_o + t.east * sin_o;
    Vector3::new(scene_east, t.up, -scene_north)
}

fn from_scene(delta: &Vector3<f64>, heading_offset: f64) -> LocationTranslation {
    let (sin_o, cos_o) = heading_offset.to_radians().sin_cos();
    let scene_east = delta.x;
    let scene_north = -delta.z;
    LocationTranslation {
        east: scene_east * cos_o + scene_north * sin_o,
        north: scene_north * cos_o - scene_east * sin_o,
        up: delta.y,
    }
}

/// Normalizes an angle in degrees into [0, 360).
pub fn normalize_degrees(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

fn to_point(c: &GeoCoordinate) -> Point<f64> {
    Point::new(c.longitude(), c.latitude())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn coord(lat: f64, lon: f64) -> GeoCoordinate {
        GeoCoordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let a = coord(0.0, 0.0);
        let b = coord(1.0, 0.0);
        // WGS84 meridian arc for the first degree
        assert_relative_eq!(GeoProjector::distance(&a, &b), 110_574.4, epsilon = 1.0);
    }

    #[test]
    fn test_distance_blends_altitude_only_when_both_known() {
        let a = GeoCoordinate::with_altitude(30.0, -97.0, 0.0).unwrap();
        let b = GeoProjector::destination(&a, 90.0, 400.0).unwrap().at_altitude(Some(300.0));

        assert_relative_eq!(GeoProjector::distance(&a, &b), 500.0, epsilon = 1e-3);

        let no_alt = b.at_altitude(None);
        assert_relative_eq!(GeoProjector::distance(&a, &no_alt), 400.0, epsilon = 1e-3);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = coord(10.0, 10.0);
        assert_relative_eq!(GeoProjector::bearing(&origin, &coord(11.0, 10.0)), 0.0, epsilon = 1e-9);
        assert_relative_eq!(GeoProjector::bearing(&origin, &coord(9.0, 10.0)), 180.0, epsilon = 1e-9);

        let east = GeoProjector::bearing(&origin, &coord(10.0, 10.01));
        assert!((east - 90.0).abs() < 0.01);

        let west = GeoProjector::bearing(&origin, &coord(10.0, 9.99));
        assert!((west - 270.0).abs() < 0.01);
    }

    #[test]
    fn test_bearing_same_point_is_zero() {
        let a = coord(51.504607, -0.019592);
        assert_eq!(GeoProjector::bearing(&a, &a), 0.0);
        assert_eq!(GeoProjector::distance(&a, &a), 0.0);
    }

    #[test]
    fn test_destination_round_trip() {
        let a = coord(30.679, -97.679);
        let b = coord(30.921, -97.541);

        let there = GeoProjector::destination(
            &a,
            GeoProjector::bearing(&a, &b),
            GeoProjector::distance(&a, &b),
        )
        .unwrap();

        assert!(GeoProjector::distance(&there, &b) < 0.01);
    }

    #[test]
    fn test_destination_rejects_nan() {
        let a = coord(0.0, 0.0);
        assert!(GeoProjector::destination(&a, f64::NAN, 10.0).is_err());
    }

    #[test]
    fn test_midpoint_is_equidistant() {
        let a = GeoCoordinate::with_altitude(40.7484, -73.9857, 10.0).unwrap();
        let b = GeoCoordinate::with_altitude(40.7584, -73.9757, 30.0).unwrap();
        let mid = GeoProjector::midpoint(&a, &b).unwrap();

        let da = GeoProjector::surface_distance(&a, &mid);
        let db = GeoProjector::surface_distance(&mid, &b);
        assert_relative_eq!(da, db, epsilon = 0.01);
        assert_eq!(mid.altitude(), Some(20.0));
    }

    #[test]
    fn test_translation_round_trip() {
        let origin = GeoCoordinate::with_altitude(47.6205, -122.3493, 10.0).unwrap();
        let t = LocationTranslation { east: 120.0, north: -45.0, up: 3.0 };

        let moved = GeoProjector::translated(&origin, &t).unwrap();
        let back = GeoProjector::translation(&origin, &moved);

        assert_relative_eq!(back.east, 120.0, epsilon = 1e-3);
        assert_relative_eq!(back.north, -45.0, epsilon = 1e-3);
        assert_relative_eq!(back.up, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_project_north_maps_to_negative_z() {
        let reference = coord(10.0, 10.0);
        let anchor = GeoProjector::destination(&reference, 0.0, 100.0).unwrap();
        let frame = ReferenceFrame::at(Vector3::new(5.0, 1.5, -2.0), reference);

        let p = GeoProjector::project(&anchor, &frame).unwrap();

        assert_relative_eq!(p.x, 5.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 1.5, epsilon = 1e-9);
        assert_relative_eq!(p.z, -102.0, epsilon = 1e-6);
    }

    #[test]
    fn test_project_heading_offset_rotates_horizontal_axes() {
        let reference = coord(10.0, 10.0);
        let anchor = GeoProjector::destination(&reference, 90.0, 50.0).unwrap();

        // Scene -z points due east: an eastern anchor lands straight ahead
        let frame = ReferenceFrame::at(Vector3::zeros(), reference).with_heading_offset(90.0);
        let p = GeoProjector::project(&anchor, &frame).unwrap();

        assert_relative_eq!(p.x, 0.0, epsilon = 1e-3);
        assert_relative_eq!(p.z, -50.0, epsilon = 1e-3);
    }

    #[test]
    fn test_project_vertical_offset() {
        let reference = GeoCoordinate::with_altitude(10.0, 10.0, 20.0).unwrap();
        let anchor = GeoCoordinate::with_altitude(10.0, 10.0, 120.0).unwrap();
        let frame = ReferenceFrame::at(Vector3::new(0.0, 1.0, 0.0), reference);

        let p = GeoProjector::project(&anchor, &frame).unwrap();
        assert_relative_eq!(p.y, 101.0, epsilon = 1e-9);

        // Unknown reference altitude: no vertical correction
        let frame = ReferenceFrame::at(Vector3::new(0.0, 1.0, 0.0), reference.at_altitude(None));
        let p = GeoProjector::project(&anchor, &frame).unwrap();
        assert_eq!(p.y, 1.0);
    }

    #[test]
    fn test_project_zero_distance_returns_origin() {
        let reference = coord(29.4259671, -98.4861419);
        let origin = Vector3::new(3.0, 4.0, 5.0);
        let frame = ReferenceFrame::at(origin, reference);

        assert_eq!(GeoProjector::project(&reference, &frame).unwrap(), origin);
    }

    #[test]
    fn test_project_missing_reference() {
        let anchor = coord(0.0, 0.0);
        let frame = ReferenceFrame::default();

        let err = GeoProjector::project(&anchor, &frame).unwrap_err();
        assert!(err.is_deferred());
    }

    #[test]
    fn test_project_apple_park_scenario() {
        let anchor = GeoCoordinate::with_altitude(37.334807, -122.009076, 100.0).unwrap();
        let reference = coord(37.3314, -122.0312);
        let frame = ReferenceFrame::at(Vector3::zeros(), reference);

        let p = GeoProjector::project(&anchor, &frame).unwrap();
        let horizontal = p.x.hypot(p.z);
        let distance = GeoProjector::distance(&anchor, &reference);

        assert_relative_eq!(horizontal, distance, epsilon = 1e-6);
        assert!(distance > 1_500.0 && distance < 3_000.0);

        // East of north, closer to east than to north
        assert!(p.x > 0.0 && p.z < 0.0);
        let bearing = normalize_degrees(p.x.atan2(-p.z).to_degrees());
        assert!(bearing > 45.0 && bearing < 100.0, "bearing {bearing}");

        // Reference altitude unknown: no vertical correction
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let reference = coord(40.7484, -73.9857);
        let frame = ReferenceFrame::at(Vector3::new(-3.0, 0.0, 7.0), reference).with_heading_offset(33.0);
        let anchor = coord(40.7512, -73.9801);

        let p = GeoProjector::project(&anchor, &frame).unwrap();
        let back = GeoProjector::unproject(&p, &frame).unwrap();

        assert!(GeoProjector::surface_distance(&back, &anchor) < 0.01);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
    }
}
