//! Route polylines as placeable nodes.
//!
//! A route through `n` coordinates becomes `n` torus joints, one per point,
//! and up to `n - 1` box segments. Each segment is anchored at the geodesic
//! midpoint of its ends, is as long as the distance between them, and is
//! yawed so its length axis follows the travel bearing.

use crate::error::{PlacementError, PlacementResult};
use crate::geometry::GeometryKind;
use crate::node::PlacedNode;
use crate::projector::GeoProjector;
use geoscene_env::GeoCoordinate;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

const METERS_PER_NAUTICAL_MILE: f64 = 1852.0;

/// Sizes of the route geometry (m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteStyle {
    /// Ring radius of each joint torus (default: 0.005 nmi)
    pub joint_ring_radius: f64,

    /// Pipe radius of each joint torus (default: a third of the ring)
    pub joint_pipe_radius: f64,

    pub segment_width: f64,
    pub segment_height: f64,
}

impl Default for RouteStyle {
    fn default() -> Self {
        let ring = 0.005 * METERS_PER_NAUTICAL_MILE;
        Self {
            joint_ring_radius: ring,
            joint_pipe_radius: ring / 3.0,
            segment_width: 10.0,
            segment_height: 10.0,
        }
    }
}

/// Nodes making up a placed route.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// One torus per route point, in route order
    pub joints: Vec<PlacedNode>,

    /// One box per non-degenerate leg, in route order
    pub segments: Vec<PlacedNode>,
}

impl Route {
    /// Joints first, then segments, ready for registration.
    pub fn into_nodes(self) -> Vec<PlacedNode> {
        let mut nodes = self.joints;
        nodes.extend(self.segments);
        nodes
    }
}

/// Builds the joints and segments of a route through `points`.
///
/// `altitude` overrides every point's altitude, so the whole route is drawn
/// at one height. Consecutive coincident points get a joint but no segment.
///
/// # Errors
/// `InvalidGeometry` for fewer than two points or non-positive sizes.
pub fn build_route(
    points: &[GeoCoordinate],
    altitude: Option<f64>,
    style: &RouteStyle,
) -> PlacementResult<Route> {
    if points.len() < 2 {
        return Err(PlacementError::geometry(format!(
            "route needs at least 2 points, got {}",
            points.len()
        )));
    }
    if altitude.is_some_and(|a| !a.is_finite()) {
        return Err(PlacementError::geometry("route altitude is not finite"));
    }

    let points: Vec<GeoCoordinate> = points
        .iter()
        .map(|p| match altitude {
            Some(_) => p.at_altitude(altitude),
            None => *p,
        })
        .collect();

    let joints = points
        .iter()
        .map(|p| {
            PlacedNode::volumetric(
                Some(*p),
                GeometryKind::Torus {
                    ring_radius: style.joint_ring_radius,
                    pipe_radius: style.joint_pipe_radius,
                },
            )
        })
        .collect::<PlacementResult<Vec<_>>>()?;

    let mut segments = Vec::with_capacity(points.len() - 1);
    for leg in points.windows(2) {
        let (from, to) = (&leg[0], &leg[1]);
        let length = GeoProjector::distance(from, to);
        if length <= 0.0 {
            continue;
        }
        let mut segment = PlacedNode::volumetric(
            Some(GeoProjector::midpoint(from, to)?),
            GeometryKind::Box {
                width: style.segment_width,
                height: style.segment_height,
                length,
            },
        )?;
        // Box length runs along z; north is scene -z, so the compass
        // bearing becomes a negative turn about +y
        let bearing = GeoProjector::bearing(from, to);
        segment.transform.rotation =
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -bearing.to_radians());
        segments.push(segment);
    }

    debug!("Route built: {} joints, {} segments", joints.len(), segments.len());
    Ok(Route { joints, segments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::placement::UpdateOutcome;
    use approx::assert_relative_eq;
    use geoscene_env::ReferenceFrame;

    fn start() -> GeoCoordinate {
        GeoCoordinate::new(51.5055, -0.0754).unwrap()
    }

    fn walk() -> Vec<GeoCoordinate> {
        let a = start();
        let b = GeoProjector::destination(&a, 90.0, 200.0).unwrap();
        let c = GeoProjector::destination(&b, 0.0, 120.0).unwrap();
        vec![a, b, c]
    }

    #[test]
    fn test_rejects_single_point() {
        let result = build_route(&[start()], None, &RouteStyle::default());
        assert!(matches!(result, Err(PlacementError::InvalidGeometry(_))));
        assert!(build_route(&[], None, &RouteStyle::default()).is_err());
    }

    #[test]
    fn test_joint_and_segment_counts() {
        let route = build_route(&walk(), None, &RouteStyle::default()).unwrap();
        assert_eq!(route.joints.len(), 3);
        assert_eq!(route.segments.len(), 2);
        assert!(route
            .joints
            .iter()
            .all(|j| matches!(j.kind, GeometryKind::Torus { .. })));
        assert_eq!(route.into_nodes().len(), 5);
    }

    #[test]
    fn test_default_joint_size() {
        let style = RouteStyle::default();
        assert_relative_eq!(style.joint_ring_radius, 9.26, epsilon = 1e-9);
        assert_relative_eq!(style.joint_pipe_radius * 3.0, style.joint_ring_radius, epsilon = 1e-9);
    }

    #[test]
    fn test_segment_spans_its_leg() {
        let points = walk();
        let route = build_route(&points, None, &RouteStyle::default()).unwrap();

        for (segment, leg) in route.segments.iter().zip(points.windows(2)) {
            let GeometryKind::Box { length, width, .. } = segment.kind else {
                panic!("segment is not a box");
            };
            assert_relative_eq!(length, GeoProjector::distance(&leg[0], &leg[1]), epsilon = 1e-9);
            assert_eq!(width, 10.0);

            let mid = segment.anchor.unwrap();
            assert_relative_eq!(
                GeoProjector::distance(&leg[0], &mid),
                GeoProjector::distance(&mid, &leg[1]),
                epsilon = 1e-3
            );
        }
    }

    #[test]
    fn test_segment_yaw_follows_bearing() {
        let route = build_route(&walk(), None, &RouteStyle::default()).unwrap();
        let ahead = Vector3::new(0.0, 0.0, -1.0);

        // Eastbound leg: box length axis turns from north (-z) to east (+x)
        let east = route.segments[0].transform.rotation * ahead;
        assert_relative_eq!(east, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-2);

        // Northbound leg stays on -z
        let north = route.segments[1].transform.rotation * ahead;
        assert_relative_eq!(north, ahead, epsilon = 1e-2);
    }

    #[test]
    fn test_altitude_override_and_duplicate_points() {
        let a = start();
        let b = GeoProjector::destination(&a, 45.0, 50.0).unwrap();
        let route = build_route(&[a, a, b], Some(12.0), &RouteStyle::default()).unwrap();

        assert_eq!(route.joints.len(), 3);
        assert_eq!(route.segments.len(), 1);
        assert!(route.joints.iter().all(|j| j.anchor.unwrap().altitude() == Some(12.0)));
        assert_eq!(route.segments[0].anchor.unwrap().altitude(), Some(12.0));

        assert!(build_route(&[a, b], Some(f64::NAN), &RouteStyle::default()).is_err());
    }

    #[test]
    fn test_segment_sits_between_joints_in_scene() {
        let config = EngineConfig::default();
        let frame = ReferenceFrame::at(Vector3::new(3.0, 0.0, -4.0), start());
        let route = build_route(&walk(), None, &RouteStyle::default()).unwrap();
        let mut nodes = route.into_nodes();

        for node in nodes.iter_mut() {
            assert_eq!(node.update(&frame, true, &config, |_| {}), UpdateOutcome::Updated);
        }

        // Joints 0 and 1 bracket segment 0 (index 3)
        let expected = (nodes[0].transform.position + nodes[1].transform.position) / 2.0;
        assert_relative_eq!(nodes[3].transform.position, expected, epsilon = 0.05);

        // Placement keeps the segment yaw
        let east = nodes[3].transform.rotation * Vector3::new(0.0, 0.0, -1.0);
        assert!(east.x > 0.99);
    }
}
