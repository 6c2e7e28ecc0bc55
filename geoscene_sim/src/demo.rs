//! Demo content: landmarks, nearby shapes and a footprint.
//!
//! Nearby content is scattered around the viewer's starting location with
//! [`GeoProjector::destination`], at distances given in nautical miles.

use geoscene_core::{
    BlobConfig, BlobShape, GeometryKind, GeoProjector, PlacedNode, PlacementResult, ScalingScheme,
};
use geoscene_env::GeoCoordinate;

/// Metres per nautical mile.
pub const NAUTICAL_MILE: f64 = 1852.0;

/// Altitude of the nearby demo shapes (m).
const NEARBY_ALTITUDE: f64 = 300.0;

fn landmark(
    tag: &str,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    kind: GeometryKind,
) -> PlacementResult<PlacedNode> {
    let anchor = GeoCoordinate::with_altitude(latitude, longitude, altitude)?;
    Ok(PlacedNode::billboard(Some(anchor), kind, ScalingScheme::Normal)?.with_tag(tag))
}

fn nearby(origin: &GeoCoordinate, bearing: f64, nautical_miles: f64) -> PlacementResult<GeoCoordinate> {
    let coordinate = GeoProjector::destination(origin, bearing, nautical_miles * NAUTICAL_MILE)?;
    Ok(coordinate.at_altitude(Some(NEARBY_ALTITUDE)))
}

/// Far landmarks plus shapes placed relative to `origin`.
pub fn build_demo_data(origin: &GeoCoordinate, blob: &BlobConfig) -> PlacementResult<Vec<PlacedNode>> {
    let marker = GeometryKind::Image { width_px: 240, height_px: 60 };
    let pin = GeometryKind::Image { width_px: 64, height_px: 64 };
    let nmi = NAUTICAL_MILE;

    let mut nodes = vec![
        landmark("Apple Park", 37.334807, -122.009076, 100.0, marker.clone())?,
        landmark("The Alamo", 29.4259671, -98.4861419, 300.0, marker)?,
        landmark(
            "Pike's Peak",
            38.8405322,
            -105.0442048,
            4705.0,
            GeometryKind::Layer { width_px: 240, height_px: 60 },
        )?,
        landmark("Space Needle", 47.6205, -122.3493, 225.0, pin.clone())?,
        landmark("Empire State Building", 40.7484, -73.9857, 14.3, pin.clone())?,
        landmark("Canary Wharf", 51.504607, -0.019592, 236.0, pin)?,
    ];

    let boxes = GeometryKind::Image { width_px: 128, height_px: 128 };
    nodes.push(
        PlacedNode::billboard(Some(nearby(origin, 280.0, 300.0)?), boxes.clone(), ScalingScheme::Normal)?
            .with_tag("Nearby Image One"),
    );
    nodes.push(
        PlacedNode::billboard(Some(nearby(origin, 300.0, 3.0)?), boxes, ScalingScheme::Normal)?
            .with_tag("Nearby Image Two"),
    );

    nodes.push(
        PlacedNode::volumetric(Some(nearby(origin, 20.0, 6.0)?), GeometryKind::Sphere { radius: nmi })?
            .with_tag("Green Sphere"),
    );
    nodes.push(
        PlacedNode::volumetric(
            Some(nearby(origin, 340.0, 6.0)?),
            GeometryKind::Torus {
                ring_radius: nmi,
                pipe_radius: 0.25 * nmi,
            },
        )?
        .with_tag("Yellow Torus"),
    );
    nodes.push(
        PlacedNode::volumetric(
            Some(nearby(origin, 10.0, 6.0)?),
            GeometryKind::Cylinder { radius: nmi, height: nmi },
        )?
        .with_tag("Brown Cylinder"),
    );
    nodes.push(
        PlacedNode::volumetric(
            Some(nearby(origin, 30.0, 5.0)?),
            GeometryKind::Box { width: nmi, height: nmi, length: nmi },
        )?
        .with_tag("Red Box"),
    );
    nodes.push(
        PlacedNode::volumetric(
            Some(nearby(origin, 40.0, 5.0)?),
            GeometryKind::Text {
                text: "Hello World".to_string(),
                size: 1000.0,
                extrusion_depth: 10.0,
            },
        )?
        .with_tag("Purple Text"),
    );

    let footprint = vec![
        GeoCoordinate::new(30.679, -97.679)?,
        GeoCoordinate::new(30.499, -97.969)?,
        GeoCoordinate::new(30.921, -97.541)?,
    ];
    let shape = BlobShape::new(footprint, Some(NEARBY_ALTITUDE), 3.0 * nmi);
    nodes.push(PlacedNode::blob(shape, blob)?.with_tag("Cyan Blob"));

    Ok(nodes)
}

/// Small markers along a walk, within the far-field distance.
///
/// One marker every `spacing` metres along `bearing`, offset sideways so the
/// viewer passes them.
pub fn build_walkway_markers(
    origin: &GeoCoordinate,
    bearing: f64,
    count: usize,
    spacing: f64,
) -> PlacementResult<Vec<PlacedNode>> {
    (1..=count)
        .map(|i| -> PlacementResult<PlacedNode> {
            let along = GeoProjector::destination(origin, bearing, i as f64 * spacing)?;
            let side = if i % 2 == 0 { 90.0 } else { -90.0 };
            let anchor = GeoProjector::destination(&along, bearing + side, 5.0)?;
            Ok(PlacedNode::billboard(
                Some(anchor),
                GeometryKind::Image { width_px: 32, height_px: 32 },
                ScalingScheme::LinearBuffer { threshold: 150.0, buffer: 10.0 },
            )?
            .with_tag(format!("Marker {i}")))
        })
        .collect()
}
