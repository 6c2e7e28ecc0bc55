//! Property tests for projection and scaling.

use geoscene_core::{GeoCoordinate, GeoProjector, ReferenceFrame, ScalingScheme};
use nalgebra::Vector3;
use proptest::prelude::*;

fn coordinate() -> impl Strategy<Value = GeoCoordinate> {
    (-80.0f64..80.0, -179.0f64..179.0).prop_map(|(lat, lon)| GeoCoordinate::new(lat, lon).unwrap())
}

/// Two coordinates a short hop apart, away from the poles.
fn nearby_pair() -> impl Strategy<Value = (GeoCoordinate, GeoCoordinate)> {
    (-60.0f64..60.0, -170.0f64..170.0, -0.05f64..0.05, -0.05f64..0.05).prop_map(|(lat, lon, dlat, dlon)| {
        (
            GeoCoordinate::new(lat, lon).unwrap(),
            GeoCoordinate::new(lat + dlat, lon + dlon).unwrap(),
        )
    })
}

fn scheme() -> impl Strategy<Value = ScalingScheme> {
    prop_oneof![
        Just(ScalingScheme::Fixed),
        Just(ScalingScheme::Normal),
        (0.0f64..500.0, -2.0f64..5.0).prop_map(|(threshold, scale)| ScalingScheme::Tiered { threshold, scale }),
        (0.0f64..100.0, 0.1f64..3.0, 100.0f64..500.0, -1.0f64..3.0).prop_map(|(t1, s1, t2, s2)| {
            ScalingScheme::DoubleTiered {
                first_threshold: t1,
                first_scale: s1,
                second_threshold: t2,
                second_scale: s2,
            }
        }),
        (-200.0f64..200.0).prop_map(|threshold| ScalingScheme::Linear { threshold }),
        (1.0f64..200.0, 0.0f64..50.0).prop_map(|(threshold, buffer)| ScalingScheme::LinearBuffer { threshold, buffer }),
    ]
}

proptest! {
    #[test]
    fn distance_is_symmetric(a in coordinate(), b in coordinate()) {
        let ab = GeoProjector::distance(&a, &b);
        let ba = GeoProjector::distance(&b, &a);
        prop_assert!((ab - ba).abs() <= 1e-6 * ab.max(1.0));
        prop_assert_eq!(GeoProjector::distance(&a, &a), 0.0);
    }

    #[test]
    fn bearing_reverses_at_short_range((a, b) in nearby_pair()) {
        prop_assume!(GeoProjector::distance(&a, &b) > 1.0);
        let forward = GeoProjector::bearing(&a, &b);
        let back = GeoProjector::bearing(&b, &a);
        let diff = (forward - back).rem_euclid(360.0);
        prop_assert!((diff - 180.0).abs() < 0.1, "forward {} back {}", forward, back);
    }

    #[test]
    fn destination_round_trips(a in coordinate(), bearing in 0.0f64..360.0, distance in 0.0f64..1_000_000.0) {
        let b = GeoProjector::destination(&a, bearing, distance).unwrap();
        let there = GeoProjector::destination(
            &a,
            GeoProjector::bearing(&a, &b),
            GeoProjector::distance(&a, &b),
        ).unwrap();
        prop_assert!(GeoProjector::distance(&there, &b) < 1.0);
    }

    #[test]
    fn project_is_idempotent(
        (reference, anchor) in nearby_pair(),
        x in -100.0f64..100.0,
        z in -100.0f64..100.0,
        offset in 0.0f64..360.0,
    ) {
        let frame = ReferenceFrame::at(Vector3::new(x, 1.6, z), reference).with_heading_offset(offset);
        let first = GeoProjector::project(&anchor, &frame).unwrap();
        let second = GeoProjector::project(&anchor, &frame).unwrap();
        prop_assert_eq!(first, second);

        // Horizontal offset length is the surface distance whatever the heading offset
        let horizontal = (first.x - x).hypot(first.z - z);
        let distance = GeoProjector::surface_distance(&reference, &anchor);
        prop_assert!((horizontal - distance).abs() < 1e-6 * distance.max(1.0));
    }

    #[test]
    fn schemes_are_strictly_positive(s in scheme(), distance in 0.0f64..50_000.0, adjusted in 0.0f64..100.0) {
        let value = s.scale(distance, adjusted);
        prop_assert!(value > 0.0 && value.is_finite());
    }

    #[test]
    fn normal_is_monotonic_in_adjusted(distance in 0.0f64..10_000.0, a in 0.0f64..100.0, b in 0.0f64..100.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(ScalingScheme::Normal.scale(distance, lo) <= ScalingScheme::Normal.scale(distance, hi));
    }
}
