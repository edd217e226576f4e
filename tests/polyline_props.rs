//! Decode is a left inverse of encode at every supported precision.

use jeepney_router::polyline::{decode, encode};
use proptest::prelude::*;

fn coordinates(precision: u32) -> impl Strategy<Value = Vec<(f64, f64)>> {
    let scale = 10i64.pow(precision);
    prop::collection::vec(
        (-90 * scale..=90 * scale, -180 * scale..=180 * scale),
        0..50,
    )
    .prop_map(move |raw| {
        raw.into_iter()
            .map(|(lat, lng)| (lat as f64 / scale as f64, lng as f64 / scale as f64))
            .collect()
    })
}

fn roundtrip(points: &[(f64, f64)], precision: u32) {
    let decoded = decode(&encode(points, precision), precision).unwrap();
    let tolerance = 10f64.powi(-(precision as i32));
    assert_eq!(decoded.len(), points.len());
    for (got, want) in decoded.points().iter().zip(points) {
        assert!((got.0 - want.0).abs() < tolerance, "lat {} vs {}", got.0, want.0);
        assert!((got.1 - want.1).abs() < tolerance, "lng {} vs {}", got.1, want.1);
    }
}

proptest! {
    #[test]
    fn decode_inverts_encode_precision_5(points in coordinates(5)) {
        roundtrip(&points, 5);
    }

    #[test]
    fn decode_inverts_encode_precision_6(points in coordinates(6)) {
        roundtrip(&points, 6);
    }
}
