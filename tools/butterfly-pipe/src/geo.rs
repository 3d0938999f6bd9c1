//! Distances on the sphere and Hilbert ordering for graph vertices

use geo::HaversineDistance;
use geo::Point;

/// Cells per side of the Hilbert grid (2^16)
const HILBERT_SIDE: u64 = 1 << 16;

pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let p1 = Point::new(lon1, lat1);
    let p2 = Point::new(lon2, lat2);
    p1.haversine_distance(&p2)
}

/// Length of a polyline of (lat, lon) points in metres
pub fn polyline_length(points: &[(f64, f64)]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(w[0].0, w[0].1, w[1].0, w[1].1))
        .sum()
}

/// Position of a coordinate along a Hilbert curve covering the whole globe.
///
/// Nearby coordinates get nearby indices, which keeps graph vertices that are
/// close on the map close in memory.
pub fn hilbert_index(lat: f64, lon: f64) -> u64 {
    let scale = |v: f64, min: f64, span: f64| -> u64 {
        let cell = ((v - min) / span * HILBERT_SIDE as f64).floor();
        (cell.max(0.0) as u64).min(HILBERT_SIDE - 1)
    };
    let mut x = scale(lon, -180.0, 360.0);
    let mut y = scale(lat, -90.0, 180.0);

    let mut d = 0u64;
    let mut s = HILBERT_SIDE / 2;
    while s > 0 {
        let rx = u64::from(x & s > 0);
        let ry = u64::from(y & s > 0);
        d += s * s * ((3 * rx) ^ ry);

        // rotate the quadrant
        if ry == 0 {
            if rx == 1 {
                x = HILBERT_SIDE - 1 - x;
                y = HILBERT_SIDE - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        s /= 2;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_distance(50.0, 4.0, 51.0, 4.0);
        assert!((d - 111_195.0).abs() < 200.0, "got {d}");
    }

    #[test]
    fn test_polyline_length() {
        let straight = [(50.0, 4.0), (51.0, 4.0)];
        let split = [(50.0, 4.0), (50.5, 4.0), (51.0, 4.0)];
        assert!((polyline_length(&straight) - polyline_length(&split)).abs() < 1.0);
        assert_eq!(polyline_length(&[(50.0, 4.0)]), 0.0);
    }

    #[test]
    fn test_hilbert_index_locality() {
        let a = hilbert_index(50.85, 4.35);
        let b = hilbert_index(50.8501, 4.3501);
        let far = hilbert_index(-33.9, 151.2);
        assert!(a.abs_diff(b) < a.abs_diff(far));
    }

    #[test]
    fn test_hilbert_index_bounds() {
        let max = HILBERT_SIDE * HILBERT_SIDE;
        for (lat, lon) in [(-90.0, -180.0), (90.0, 180.0), (0.0, 0.0), (95.0, 200.0)] {
            assert!(hilbert_index(lat, lon) < max);
        }
    }
}
