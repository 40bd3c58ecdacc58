//! Circular smoothing of layer rings
//!
//! A ring is a closed loop, so the moving average wraps: the last points of
//! the ring feed the average of the first ones and vice versa.

use helixscan_core::{LayerCloud, Point3d, ScanCloud};
use rayon::prelude::*;

/// Smooth the X and Y coordinates of a ring with a circular moving average
///
/// Even windows are widened by one so the average stays centred. Z and the
/// point count are unchanged. Rings shorter than the window reuse samples
/// through the wraparound.
///
/// # Arguments
/// * `ring` - Ring-ordered layer points
/// * `window` - Moving-average width; `window <= 1` returns the ring unchanged
pub fn smooth_ring(ring: &LayerCloud, window: usize) -> LayerCloud {
    let n = ring.len();
    if window <= 1 || n == 0 {
        return ring.clone();
    }

    let window = if window % 2 == 0 { window + 1 } else { window };
    let half = (window / 2) as isize;
    let n_signed = n as isize;

    let points = (0..n_signed)
        .map(|i| {
            let (sum_x, sum_y) = (-half..=half)
                .map(|offset| &ring.points[(i + offset).rem_euclid(n_signed) as usize])
                .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
            let original = ring.points[i as usize];
            Point3d::new(sum_x / window as f64, sum_y / window as f64, original.z)
        })
        .collect();

    LayerCloud::from_points(ring.layer, points)
}

/// Apply [`smooth_ring`] to every layer, preserving layer order
pub fn smooth_cloud(cloud: &ScanCloud, window: usize) -> ScanCloud {
    if window <= 1 {
        return cloud.clone();
    }
    let layers: Vec<LayerCloud> = cloud
        .layers
        .par_iter()
        .map(|ring| smooth_ring(ring, window))
        .collect();
    ScanCloud::from_layers(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::TAU;

    fn circle(layer: u32, n: usize, radius: f64, z: f64) -> LayerCloud {
        let points = (0..n)
            .map(|i| {
                let a = TAU * i as f64 / n as f64;
                Point3d::new(radius * a.cos(), radius * a.sin(), z)
            })
            .collect();
        LayerCloud::from_points(layer, points)
    }

    #[test]
    fn test_window_one_is_identity() {
        let ring = circle(0, 16, 40.0, 5.0);
        assert_eq!(smooth_ring(&ring, 1), ring);
        assert_eq!(smooth_ring(&ring, 0), ring);
    }

    #[test]
    fn test_constant_ring_unchanged() {
        let ring = LayerCloud::from_points(0, vec![Point3d::new(3.0, -2.0, 1.0); 5]);
        let smoothed = smooth_ring(&ring, 3);
        for p in smoothed.iter() {
            assert_relative_eq!(*p, Point3d::new(3.0, -2.0, 1.0), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_uniform_circle_stays_on_circle() {
        let ring = circle(0, 64, 50.0, 20.0);
        let smoothed = smooth_ring(&ring, 3);
        assert_eq!(smoothed.len(), ring.len());

        // averaging neighbours on a circle pulls points inward by the chord factor
        let shrink = (1.0 + 2.0 * (TAU / 64.0).cos()) / 3.0;
        for (original, p) in ring.iter().zip(smoothed.iter()) {
            let r = (p.x * p.x + p.y * p.y).sqrt();
            assert_relative_eq!(r, 50.0 * shrink, epsilon = 1e-9);
            assert_relative_eq!(r, 50.0, max_relative = 2e-2);
            assert_relative_eq!(p.y.atan2(p.x), original.y.atan2(original.x), epsilon = 1e-9);
            assert_eq!(p.z, 20.0);
        }
    }

    #[test]
    fn test_wraps_around_ring_ends() {
        let ring = LayerCloud::from_points(
            2,
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(3.0, 0.0, 0.0),
                Point3d::new(6.0, 0.0, 0.0),
                Point3d::new(9.0, 3.0, 0.0),
            ],
        );
        let smoothed = smooth_ring(&ring, 3);
        // first point averages last, first and second
        assert_relative_eq!(smoothed[0].x, 4.0);
        assert_relative_eq!(smoothed[0].y, 1.0);
        assert_relative_eq!(smoothed[3].x, 5.0);
        assert_eq!(smoothed.layer, 2);
    }

    #[test]
    fn test_even_window_rounds_up() {
        let ring = LayerCloud::from_points(
            0,
            (0..6).map(|i| Point3d::new(i as f64, 0.0, 0.0)).collect(),
        );
        assert_eq!(smooth_ring(&ring, 2), smooth_ring(&ring, 3));
    }

    #[test]
    fn test_short_ring_reuses_points() {
        let ring = LayerCloud::from_points(0, vec![Point3d::new(0.0, 0.0, 0.0), Point3d::new(6.0, 0.0, 0.0)]);
        let smoothed = smooth_ring(&ring, 5);
        // window indices -2..=2 around 0 hit 0, 6, 0, 6, 0
        assert_relative_eq!(smoothed[0].x, 2.4);
        assert_relative_eq!(smoothed[1].x, 3.6);
    }

    #[test]
    fn test_smooth_cloud_preserves_layer_order() {
        let cloud = ScanCloud::from_layers(vec![
            circle(4, 8, 30.0, 0.0),
            LayerCloud::new(5),
            circle(9, 8, 35.0, 10.0),
        ]);
        let smoothed = smooth_cloud(&cloud, 3);
        let layers: Vec<u32> = smoothed.iter().map(|l| l.layer).collect();
        assert_eq!(layers, vec![4, 5, 9]);
        assert!(smoothed[1].is_empty());
        assert_eq!(smoothed[2], smooth_ring(&cloud[2], 3));
    }
}
