//! Point and raw sample types

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// A 3D point with double precision coordinates (millimetres)
pub type Point3d = Point3<f64>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// One raw polar reading of the rotating distance sensor.
///
/// A missing or invalid reading (sensor timeout, NaN) is stored as `None`
/// and is skipped by every downstream stage. Samples with a non-finite
/// angle are treated the same way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanSample {
    pub layer: u32,
    pub point_index: u32,
    pub angle_rad: f64,
    pub distance_mm: Option<f64>,
}

impl ScanSample {
    /// Create a sample, normalising non-finite distances to `None`
    pub fn new(layer: u32, point_index: u32, angle_rad: f64, distance_mm: Option<f64>) -> Self {
        Self {
            layer,
            point_index,
            angle_rad,
            distance_mm: distance_mm.filter(|d| d.is_finite()),
        }
    }

    /// Create a sample for step `point_index` of a ring with `points_per_layer`
    /// evenly spaced readings.
    pub fn at_step(
        layer: u32,
        point_index: u32,
        points_per_layer: u32,
        distance_mm: Option<f64>,
    ) -> Self {
        let angle = if points_per_layer == 0 {
            0.0
        } else {
            TAU * f64::from(point_index) / f64::from(points_per_layer)
        };
        Self::new(layer, point_index, angle, distance_mm)
    }

    /// Whether the sample carries a usable distance at a finite angle
    pub fn is_valid(&self) -> bool {
        self.distance_mm.is_some() && self.angle_rad.is_finite()
    }

    /// Copy of this sample with a different distance reading
    pub fn with_distance(&self, distance_mm: Option<f64>) -> Self {
        Self::new(self.layer, self.point_index, self.angle_rad, distance_mm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_non_finite_distance_is_missing() {
        let sample = ScanSample::new(0, 0, 0.0, Some(f64::NAN));
        assert!(!sample.is_valid());
        let sample = ScanSample::new(0, 0, 0.0, Some(f64::INFINITY));
        assert_eq!(sample.distance_mm, None);
    }

    #[test]
    fn test_non_finite_angle_is_invalid() {
        let sample = ScanSample::new(0, 0, f64::NAN, Some(50.0));
        assert!(!sample.is_valid());
        assert!(!ScanSample::new(0, 0, f64::INFINITY, Some(50.0)).is_valid());
    }

    #[test]
    fn test_at_step_angle() {
        let sample = ScanSample::at_step(2, 4, 16, Some(42.0));
        assert_relative_eq!(sample.angle_rad, PI / 2.0, epsilon = 1e-12);
        assert_eq!(sample.layer, 2);
        assert_eq!(sample.distance_mm, Some(42.0));
    }
}
