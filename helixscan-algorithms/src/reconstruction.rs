//! Polar to Cartesian reconstruction of layered scans

use helixscan_core::{
    CalibrationModel, CalibrationParameters, LayerCloud, Point3d, ScanCloud, ScanSample,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Geometry of a reconstruction call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionParams {
    /// Z of the first layer present in the scan (mm)
    pub initial_height: f64,
    /// Vertical pitch between consecutive layer indices (mm)
    pub layer_height: f64,
    pub calibration: CalibrationParameters,
}

impl Default for ReconstructionParams {
    fn default() -> Self {
        Self {
            initial_height: 0.0,
            layer_height: 10.0,
            calibration: CalibrationParameters::default(),
        }
    }
}

/// Applies a [`CalibrationModel`] across a layered scan.
///
/// Reconstruction is stateless: the same samples and parameters always give
/// a bit-identical cloud, which the calibration fitter relies on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconstructor {
    pub model: CalibrationModel,
    pub params: ReconstructionParams,
}

impl Reconstructor {
    pub fn new(model: CalibrationModel, params: ReconstructionParams) -> Self {
        Self { model, params }
    }

    /// Reconstruct the scan into a layered point cloud
    ///
    /// Layers come out in ascending order and every layer present in the
    /// input gets an entry, empty when none of its readings is valid. Within a
    /// layer points follow `point_index`. Missing readings and readings at a
    /// non-finite angle are skipped.
    pub fn reconstruct(&self, samples: &[ScanSample]) -> ScanCloud {
        let rings = group_rings(samples);
        let Some(&first_layer) = rings.keys().next() else {
            return ScanCloud::new();
        };

        let calibration = &self.params.calibration;
        let layers: Vec<LayerCloud> = rings
            .into_iter()
            .map(|(layer, ring)| {
                let z = self.params.initial_height
                    + self.params.layer_height * f64::from(layer - first_layer);

                let points = ring
                    .into_iter()
                    .filter_map(|sample| {
                        if !sample.angle_rad.is_finite() {
                            return None;
                        }
                        let radial = self.model.radial_distance(sample.distance_mm, calibration);
                        if radial.is_nan() {
                            return None;
                        }
                        let (x, y) = self.model.project(radial, sample.angle_rad, calibration);
                        Some(Point3d::new(x, y, z))
                    })
                    .collect();

                LayerCloud::from_points(layer, points)
            })
            .collect();

        let cloud = ScanCloud::from_layers(layers);
        debug!(
            layers = cloud.layer_count(),
            points = cloud.point_count(),
            samples = samples.len(),
            "Reconstructed scan"
        );
        cloud
    }
}

/// Number of samples carrying a usable distance
pub fn valid_sample_count(samples: &[ScanSample]) -> usize {
    samples.iter().filter(|s| s.is_valid()).count()
}

/// Group samples by layer, each ring sorted by `point_index` (stable)
fn group_rings(samples: &[ScanSample]) -> BTreeMap<u32, Vec<&ScanSample>> {
    let mut rings: BTreeMap<u32, Vec<&ScanSample>> = BTreeMap::new();
    for sample in samples {
        rings.entry(sample.layer).or_default().push(sample);
    }
    for ring in rings.values_mut() {
        ring.sort_by_key(|s| s.point_index);
    }
    rings
}
