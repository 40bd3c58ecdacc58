//! End-to-end scan pipeline
//!
//! Runs the stages a scan goes through between acquisition and export:
//! range gating, noise filtering, reconstruction, ring smoothing and
//! stitching. Every stage is a pure transform, so the same scan and config
//! always give the same output.

use crate::stitching::stitch_layers;
use helixscan_algorithms::{
    filter_scan, range_gate, smooth_cloud, valid_sample_count, MissingPolicy,
    ReconstructionParams, Reconstructor,
};
use helixscan_core::{CalibrationModel, Error, Result, ScanCloud, ScanSample, StitchedMesh};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Accepted raw distance window (mm); readings outside become missing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceRange {
    pub min: f64,
    pub max: f64,
}

impl Default for DistanceRange {
    fn default() -> Self {
        Self { min: 20.0, max: 300.0 }
    }
}

/// Configuration for the scan pipeline
///
/// Defaults are the scanner's factory settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Turntable steps per revolution, used to derive angles from step indices
    pub points_per_layer: u32,
    pub reconstruction: ReconstructionParams,
    pub model: CalibrationModel,
    pub distance_range: DistanceRange,
    /// Median filter window over raw readings; 1 disables it
    pub noise_window: usize,
    pub missing_policy: MissingPolicy,
    /// Circular moving-average window over ring points; 1 disables it
    pub smoothing_window: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            points_per_layer: 128,
            reconstruction: ReconstructionParams::default(),
            model: CalibrationModel::Quadratic,
            distance_range: DistanceRange::default(),
            noise_window: 1,
            missing_policy: MissingPolicy::Preserve,
            smoothing_window: 3,
        }
    }
}

impl PipelineConfig {
    /// Check the configuration before running
    pub fn validate(&self) -> Result<()> {
        self.reconstruction.calibration.validate()?;
        if self.points_per_layer == 0 {
            return Err(Error::InvalidData(
                "points_per_layer must be positive".to_string(),
            ));
        }
        let DistanceRange { min, max } = self.distance_range;
        if min.is_nan() || max.is_nan() || min > max {
            return Err(Error::InvalidData(format!(
                "invalid distance range [{}, {}]",
                min, max
            )));
        }
        if !(self.reconstruction.layer_height.is_finite() && self.reconstruction.initial_height.is_finite()) {
            return Err(Error::InvalidData(
                "layer heights must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output of a pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    /// Reconstructed (and smoothed) layer rings
    pub cloud: ScanCloud,
    /// Rings stitched into a triangle band
    pub mesh: StitchedMesh,
}

/// Raw scan to cloud and mesh
#[derive(Debug, Clone)]
pub struct ScanPipeline {
    config: PipelineConfig,
}

impl ScanPipeline {
    /// Create a new pipeline with configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over a scan
    pub fn run(&self, samples: &[ScanSample]) -> Result<PipelineOutput> {
        let cloud = self.reconstruct(samples)?;
        let mesh = stitch_layers(&cloud);
        if mesh.is_empty() && cloud.layer_count() > 1 {
            warn!(layers = cloud.layer_count(), "No faces produced, every ring pairing is empty");
        }

        info!(
            samples = samples.len(),
            layers = cloud.layer_count(),
            points = cloud.point_count(),
            faces = mesh.face_count(),
            "Scan pipeline complete"
        );
        Ok(PipelineOutput { cloud, mesh })
    }

    /// Run the stages up to and including ring smoothing
    pub fn reconstruct(&self, samples: &[ScanSample]) -> Result<ScanCloud> {
        let config = &self.config;
        config.validate()?;

        let gated = range_gate(samples, config.distance_range.min, config.distance_range.max);
        debug!(
            valid_before = valid_sample_count(samples),
            valid_after = valid_sample_count(&gated),
            min = config.distance_range.min,
            max = config.distance_range.max,
            "Range gate applied"
        );

        let filtered = filter_scan(&gated, config.noise_window, config.missing_policy);
        debug!(
            window = config.noise_window,
            valid = valid_sample_count(&filtered),
            "Noise filter applied"
        );

        let cloud = Reconstructor::new(config.model, config.reconstruction).reconstruct(&filtered);
        let smoothed = smooth_cloud(&cloud, config.smoothing_window);
        debug!(window = config.smoothing_window, "Ring smoothing applied");

        Ok(smoothed)
    }
}

impl Default for ScanPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
