//! Calibration parameter fitting against a square reference object
//!
//! A square of known side length is scanned, reconstructed with candidate
//! parameters, and the parameters are searched until the reconstructed
//! footprint measures `side_length × side_length`.
//!
//! The bounding box pins one combination of axis distance and scale, so a
//! search with both free lands somewhere on a valley of equally good fits.
//! Fixing every parameter but one recovers that parameter exactly.

use crate::filtering::{filter_scan, MissingPolicy};
use crate::optimizer::{minimize_bounded, NelderMeadOptions};
use crate::reconstruction::{valid_sample_count, ReconstructionParams, Reconstructor};
use helixscan_core::{
    Bounded, CalibrationModel, CalibrationParameters, Error, Result, ScanSample,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One calibration parameter's role in the search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchRange {
    /// Held at the given value
    Fixed(f64),
    /// Searched inside `[lower, upper]` starting from `initial`
    Free { initial: f64, lower: f64, upper: f64 },
}

impl SearchRange {
    pub fn free(initial: f64, lower: f64, upper: f64) -> Self {
        SearchRange::Free { initial, lower, upper }
    }

    fn initial(&self) -> f64 {
        match *self {
            SearchRange::Fixed(value) => value,
            SearchRange::Free { initial, .. } => initial,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        match *self {
            SearchRange::Fixed(value) if !value.is_finite() => Err(Error::InvalidData(format!(
                "fixed {} must be finite",
                name
            ))),
            SearchRange::Free { initial, lower, upper }
                if !(initial.is_finite() && lower.is_finite() && upper.is_finite()) || lower > upper =>
            {
                Err(Error::InvalidData(format!(
                    "bounds for {} must be finite with lower <= upper",
                    name
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Which calibration parameters are searched, and where
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSearch {
    pub sensor_axis_distance: SearchRange,
    pub horizontal_offset: SearchRange,
    pub scale_factor: SearchRange,
}

impl ParameterSearch {
    /// Search all three parameters
    pub fn three_parameter() -> Self {
        Self {
            sensor_axis_distance: SearchRange::free(155.0, 100.0, 250.0),
            horizontal_offset: SearchRange::free(-7.0, -50.0, 50.0),
            scale_factor: SearchRange::free(1.0, 0.5, 2.0),
        }
    }

    /// Search axis distance and scale with the horizontal offset held fixed
    pub fn two_parameter(fixed_offset: f64) -> Self {
        Self {
            sensor_axis_distance: SearchRange::free(150.0, 100.0, 250.0),
            horizontal_offset: SearchRange::Fixed(fixed_offset),
            scale_factor: SearchRange::free(1.0, 0.5, 2.0),
        }
    }

    fn ranges(&self) -> [SearchRange; 3] {
        [self.sensor_axis_distance, self.horizontal_offset, self.scale_factor]
    }

    /// Starting point and bounds of the free parameters, in
    /// axis / offset / scale order
    fn free_vector(&self) -> (Vec<f64>, Vec<(f64, f64)>) {
        self.ranges()
            .iter()
            .filter_map(|range| match *range {
                SearchRange::Free { initial, lower, upper } => Some((initial, (lower, upper))),
                SearchRange::Fixed(_) => None,
            })
            .unzip()
    }

    /// Fill the free slots from `free`, keeping fixed values
    fn expand(&self, free: &[f64]) -> CalibrationParameters {
        let mut free = free.iter().copied();
        let mut values = self.ranges().map(|range| match range {
            SearchRange::Fixed(value) => value,
            SearchRange::Free { initial, .. } => initial,
        });
        for (value, range) in values.iter_mut().zip(self.ranges()) {
            if matches!(range, SearchRange::Free { .. }) {
                if let Some(v) = free.next() {
                    *value = v;
                }
            }
        }
        CalibrationParameters::new(values[0], values[1], values[2])
    }

    /// Parameters at the initial guess
    pub fn initial_parameters(&self) -> CalibrationParameters {
        CalibrationParameters::new(
            self.sensor_axis_distance.initial(),
            self.horizontal_offset.initial(),
            self.scale_factor.initial(),
        )
    }

    /// Number of searched parameters
    pub fn free_count(&self) -> usize {
        self.ranges()
            .iter()
            .filter(|r| matches!(r, SearchRange::Free { .. }))
            .count()
    }

    fn validate(&self) -> Result<()> {
        self.sensor_axis_distance.validate("sensor_axis_distance")?;
        self.horizontal_offset.validate("horizontal_offset")?;
        self.scale_factor.validate("scale_factor")?;
        let scale_floor = match self.scale_factor {
            SearchRange::Fixed(value) => value,
            SearchRange::Free { initial, lower, .. } => initial.min(lower),
        };
        if scale_floor <= 0.0 {
            return Err(Error::InvalidData(
                "scale_factor search must stay positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ParameterSearch {
    fn default() -> Self {
        Self::three_parameter()
    }
}

/// How width and height errors are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostKind {
    /// `(w - L)^2 + (h - L)^2`
    #[default]
    Squared,
    /// `|w - L| + |h - L|`
    Absolute,
}

impl CostKind {
    fn combine(&self, width: f64, height: f64, side: f64) -> f64 {
        match self {
            CostKind::Squared => (width - side).powi(2) + (height - side).powi(2),
            CostKind::Absolute => (width - side).abs() + (height - side).abs(),
        }
    }
}

/// Configuration for calibration fitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Side length of the square reference object (mm)
    pub side_length: f64,
    pub model: CalibrationModel,
    pub search: ParameterSearch,
    pub cost: CostKind,
    /// Fewest reconstructed points a candidate needs to be scored
    pub min_points: usize,
    /// Cost reported for candidates with fewer than `min_points` points
    pub sentinel_cost: f64,
    /// Median filter window applied to the reference scan
    pub noise_window: usize,
    pub missing_policy: MissingPolicy,
    pub optimizer: NelderMeadOptions,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            side_length: 80.0,
            model: CalibrationModel::linear(),
            search: ParameterSearch::default(),
            cost: CostKind::default(),
            min_points: 20,
            sentinel_cost: 1e6,
            noise_window: 3,
            missing_policy: MissingPolicy::Preserve,
            optimizer: NelderMeadOptions::default(),
        }
    }
}

/// Why a fit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Converged,
    /// The optimizer hit its iteration cap
    IterationLimit,
    /// Too few valid readings to measure the reference object
    InsufficientData { valid: usize, required: usize },
}

/// Result of a calibration fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFit {
    /// Best parameters found; only meaningful when `converged`
    pub parameters: CalibrationParameters,
    pub final_error: f64,
    /// Reconstructed (width, height) with `parameters`
    pub achieved_dimensions: (f64, f64),
    pub converged: bool,
    pub status: FitStatus,
    pub iterations: usize,
    pub evaluations: usize,
}

impl CalibrationFit {
    /// The fitted parameters, or the reason the fit cannot be trusted
    pub fn into_parameters(self) -> Result<CalibrationParameters> {
        match self.status {
            FitStatus::Converged => Ok(self.parameters),
            FitStatus::IterationLimit => Err(Error::OptimizationFailure {
                iterations: self.iterations,
                best_error: self.final_error,
            }),
            FitStatus::InsufficientData { valid, required } => {
                Err(Error::InsufficientData { valid, required })
            }
        }
    }
}

/// Fits [`CalibrationParameters`] to a scan of a square reference object
#[derive(Debug, Clone)]
pub struct CalibrationFitter {
    config: CalibrationConfig,
}

impl CalibrationFitter {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Score one candidate against the reference scan
    ///
    /// Returns the sentinel cost when fewer than `min_points` points survive
    /// reconstruction.
    pub fn cost(&self, samples: &[ScanSample], candidate: &CalibrationParameters) -> f64 {
        match self.measure(samples, candidate) {
            Some((width, height)) => self.config.cost.combine(width, height, self.config.side_length),
            None => self.config.sentinel_cost,
        }
    }

    /// Reconstructed footprint (width, height) of the reference scan, `None`
    /// below `min_points` points
    pub fn measure(&self, samples: &[ScanSample], candidate: &CalibrationParameters) -> Option<(f64, f64)> {
        let params = ReconstructionParams {
            initial_height: 0.0,
            layer_height: 0.0,
            calibration: *candidate,
        };
        let cloud = Reconstructor::new(self.config.model, params).reconstruct(samples);
        if cloud.point_count() < self.config.min_points {
            return None;
        }
        let bbox = cloud.bounding_box()?;
        Some((bbox.width(), bbox.depth()))
    }

    /// Fit the calibration parameters to a reference scan
    ///
    /// The scan is median-filtered per ring first. Errors are returned only
    /// for an invalid configuration; an unusable scan or a search that runs
    /// out of iterations is reported through [`CalibrationFit::status`].
    pub fn fit(&self, reference: &[ScanSample]) -> Result<CalibrationFit> {
        let config = &self.config;
        config.search.validate()?;
        if !(config.side_length.is_finite() && config.side_length > 0.0) {
            return Err(Error::InvalidData(
                "side_length must be positive".to_string(),
            ));
        }

        let samples = filter_scan(reference, config.noise_window, config.missing_policy);
        let valid = valid_sample_count(&samples);
        if valid < config.min_points {
            warn!(
                valid,
                required = config.min_points,
                "Reference scan has too few valid readings"
            );
            return Ok(CalibrationFit {
                parameters: config.search.initial_parameters(),
                final_error: config.sentinel_cost,
                achieved_dimensions: (0.0, 0.0),
                converged: false,
                status: FitStatus::InsufficientData {
                    valid,
                    required: config.min_points,
                },
                iterations: 0,
                evaluations: 0,
            });
        }

        let (x0, bounds) = config.search.free_vector();
        debug!(
            free_parameters = x0.len(),
            valid_readings = valid,
            side_length = config.side_length,
            "Starting calibration search"
        );

        let minimum = minimize_bounded(
            |free| self.cost(&samples, &config.search.expand(free)),
            &x0,
            &bounds,
            &config.optimizer,
        );

        let parameters = config.search.expand(&minimum.x);
        parameters.validate()?;
        let measured = self.measure(&samples, &parameters);
        let status = match (minimum.converged, measured) {
            (_, None) => FitStatus::InsufficientData {
                valid,
                required: config.min_points,
            },
            (true, Some(_)) => FitStatus::Converged,
            (false, Some(_)) => FitStatus::IterationLimit,
        };

        let fit = CalibrationFit {
            parameters,
            final_error: minimum.value,
            achieved_dimensions: measured.unwrap_or((0.0, 0.0)),
            converged: status == FitStatus::Converged,
            status,
            iterations: minimum.iterations,
            evaluations: minimum.evaluations,
        };

        if fit.converged {
            info!(
                sensor_axis_distance = parameters.sensor_axis_distance,
                horizontal_offset = parameters.horizontal_offset,
                scale_factor = parameters.scale_factor,
                error = fit.final_error,
                iterations = fit.iterations,
                "Calibration converged"
            );
        } else {
            warn!(status = ?fit.status, iterations = fit.iterations, "Calibration did not converge");
        }

        Ok(fit)
    }
}
