//! Calibration parameters and the raw-distance calibration model
//!
//! The sensor sits at `sensor_axis_distance` from the rotation axis and reads
//! the distance to the scanned surface, so a shorter raw reading means the
//! surface is farther from the axis. The model turns a raw reading into the
//! radial distance from the axis and projects it into the layer plane.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Geometric constants converting raw readings into radial distances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParameters {
    /// Distance from the sensor to the rotation axis (mm)
    pub sensor_axis_distance: f64,
    /// Lateral misalignment of the sensor beam relative to the axis (mm)
    pub horizontal_offset: f64,
    /// Multiplicative correction of the sensor reading
    pub scale_factor: f64,
}

impl CalibrationParameters {
    pub fn new(sensor_axis_distance: f64, horizontal_offset: f64, scale_factor: f64) -> Self {
        Self {
            sensor_axis_distance,
            horizontal_offset,
            scale_factor,
        }
    }

    /// Check the parameters are usable.
    ///
    /// `sensor_axis_distance` should also exceed the largest corrected
    /// reading for the geometry to make sense, but that depends on the scan
    /// and is not checked here.
    pub fn validate(&self) -> Result<()> {
        if !(self.sensor_axis_distance.is_finite()
            && self.horizontal_offset.is_finite()
            && self.scale_factor.is_finite())
        {
            return Err(Error::InvalidData(
                "calibration parameters must be finite".to_string(),
            ));
        }
        if self.scale_factor <= 0.0 {
            return Err(Error::InvalidData(
                "scale_factor must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CalibrationParameters {
    fn default() -> Self {
        Self {
            sensor_axis_distance: 157.0,
            horizontal_offset: 5.0,
            scale_factor: 1.10,
        }
    }
}

/// Form of the raw → radial distance correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationModel {
    /// `radial = axis - (raw * raw_gain + raw_bias) * scale`, with the
    /// horizontal offset applied as a shift along x after projection.
    LinearOffset { raw_gain: f64, raw_bias: f64 },
    /// `radial = scale * sqrt((axis - raw)^2 + offset^2)`; the offset is part
    /// of the radial distance, so projection adds no shift.
    Quadratic,
}

impl CalibrationModel {
    /// Linear-offset model with an ideal sensor response
    pub fn linear() -> Self {
        CalibrationModel::LinearOffset {
            raw_gain: 1.0,
            raw_bias: 0.0,
        }
    }

    /// Linear-offset model with the bench-measured sensor response
    /// (`raw * 1.02 - 3`)
    pub fn legacy_sensor() -> Self {
        CalibrationModel::LinearOffset {
            raw_gain: 1.02,
            raw_bias: -3.0,
        }
    }

    /// Radial distance from the rotation axis, `NaN` when `raw` is missing
    pub fn radial_distance(&self, raw: Option<f64>, params: &CalibrationParameters) -> f64 {
        let Some(raw) = raw.filter(|r| r.is_finite()) else {
            return f64::NAN;
        };

        match *self {
            CalibrationModel::LinearOffset { raw_gain, raw_bias } => {
                let corrected = (raw * raw_gain + raw_bias) * params.scale_factor;
                params.sensor_axis_distance - corrected
            }
            CalibrationModel::Quadratic => {
                let along_beam = params.sensor_axis_distance - raw;
                params.scale_factor * along_beam.hypot(params.horizontal_offset)
            }
        }
    }

    /// Raw reading that produces `radial`, if one exists
    pub fn raw_distance(&self, radial: f64, params: &CalibrationParameters) -> Option<f64> {
        if !radial.is_finite() {
            return None;
        }

        let raw = match *self {
            CalibrationModel::LinearOffset { raw_gain, raw_bias } => {
                if raw_gain == 0.0 || params.scale_factor == 0.0 {
                    return None;
                }
                let corrected = params.sensor_axis_distance - radial;
                (corrected / params.scale_factor - raw_bias) / raw_gain
            }
            CalibrationModel::Quadratic => {
                let hypot = radial / params.scale_factor;
                let along_sq = hypot * hypot - params.horizontal_offset * params.horizontal_offset;
                if hypot < 0.0 || along_sq < 0.0 {
                    return None;
                }
                params.sensor_axis_distance - along_sq.sqrt()
            }
        };

        raw.is_finite().then_some(raw)
    }

    /// Cosine/sine decomposition of a radial distance into layer-plane coordinates
    pub fn project(&self, radial: f64, angle_rad: f64, params: &CalibrationParameters) -> (f64, f64) {
        let (sin, cos) = angle_rad.sin_cos();
        let shift = match self {
            CalibrationModel::LinearOffset { .. } => params.horizontal_offset,
            CalibrationModel::Quadratic => 0.0,
        };
        (radial * cos + shift, radial * sin)
    }
}

impl Default for CalibrationModel {
    fn default() -> Self {
        CalibrationModel::Quadratic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn params() -> CalibrationParameters {
        CalibrationParameters::new(157.0, 5.0, 1.1)
    }

    #[test]
    fn test_radial_strictly_decreasing_in_raw() {
        for model in [CalibrationModel::linear(), CalibrationModel::legacy_sensor(), CalibrationModel::Quadratic] {
            let mut previous = f64::INFINITY;
            for step in 0..140 {
                let raw = 10.0 + step as f64;
                let radial = model.radial_distance(Some(raw), &params());
                assert!(radial < previous, "{:?} not decreasing at raw={}", model, raw);
                previous = radial;
            }
        }
    }

    #[test]
    fn test_missing_raw_is_nan() {
        let radial = CalibrationModel::Quadratic.radial_distance(None, &params());
        assert!(radial.is_nan());
        let radial = CalibrationModel::linear().radial_distance(Some(f64::NAN), &params());
        assert!(radial.is_nan());
    }

    #[test]
    fn test_forms_agree_without_offset() {
        let p = CalibrationParameters::new(100.0, 0.0, 1.0);
        let linear = CalibrationModel::linear().radial_distance(Some(50.0), &p);
        let quadratic = CalibrationModel::Quadratic.radial_distance(Some(50.0), &p);
        assert_relative_eq!(linear, 50.0);
        assert_relative_eq!(quadratic, 50.0);
    }

    #[test]
    fn test_raw_distance_inverts_radial() {
        for model in [CalibrationModel::legacy_sensor(), CalibrationModel::Quadratic] {
            let raw = 73.5;
            let radial = model.radial_distance(Some(raw), &params());
            let back = model.raw_distance(radial, &params()).unwrap();
            assert_relative_eq!(back, raw, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_quadratic_inverse_rejects_radius_inside_offset() {
        // radius smaller than scale * offset has no real preimage
        assert_eq!(CalibrationModel::Quadratic.raw_distance(1.0, &params()), None);
    }

    #[test]
    fn test_projection_offset_depends_on_model() {
        let p = params();
        let (x, y) = CalibrationModel::linear().project(10.0, 0.0, &p);
        assert_relative_eq!(x, 15.0);
        assert_relative_eq!(y, 0.0);

        let (x, y) = CalibrationModel::Quadratic.project(10.0, FRAC_PI_2, &p);
        assert_relative_eq!(x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(y, 10.0);
    }

    #[test]
    fn test_validate() {
        assert!(params().validate().is_ok());
        assert!(CalibrationParameters::new(150.0, 0.0, 0.0).validate().is_err());
        assert!(CalibrationParameters::new(f64::NAN, 0.0, 1.0).validate().is_err());
    }

    #[test]
    fn test_model_serde_names() {
        let json = serde_json::to_string(&CalibrationModel::Quadratic).unwrap();
        assert_eq!(json, "\"quadratic\"");
        let model: CalibrationModel =
            serde_json::from_str(r#"{"linear_offset":{"raw_gain":1.0,"raw_bias":0.0}}"#).unwrap();
        assert_eq!(model, CalibrationModel::linear());
    }
}
