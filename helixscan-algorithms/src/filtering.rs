//! Filtering of raw distance readings
//!
//! Median filtering removes impulsive sensor noise before calibration. The
//! window is clamped at the ends of the sequence; unlike ring smoothing it
//! never wraps around.

use helixscan_core::ScanSample;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the median filter does with a reading that is already missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Pass missing readings through unchanged
    #[default]
    Preserve,
    /// Replace a missing reading by the median of its valid neighbours
    Fill,
}

/// Median filter over a sequence of distance readings
///
/// For index `i` the window spans `i - window/2 ..= i + window/2`, clamped to
/// the sequence. Missing readings never enter a window. An index whose window
/// holds no valid reading keeps its input value.
///
/// # Arguments
/// * `readings` - Distance readings in acquisition order
/// * `window` - Window size; `window <= 1` returns the input unchanged
/// * `policy` - Handling of readings that are missing on input
///
/// # Example
/// ```rust
/// use helixscan_algorithms::{median_filter, MissingPolicy};
///
/// let readings = vec![Some(50.0), Some(90.0), Some(52.0), None];
/// let filtered = median_filter(&readings, 3, MissingPolicy::Preserve);
/// assert_eq!(filtered, vec![Some(70.0), Some(52.0), Some(71.0), None]);
/// ```
pub fn median_filter(readings: &[Option<f64>], window: usize, policy: MissingPolicy) -> Vec<Option<f64>> {
    if window <= 1 {
        return readings.to_vec();
    }

    let half = window / 2;
    let mut neighbours = Vec::with_capacity(2 * half + 1);

    readings
        .iter()
        .enumerate()
        .map(|(i, &reading)| {
            if reading.is_none() && policy == MissingPolicy::Preserve {
                return reading;
            }

            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(readings.len());

            neighbours.clear();
            neighbours.extend(readings[start..end].iter().flatten().copied());

            median(&mut neighbours).or(reading)
        })
        .collect()
}

/// Apply [`median_filter`] to every layer ring of a scan independently.
///
/// Rings are filtered in `point_index` order; the returned samples keep the
/// input order, angles and indices.
pub fn filter_scan(samples: &[ScanSample], window: usize, policy: MissingPolicy) -> Vec<ScanSample> {
    if window <= 1 {
        return samples.to_vec();
    }

    let mut rings: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (position, sample) in samples.iter().enumerate() {
        rings.entry(sample.layer).or_default().push(position);
    }

    let mut filtered = samples.to_vec();
    for positions in rings.values() {
        let ordered: Vec<usize> = positions
            .iter()
            .copied()
            .sorted_by_key(|&p| samples[p].point_index)
            .collect();
        let readings: Vec<Option<f64>> = ordered.iter().map(|&p| samples[p].distance_mm).collect();

        for (&p, value) in ordered.iter().zip(median_filter(&readings, window, policy)) {
            filtered[p] = samples[p].with_distance(value);
        }
    }

    filtered
}

/// Gate readings outside `[min, max]` to missing
pub fn range_gate(samples: &[ScanSample], min: f64, max: f64) -> Vec<ScanSample> {
    samples
        .iter()
        .map(|s| s.with_distance(s.distance_mm.filter(|d| (min..=max).contains(d))))
        .collect()
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_one_is_identity() {
        let readings = vec![Some(1.0), None, Some(100.0), Some(3.0)];
        assert_eq!(median_filter(&readings, 1, MissingPolicy::Fill), readings);
        assert_eq!(median_filter(&readings, 0, MissingPolicy::Preserve), readings);
    }

    #[test]
    fn test_removes_impulse() {
        let readings = vec![Some(50.0), Some(50.0), Some(400.0), Some(50.0), Some(50.0)];
        let filtered = median_filter(&readings, 3, MissingPolicy::Preserve);
        assert_eq!(filtered, vec![Some(50.0); 5]);
    }

    #[test]
    fn test_window_clamps_at_ends() {
        let readings = vec![Some(1.0), Some(2.0), Some(3.0), Some(10.0)];
        let filtered = median_filter(&readings, 3, MissingPolicy::Preserve);
        // first window is [1, 2], last is [3, 10]
        assert_eq!(filtered[0], Some(1.5));
        assert_eq!(filtered[3], Some(6.5));
    }

    #[test]
    fn test_even_window_uses_half_on_each_side() {
        let readings = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(100.0)];
        let filtered = median_filter(&readings, 4, MissingPolicy::Preserve);
        // window 4 spans i-2..=i+2
        assert_eq!(filtered[2], Some(3.0));
    }

    #[test]
    fn test_missing_preserved_or_filled() {
        let readings = vec![Some(10.0), None, Some(20.0)];
        let preserved = median_filter(&readings, 3, MissingPolicy::Preserve);
        assert_eq!(preserved[1], None);
        assert_eq!(preserved[0], Some(10.0));

        let filled = median_filter(&readings, 3, MissingPolicy::Fill);
        assert_eq!(filled[1], Some(15.0));
    }

    #[test]
    fn test_no_valid_neighbours_keeps_input() {
        let readings = vec![None, None, None, Some(5.0), None, None, None];
        for policy in [MissingPolicy::Preserve, MissingPolicy::Fill] {
            let filtered = median_filter(&readings, 3, policy);
            assert_eq!(filtered[0], None);
            assert_eq!(filtered[1], None);
            assert_eq!(filtered[3], Some(5.0));
            assert_eq!(filtered[6], None);
        }
    }

    #[test]
    fn test_filter_scan_is_per_layer() {
        let samples = vec![
            ScanSample::at_step(1, 0, 3, Some(10.0)),
            ScanSample::at_step(1, 1, 3, Some(10.0)),
            ScanSample::at_step(1, 2, 3, Some(10.0)),
            ScanSample::at_step(2, 0, 3, Some(90.0)),
            ScanSample::at_step(2, 1, 3, Some(90.0)),
            ScanSample::at_step(2, 2, 3, Some(90.0)),
        ];
        let filtered = filter_scan(&samples, 5, MissingPolicy::Preserve);
        assert_eq!(filtered, samples);
    }

    #[test]
    fn test_filter_scan_orders_ring_by_point_index() {
        let samples = vec![
            ScanSample::at_step(0, 2, 4, Some(12.0)),
            ScanSample::at_step(0, 0, 4, Some(10.0)),
            ScanSample::at_step(0, 3, 4, Some(13.0)),
            ScanSample::at_step(0, 1, 4, Some(500.0)),
        ];
        let filtered = filter_scan(&samples, 3, MissingPolicy::Preserve);
        // ring order is 10, 500, 12, 13
        assert_eq!(filtered[0].distance_mm, Some(13.0));
        assert_eq!(filtered[1].distance_mm, Some(255.0));
        assert_eq!(filtered[3].distance_mm, Some(12.0));
        assert_eq!(filtered[3].point_index, 1);
    }

    #[test]
    fn test_range_gate() {
        let samples = vec![
            ScanSample::at_step(0, 0, 3, Some(5.0)),
            ScanSample::at_step(0, 1, 3, Some(150.0)),
            ScanSample::at_step(0, 2, 3, Some(900.0)),
        ];
        let gated = range_gate(&samples, 20.0, 300.0);
        assert_eq!(gated[0].distance_mm, None);
        assert_eq!(gated[1].distance_mm, Some(150.0));
        assert_eq!(gated[2].distance_mm, None);
    }
}
