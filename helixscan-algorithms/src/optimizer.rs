//! Box-constrained Nelder–Mead minimisation
//!
//! Derivative-free, so objectives with flat plateaus (such as a sentinel
//! cost) do not break it. Every trial vertex is projected into the box.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Stopping criteria and simplex setup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NelderMeadOptions {
    /// Maximum number of simplex iterations
    pub max_iterations: usize,
    /// Convergence threshold on the largest vertex distance from the best vertex (per coordinate)
    pub x_tolerance: f64,
    /// Convergence threshold on the spread of objective values
    pub f_tolerance: f64,
    /// Initial simplex edge as a fraction of each bound's width
    pub initial_step: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            max_iterations: 400,
            x_tolerance: 1e-4,
            f_tolerance: 1e-4,
            initial_step: 0.05,
        }
    }
}

/// Outcome of a minimisation
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Best vertex found
    pub x: Vec<f64>,
    /// Objective value at `x`
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    /// Whether both tolerances were met before the iteration cap
    pub converged: bool,
}

struct Objective<F> {
    f: F,
    lower: DVector<f64>,
    upper: DVector<f64>,
    evaluations: usize,
}

impl<F: FnMut(&[f64]) -> f64> Objective<F> {
    fn clamp(&self, x: DVector<f64>) -> DVector<f64> {
        x.zip_zip_map(&self.lower, &self.upper, |v, lo, hi| v.clamp(lo, hi))
    }

    fn eval(&mut self, x: &DVector<f64>) -> f64 {
        self.evaluations += 1;
        let value = (self.f)(x.as_slice());
        if value.is_nan() {
            f64::INFINITY
        } else {
            value
        }
    }
}

/// Minimise `f` inside the box `bounds` starting from `x0`
///
/// `x0` is clamped into the box first. `bounds[i]` is `(lower, upper)` for
/// coordinate `i`; `lower <= upper` is required. NaN objective values are
/// treated as `+inf`.
///
/// # Example
/// ```rust
/// use helixscan_algorithms::{minimize_bounded, NelderMeadOptions};
///
/// let min = minimize_bounded(
///     |x| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.0, 0.0],
///     &[(-10.0, 10.0), (-10.0, 10.0)],
///     &NelderMeadOptions::default(),
/// );
/// assert!(min.converged);
/// assert!((min.x[0] - 3.0).abs() < 1e-3);
/// ```
pub fn minimize_bounded<F>(f: F, x0: &[f64], bounds: &[(f64, f64)], options: &NelderMeadOptions) -> Minimum
where
    F: FnMut(&[f64]) -> f64,
{
    assert_eq!(x0.len(), bounds.len(), "one bound per coordinate");

    let dim = x0.len();
    let mut objective = Objective {
        f,
        lower: DVector::from_iterator(dim, bounds.iter().map(|b| b.0)),
        upper: DVector::from_iterator(dim, bounds.iter().map(|b| b.1)),
        evaluations: 0,
    };

    let start = objective.clamp(DVector::from_column_slice(x0));
    let start_value = objective.eval(&start);
    if dim == 0 {
        return Minimum {
            x: Vec::new(),
            value: start_value,
            iterations: 0,
            evaluations: objective.evaluations,
            converged: true,
        };
    }

    let mut simplex: Vec<(DVector<f64>, f64)> = Vec::with_capacity(dim + 1);
    simplex.push((start.clone(), start_value));
    for i in 0..dim {
        let width = objective.upper[i] - objective.lower[i];
        let step = if width > 0.0 {
            options.initial_step * width
        } else {
            options.initial_step * start[i].abs().max(1.0)
        };
        let mut vertex = start.clone();
        vertex[i] = if vertex[i] + step <= objective.upper[i] {
            vertex[i] + step
        } else {
            vertex[i] - step
        };
        let vertex = objective.clamp(vertex);
        let value = objective.eval(&vertex);
        simplex.push((vertex, value));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

        if within_tolerance(&simplex, options) {
            converged = true;
            break;
        }
        iterations += 1;

        let worst = simplex[dim].clone();
        let centroid = simplex[..dim]
            .iter()
            .fold(DVector::zeros(dim), |acc, (x, _)| acc + x)
            / dim as f64;

        let reflected = objective.clamp(&centroid + (&centroid - &worst.0) * REFLECTION);
        let reflected_value = objective.eval(&reflected);

        if reflected_value < simplex[0].1 {
            let expanded = objective.clamp(&centroid + (&centroid - &worst.0) * (REFLECTION * EXPANSION));
            let expanded_value = objective.eval(&expanded);
            simplex[dim] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
            continue;
        }

        if reflected_value < simplex[dim - 1].1 {
            simplex[dim] = (reflected, reflected_value);
            continue;
        }

        let accepted = if reflected_value < worst.1 {
            let outside = objective.clamp(&centroid + (&centroid - &worst.0) * (REFLECTION * CONTRACTION));
            let outside_value = objective.eval(&outside);
            (outside_value <= reflected_value).then_some((outside, outside_value))
        } else {
            let inside = objective.clamp(&centroid - (&centroid - &worst.0) * CONTRACTION);
            let inside_value = objective.eval(&inside);
            (inside_value < worst.1).then_some((inside, inside_value))
        };

        match accepted {
            Some(vertex) => simplex[dim] = vertex,
            None => {
                let best = simplex[0].0.clone();
                for vertex in simplex.iter_mut().skip(1) {
                    let shrunk = objective.clamp(&best + (&vertex.0 - &best) * SHRINK);
                    let value = objective.eval(&shrunk);
                    *vertex = (shrunk, value);
                }
            }
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (x, value) = simplex.swap_remove(0);

    Minimum {
        x: x.iter().copied().collect(),
        value,
        iterations,
        evaluations: objective.evaluations,
        converged,
    }
}

fn within_tolerance(simplex: &[(DVector<f64>, f64)], options: &NelderMeadOptions) -> bool {
    let (best, best_value) = &simplex[0];
    simplex[1..].iter().all(|(x, value)| {
        (x - best).amax() <= options.x_tolerance && (value - best_value).abs() <= options.f_tolerance
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadratic_bowl() {
        let min = minimize_bounded(
            |x| (x[0] - 1.5).powi(2) + 4.0 * (x[1] - 0.25).powi(2),
            &[0.0, 0.0],
            &[(-5.0, 5.0), (-5.0, 5.0)],
            &NelderMeadOptions::default(),
        );
        assert!(min.converged);
        assert_relative_eq!(min.x[0], 1.5, epsilon = 1e-3);
        assert_relative_eq!(min.x[1], 0.25, epsilon = 1e-3);
        assert!(min.evaluations > min.iterations);
    }

    #[test]
    fn test_rosenbrock() {
        let options = NelderMeadOptions {
            max_iterations: 2000,
            x_tolerance: 1e-8,
            f_tolerance: 1e-10,
            ..NelderMeadOptions::default()
        };
        let min = minimize_bounded(
            |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2),
            &[-1.2, 1.0],
            &[(-2.0, 2.0), (-2.0, 2.0)],
            &options,
        );
        assert!(min.converged);
        assert_relative_eq!(min.x[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(min.x[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_minimum_outside_box_lands_on_bound() {
        let min = minimize_bounded(
            |x| (x[0] - 10.0).powi(2),
            &[0.0],
            &[(-1.0, 2.0)],
            &NelderMeadOptions::default(),
        );
        assert!(min.converged);
        assert_relative_eq!(min.x[0], 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_start_is_clamped() {
        let mut seen_outside = false;
        let min = minimize_bounded(
            |x| {
                if !(0.0..=1.0).contains(&x[0]) {
                    seen_outside = true;
                }
                x[0]
            },
            &[5.0],
            &[(0.0, 1.0)],
            &NelderMeadOptions::default(),
        );
        assert!(!seen_outside);
        assert_relative_eq!(min.x[0], 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_flat_objective_converges() {
        let min = minimize_bounded(|_| 1e6, &[150.0, 1.0], &[(100.0, 250.0), (0.5, 2.0)], &NelderMeadOptions::default());
        assert!(min.converged);
        assert_eq!(min.value, 1e6);
    }

    #[test]
    fn test_iteration_cap_reports_not_converged() {
        let options = NelderMeadOptions { max_iterations: 3, ..NelderMeadOptions::default() };
        let min = minimize_bounded(
            |x| (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2),
            &[-4.0, 4.0],
            &[(-5.0, 5.0), (-5.0, 5.0)],
            &options,
        );
        assert!(!min.converged);
        assert_eq!(min.iterations, 3);
    }

    #[test]
    fn test_zero_dimensions() {
        let min = minimize_bounded(|_| 7.0, &[], &[], &NelderMeadOptions::default());
        assert!(min.converged);
        assert_eq!(min.value, 7.0);
        assert_eq!(min.evaluations, 1);
    }
}
