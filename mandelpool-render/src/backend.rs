use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use mandelpool_core::{
    burning_ship, escape_time, normalized_iteration_count, Algorithm, Complex, RenderParams,
};

use crate::error::RenderError;

/// A bulk evaluator that computes pass-1 values for a whole generation at once.
///
/// Implementations must return exactly one value per point, in the same
/// order, each nominally in `[0, max_iterations]`. The engine still owns
/// pixel mapping, buffer writes and the histogram pass.
pub trait BatchEvaluator: Send + Sync {
    fn compute_batch(&self, points: &[Complex], max_radius: f64, max_iterations: u32) -> Vec<f64>;
}

/// Where pass-1 values come from.
#[derive(Clone, Default)]
pub enum Backend {
    /// Each worker evaluates the pixels it claims.
    #[default]
    Workers,
    /// One batch call per generation; workers only distribute the results.
    ///
    /// Only `max_radius` and `max_iterations` reach the evaluator. The escape
    /// function is whatever the evaluator was built with, so the engine's
    /// `algorithm` and `burning_ship_smoothing` do not apply; rebuild the
    /// evaluator (e.g. [`RayonBatch::from_params`]) when they change.
    Batch(Arc<dyn BatchEvaluator>),
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workers => f.write_str("Workers"),
            Self::Batch(_) => f.write_str("Batch"),
        }
    }
}

/// CPU batch evaluator spread over the rayon pool.
///
/// The algorithm is fixed at construction; no interior pre-check is applied.
#[derive(Debug, Clone, Copy)]
pub struct RayonBatch {
    algorithm: Algorithm,
    smooth_burning_ship: bool,
}

impl RayonBatch {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            smooth_burning_ship: false,
        }
    }

    /// An evaluator using the escape function selected by `params`.
    pub fn from_params(params: &RenderParams) -> Self {
        Self::new(params.algorithm).with_burning_ship_smoothing(params.burning_ship_smoothing)
    }

    pub fn with_burning_ship_smoothing(self, smooth: bool) -> Self {
        Self {
            smooth_burning_ship: smooth,
            ..self
        }
    }
}

impl Default for RayonBatch {
    fn default() -> Self {
        Self::new(Algorithm::NormalizedIterationCount)
    }
}

impl BatchEvaluator for RayonBatch {
    fn compute_batch(&self, points: &[Complex], max_radius: f64, max_iterations: u32) -> Vec<f64> {
        let algorithm = self.algorithm;
        let smooth = self.smooth_burning_ship;
        points
            .par_iter()
            .map(|&c| match algorithm {
                Algorithm::EscapeTime => escape_time(c, max_radius, max_iterations),
                Algorithm::NormalizedIterationCount => {
                    normalized_iteration_count(c, max_radius, max_iterations)
                }
                Algorithm::BurningShip => burning_ship(c, max_radius, max_iterations, smooth),
            })
            .collect()
    }
}

/// Check a batch result against its contract and clamp each value into
/// `[0, max_iterations]` (NaN counts as not escaped).
pub(crate) fn sanitize_batch(
    mut values: Vec<f64>,
    expected: usize,
    max_iterations: u32,
) -> crate::Result<Vec<f64>> {
    if values.len() != expected {
        return Err(RenderError::BatchLength {
            expected,
            actual: values.len(),
        });
    }
    let max = max_iterations as f64;
    for v in &mut values {
        *v = if v.is_nan() { max } else { v.clamp(0.0, max) };
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rayon_batch_matches_scalar_evaluators() {
        let points: Vec<Complex> = (0..64)
            .map(|i| Complex::new(-2.0 + i as f64 * 0.05, 0.3 - i as f64 * 0.01))
            .collect();
        for algorithm in Algorithm::ALL {
            let batch = RayonBatch::new(algorithm).compute_batch(&points, 2.0, 80);
            assert_eq!(batch.len(), points.len());
            for (v, &c) in batch.iter().zip(&points) {
                let expected = match algorithm {
                    Algorithm::EscapeTime => escape_time(c, 2.0, 80),
                    Algorithm::NormalizedIterationCount => normalized_iteration_count(c, 2.0, 80),
                    Algorithm::BurningShip => burning_ship(c, 2.0, 80, false),
                };
                assert_eq!(*v, expected);
            }
        }
    }

    #[test]
    fn from_params_follows_algorithm_and_smoothing() {
        let points: Vec<Complex> = (0..32)
            .map(|i| Complex::new(-1.9 + i as f64 * 0.07, -0.6 + i as f64 * 0.02))
            .collect();
        let params = RenderParams::default()
            .with_algorithm(Algorithm::BurningShip)
            .with_burning_ship_smoothing(true)
            .with_max_iterations(60);
        let batch = RayonBatch::from_params(&params).compute_batch(
            &points,
            params.max_radius,
            params.max_iterations,
        );
        for (v, &c) in batch.iter().zip(&points) {
            assert_eq!(*v, mandelpool_core::escape_value(&params, c));
        }
    }

    #[test]
    fn sanitize_rejects_wrong_length() {
        assert_eq!(
            sanitize_batch(vec![1.0; 3], 4, 10),
            Err(RenderError::BatchLength {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn sanitize_clamps_out_of_range() {
        let v = sanitize_batch(vec![-1.0, 3.5, 99.0, f64::NAN], 4, 10).unwrap();
        assert_eq!(v, vec![0.0, 3.5, 10.0, 10.0]);
    }
}
