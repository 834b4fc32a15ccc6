use std::f64::consts::LN_2;

use crate::complex::Complex;
use crate::interior::is_known_interior;
use crate::params::{Algorithm, RenderParams};

/// How an orbit left the iteration loop.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Orbit {
    /// `|z| >= max_radius` after `iterations` steps; `z` is the first escaped value.
    Escaped { iterations: u32, z: Complex },
    /// Hit the iteration cap or an exact fixed point.
    Bounded,
}

/// Iterate `step` from `z = c` until the orbit escapes, repeats itself
/// exactly, or `max_iterations` steps have been taken.
///
/// The fixed-point test uses bit-exact float equality, so it only catches
/// true fixed points (e.g. `c = 0`), not general cycles.
#[inline(always)]
fn orbit<S>(c: Complex, max_radius: f64, max_iterations: u32, step: S) -> Orbit
where
    S: Fn(f64, f64) -> (f64, f64),
{
    let max_radius_sq = max_radius * max_radius;
    let (mut x, mut y) = (c.re, c.im);
    let mut n = 0u32;

    while x * x + y * y < max_radius_sq && n < max_iterations {
        let (xt, yt) = step(x, y);
        if x == xt && y == yt {
            return Orbit::Bounded;
        }
        x = xt;
        y = yt;
        n += 1;
    }

    if n < max_iterations {
        Orbit::Escaped {
            iterations: n,
            z: Complex::new(x, y),
        }
    } else {
        Orbit::Bounded
    }
}

/// Continuous iteration value: `n + 1 − min(1, log₂(ln|z| / ln(R²)))`.
///
/// When the correction is not finite (radius ≤ 1, `|z| = 0`) the integer
/// count is kept. The result is clamped to `[0, max_iterations]`.
#[inline]
fn smoothed(iterations: u32, z: Complex, max_radius: f64, max_iterations: u32) -> f64 {
    let n = iterations as f64;
    let zn_abs = z.norm_sq().sqrt();
    let u = (zn_abs.ln() / (max_radius * max_radius).ln()).ln() / LN_2;
    let correction = 1.0 - u.min(1.0);
    let value = if correction.is_finite() {
        n + correction
    } else {
        n
    };
    value.clamp(0.0, max_iterations as f64)
}

#[inline(always)]
fn mandelbrot_step(c: Complex) -> impl Fn(f64, f64) -> (f64, f64) {
    move |x, y| (x * x - y * y + c.re, 2.0 * x * y + c.im)
}

#[inline(always)]
fn burning_ship_step(c: Complex) -> impl Fn(f64, f64) -> (f64, f64) {
    move |x, y| (x * x - y * y - c.re, 2.0 * (x * y).abs() - c.im)
}

/// Classic escape-time count for `z ← z² + c`, starting from `z = c`.
pub fn escape_time(c: Complex, max_radius: f64, max_iterations: u32) -> f64 {
    match orbit(c, max_radius, max_iterations, mandelbrot_step(c)) {
        Orbit::Escaped { iterations, .. } => iterations as f64,
        Orbit::Bounded => max_iterations as f64,
    }
}

/// Escape-time count with continuous smoothing on escape.
pub fn normalized_iteration_count(c: Complex, max_radius: f64, max_iterations: u32) -> f64 {
    match orbit(c, max_radius, max_iterations, mandelbrot_step(c)) {
        Orbit::Escaped { iterations, z } => smoothed(iterations, z, max_radius, max_iterations),
        Orbit::Bounded => max_iterations as f64,
    }
}

/// Burning-ship escape count: `x ← x² − y² − cx`, `y ← 2|xy| − cy`.
///
/// Integer-valued unless `smooth` is set, in which case the same correction
/// as [`normalized_iteration_count`] is applied.
pub fn burning_ship(c: Complex, max_radius: f64, max_iterations: u32, smooth: bool) -> f64 {
    match orbit(c, max_radius, max_iterations, burning_ship_step(c)) {
        Orbit::Escaped { iterations, z } if smooth => {
            smoothed(iterations, z, max_radius, max_iterations)
        }
        Orbit::Escaped { iterations, .. } => iterations as f64,
        Orbit::Bounded => max_iterations as f64,
    }
}

/// Run the selected evaluator for one point, without the interior pre-check.
#[inline]
pub fn escape_value(params: &RenderParams, c: Complex) -> f64 {
    match params.algorithm {
        Algorithm::EscapeTime => escape_time(c, params.max_radius, params.max_iterations),
        Algorithm::NormalizedIterationCount => {
            normalized_iteration_count(c, params.max_radius, params.max_iterations)
        }
        Algorithm::BurningShip => burning_ship(
            c,
            params.max_radius,
            params.max_iterations,
            params.burning_ship_smoothing,
        ),
    }
}

/// Iteration value for one point: interior pre-check (when enabled and
/// applicable), then the selected evaluator.
///
/// The result lies in `[0, max_iterations]`; `max_iterations` means the
/// point did not escape.
#[inline]
pub fn evaluate(params: &RenderParams, c: Complex) -> f64 {
    if params.interior_check_active() && is_known_interior(c) {
        return params.max_iterations as f64;
    }
    escape_value(params, c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(algorithm: Algorithm) -> RenderParams {
        RenderParams::default()
            .with_algorithm(algorithm)
            .with_max_iterations(100)
            .with_max_radius(2.0)
    }

    #[test]
    fn far_point_escapes_immediately() {
        assert_eq!(escape_time(Complex::new(-2.0, 2.0), 2.0, 1), 0.0);
        assert_eq!(escape_time(Complex::new(10.0, 0.0), 2.0, 100), 0.0);
    }

    #[test]
    fn known_escape_count() {
        // z₀ = 1 (|z|² = 1 < 4), z₁ = 2 (|z|² = 4, not < 4) → one step.
        assert_eq!(escape_time(Complex::new(1.0, 0.0), 2.0, 100), 1.0);
    }

    #[test]
    fn origin_is_fixed_point() {
        assert_eq!(escape_time(Complex::ZERO, 2.0, 100), 100.0);
        assert_eq!(normalized_iteration_count(Complex::ZERO, 2.0, 100), 100.0);
    }

    #[test]
    fn period_two_orbit_hits_cap() {
        // c = -1 cycles -1 → 0 → -1; not an exact fixed point.
        assert_eq!(escape_time(Complex::new(-1.0, 0.0), 2.0, 50), 50.0);
    }

    #[test]
    fn zero_iterations_means_not_escaped() {
        assert_eq!(escape_time(Complex::new(5.0, 5.0), 2.0, 0), 0.0);
        assert_eq!(normalized_iteration_count(Complex::new(5.0, 5.0), 2.0, 0), 0.0);
    }

    #[test]
    fn normalized_count_smooths_escape() {
        // |z| = 10 with R = 2: u = log₂(ln 10 / ln 4) ≈ 0.7327.
        let v = normalized_iteration_count(Complex::new(10.0, 0.0), 2.0, 100);
        let expected = 1.0 - ((10f64).ln() / (4f64).ln()).ln() / LN_2;
        assert!((v - expected).abs() < 1e-12);
        assert!(v > 0.0 && v < 1.0);
    }

    #[test]
    fn normalized_count_is_clamped_to_cap() {
        // Escapes on the last allowed step; correction would exceed the cap.
        let v = normalized_iteration_count(Complex::new(1.0, 0.0), 2.0, 2);
        assert!(v <= 2.0);
        assert!(v >= 1.0);
    }

    #[test]
    fn degenerate_radius_stays_in_range() {
        for r in [0.0, 0.5, 1.0] {
            for &c in &[Complex::ZERO, Complex::new(0.3, 0.2), Complex::new(-3.0, 1.0)] {
                let v = normalized_iteration_count(c, r, 20);
                assert!((0.0..=20.0).contains(&v), "r={r} c={c} v={v}");
                let b = burning_ship(c, r, 20, true);
                assert!((0.0..=20.0).contains(&b), "r={r} c={c} v={b}");
            }
        }
    }

    #[test]
    fn values_within_bounds_over_grid() {
        for algorithm in Algorithm::ALL {
            let p = params(algorithm).with_burning_ship_smoothing(true);
            for i in 0..40 {
                for j in 0..30 {
                    let c = Complex::new(-2.5 + i as f64 * 0.09, -1.5 + j as f64 * 0.1);
                    let v = evaluate(&p, c);
                    assert!((0.0..=100.0).contains(&v), "{algorithm:?} {c} → {v}");
                }
            }
        }
    }

    #[test]
    fn burning_ship_is_integer_unless_smoothed() {
        let c = Complex::new(-1.0, 0.9);
        let raw = burning_ship(c, 2.0, 100, false);
        assert_eq!(raw.fract(), 0.0);
        assert!(raw < 100.0);
        let smooth = burning_ship(c, 2.0, 100, true);
        assert!(smooth >= raw);
    }

    #[test]
    fn burning_ship_uses_negated_constant() {
        // c = (-2, 0): z₀ = -2 has |z|² = 4 → escapes immediately either way,
        // c = (0.5, 0): Mandelbrot escapes, burning ship x ← x² − 0.5 stays bounded.
        assert!(escape_time(Complex::new(0.5, 0.0), 2.0, 100) < 100.0);
        assert_eq!(burning_ship(Complex::new(0.5, 0.0), 2.0, 100, false), 100.0);
    }

    #[test]
    fn interior_check_short_circuits_to_cap() {
        let p = params(Algorithm::EscapeTime).with_interior_check(true);
        assert_eq!(evaluate(&p, Complex::new(-0.1, 0.1)), 100.0);
        assert_eq!(evaluate(&p, Complex::new(-1.0, 0.05)), 100.0);
    }

    #[test]
    fn interior_check_does_not_change_values() {
        for algorithm in [Algorithm::EscapeTime, Algorithm::NormalizedIterationCount] {
            let on = params(algorithm).with_interior_check(true);
            let off = on.with_interior_check(false);
            for i in 0..60 {
                for j in 0..40 {
                    let c = Complex::new(-2.2 + i as f64 * 0.05, -1.2 + j as f64 * 0.06);
                    assert_eq!(evaluate(&on, c), evaluate(&off, c), "{algorithm:?} at {c}");
                }
            }
        }
    }

    #[test]
    fn deterministic_results() {
        let p = params(Algorithm::NormalizedIterationCount);
        let points = [
            Complex::new(0.0, 0.0),
            Complex::new(-0.75, 0.1),
            Complex::new(0.3, 0.5),
            Complex::new(-2.0, 0.0),
            Complex::new(1.0, 1.0),
        ];
        let run1: Vec<_> = points.iter().map(|&c| evaluate(&p, c)).collect();
        let run2: Vec<_> = points.iter().map(|&c| evaluate(&p, c)).collect();
        assert_eq!(run1, run2);
    }
}
