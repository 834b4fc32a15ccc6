//! Closed-form membership tests for the two largest Mandelbrot components.

use crate::complex::Complex;

/// Returns `true` if `c` lies strictly inside the main cardioid.
#[inline]
pub fn in_main_cardioid(c: Complex) -> bool {
    let dx = c.re - 0.25;
    let p = (dx * dx + c.im * c.im).sqrt();
    c.re < p - 2.0 * p * p + 0.25
}

/// Returns `true` if `c` lies strictly inside the period-2 bulb.
#[inline]
pub fn in_period2_bulb(c: Complex) -> bool {
    let dx = c.re + 1.0;
    dx * dx + c.im * c.im < 0.0625
}

/// Returns `true` if `c` is known to be an interior point of the Mandelbrot set.
#[inline]
pub fn is_known_interior(c: Complex) -> bool {
    in_main_cardioid(c) || in_period2_bulb(c)
}
