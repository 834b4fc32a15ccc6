use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A point on the complex plane as two `f64` components.
///
/// The evaluators iterate on raw `re`/`im` pairs so that the fixed-point
/// test compares exact bit patterns; this type is the currency between the
/// viewport, the scheduler and external collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const ZERO: Self = Self { re: 0.0, im: 0.0 };

    #[inline]
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Returns `re² + im²` without taking the square root.
    #[inline]
    pub fn norm_sq(self) -> f64 {
        self.re * self.re + self.im * self.im
    }
}

impl Add for Complex {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl Sub for Complex {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl std::fmt::Display for Complex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.im >= 0.0 {
            write!(f, "{} + {}i", self.re, self.im)
        } else {
            write!(f, "{} - {}i", self.re, -self.im)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_sub_are_componentwise() {
        let a = Complex::new(1.5, -2.0);
        let b = Complex::new(0.5, 4.0);
        assert_eq!(a + b, Complex::new(2.0, 2.0));
        assert_eq!(a - b, Complex::new(1.0, -6.0));
    }

    #[test]
    fn norm_sq() {
        assert_eq!(Complex::new(3.0, 4.0).norm_sq(), 25.0);
        assert_eq!(Complex::ZERO.norm_sq(), 0.0);
    }

    #[test]
    fn display_shows_sign_of_imaginary_part() {
        assert_eq!(Complex::new(-0.75, 0.1).to_string(), "-0.75 + 0.1i");
        assert_eq!(Complex::new(1.0, -2.5).to_string(), "1 - 2.5i");
    }
}
