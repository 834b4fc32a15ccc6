use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Which escape-time function is evaluated per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Integer escape count for `z ← z² + c`.
    EscapeTime,
    /// Escape count with continuous (sub-integer) smoothing.
    #[default]
    NormalizedIterationCount,
    /// `z ← (|x| + i|y|)² − c` variant.
    BurningShip,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [
        Algorithm::EscapeTime,
        Algorithm::NormalizedIterationCount,
        Algorithm::BurningShip,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::EscapeTime => "Escape time",
            Self::NormalizedIterationCount => "Normalized iteration count",
            Self::BurningShip => "Burning ship",
        }
    }

    /// Whether the cardioid/bulb short-circuit is valid for this set.
    ///
    /// The closed-form test describes the Mandelbrot set only.
    pub fn uses_interior_check(self) -> bool {
        !matches!(self, Self::BurningShip)
    }
}

/// Parameters that stay fixed for the lifetime of one render generation.
///
/// Any change triggers a cancel-and-restart in the engine. Values are checked
/// by [`validate`](Self::validate) at the configuration boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    pub algorithm: Algorithm,

    /// Iteration cap; a value equal to this means "did not escape".
    pub max_iterations: u32,

    /// Bailout radius. The orbit escapes once `|z| >= max_radius`.
    pub max_radius: f64,

    /// Run the second, histogram-equalized coloring pass.
    pub histogram_coloring: bool,

    /// Skip iteration for points inside the main cardioid or period-2 bulb.
    pub interior_check: bool,

    /// Number of worker threads per generation.
    pub thread_count: u32,

    /// Claim pixels in a random order for a uniform progressive fill.
    pub shuffle: bool,

    /// Apply continuous smoothing to burning-ship escape counts.
    pub burning_ship_smoothing: bool,
}

impl RenderParams {
    pub const DEFAULT_MAX_ITERATIONS: u32 = 200;
    pub const DEFAULT_MAX_RADIUS: f64 = 10.0;

    pub fn validate(&self) -> crate::Result<()> {
        if self.thread_count < 1 {
            return Err(CoreError::InvalidThreadCount(self.thread_count));
        }
        if self.max_radius < 0.0 || !self.max_radius.is_finite() {
            return Err(CoreError::InvalidMaxRadius(self.max_radius));
        }
        Ok(())
    }

    /// Whether the interior short-circuit applies to this configuration.
    #[inline]
    pub fn interior_check_active(&self) -> bool {
        self.interior_check && self.algorithm.uses_interior_check()
    }

    /// Number of passes a generation makes over the pixels.
    pub fn pass_count(&self) -> u64 {
        if self.histogram_coloring {
            2
        } else {
            1
        }
    }

    pub fn with_algorithm(self, algorithm: Algorithm) -> Self {
        Self { algorithm, ..self }
    }

    pub fn with_max_iterations(self, max_iterations: u32) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    pub fn with_max_radius(self, max_radius: f64) -> Self {
        Self { max_radius, ..self }
    }

    pub fn with_histogram_coloring(self, histogram_coloring: bool) -> Self {
        Self {
            histogram_coloring,
            ..self
        }
    }

    pub fn with_interior_check(self, interior_check: bool) -> Self {
        Self {
            interior_check,
            ..self
        }
    }

    pub fn with_thread_count(self, thread_count: u32) -> Self {
        Self {
            thread_count,
            ..self
        }
    }

    pub fn with_shuffle(self, shuffle: bool) -> Self {
        Self { shuffle, ..self }
    }

    pub fn with_burning_ship_smoothing(self, burning_ship_smoothing: bool) -> Self {
        Self {
            burning_ship_smoothing,
            ..self
        }
    }
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            max_radius: Self::DEFAULT_MAX_RADIUS,
            histogram_coloring: false,
            interior_check: true,
            thread_count: num_cpus::get().max(1) as u32,
            shuffle: true,
            burning_ship_smoothing: false,
        }
    }
}
