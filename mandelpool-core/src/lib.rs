pub mod complex;
pub mod error;
pub mod escape;
pub mod interior;
pub mod params;
pub mod viewport;

// Re-export primary types for convenience.
pub use complex::Complex;
pub use error::CoreError;
pub use escape::{burning_ship, escape_time, escape_value, evaluate, normalized_iteration_count};
pub use interior::is_known_interior;
pub use params::{Algorithm, RenderParams};
pub use viewport::{PixelRect, Viewport};

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
