use thiserror::Error;

/// Errors raised at the configuration boundary.
///
/// A rejected value never partially applies: the previous configuration and
/// any running generation are left untouched.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("invalid thread count: {0} (must be >= 1)")]
    InvalidThreadCount(u32),

    #[error("invalid max radius: {0} (must be finite and >= 0.0)")]
    InvalidMaxRadius(f64),

    #[error("invalid zoom factor: {0} (must be finite and > 0.0)")]
    InvalidZoomFactor(f64),

    #[error("invalid viewport: {reason}")]
    InvalidViewport { reason: String },
}
