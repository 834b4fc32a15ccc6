use thiserror::Error;

/// Errors originating from the render engine.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("batch backend returned {actual} values for {expected} points")]
    BatchLength { expected: usize, actual: usize },

    #[error(transparent)]
    Core(#[from] mandelpool_core::CoreError),
}
