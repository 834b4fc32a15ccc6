pub mod backend;
pub mod buffer;
pub mod color;
pub mod error;
mod generation;
pub mod histogram;
pub mod iteration_buffer;
pub mod progress;
pub mod scheduler;
pub mod sequence;

pub use backend::{Backend, BatchEvaluator, RayonBatch};
pub use buffer::OutputImage;
pub use color::{hsb_to_rgb, iteration_color, BLACK};
pub use error::RenderError;
pub use histogram::{Equalizer, Histogram};
pub use iteration_buffer::IterationBuffer;
pub use progress::RenderProgress;
pub use scheduler::{Engine, ViewportOp};
pub use sequence::WorkSequence;

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;
