//! Errors raised by the render driver and its worker.

use thiserror::Error;

/// Errors that can occur while setting up or running a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Render was cancelled")]
    Cancelled,

    #[error("Frame buffer holds {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Invalid render settings: {0}")]
    InvalidSettings(String),

    #[error("Render worker panicked")]
    WorkerPanicked,
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
