//! Audio error types

use thiserror::Error;

use super::pipeline::PipelineState;

/// Errors that can occur in the duplex audio path
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Hardware init failed: {0}")]
    HardwareInit(String),

    #[error("Hardware I/O failed: {0}")]
    HardwareIo(String),

    #[error("Codec init failed: {0}")]
    CodecInit(String),

    #[error("Codec runtime error: {0}")]
    CodecRuntime(String),

    #[error("Invalid frame size: expected {expected}, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Pipeline already initialized")]
    AlreadyInitialized,

    #[error("Pipeline not ready (state: {0:?})")]
    NotReady(PipelineState),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl AudioError {
    /// Whether this error puts a pipeline into its terminal `Error` state.
    ///
    /// Per-frame failures (codec runtime, bad frame size, transport) only
    /// drop the current frame.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AudioError::HardwareInit(_) | AudioError::HardwareIo(_) | AudioError::CodecInit(_)
        )
    }
}
