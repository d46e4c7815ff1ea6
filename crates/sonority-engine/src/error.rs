//! Engine result codes.

use thiserror::Error;

/// Error codes returned by engine calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The handle never existed or its slot was released.
    #[error("Invalid handle")]
    InvalidHandle,

    /// The voice was taken over by a more important sound.
    #[error("Channel was stolen by another sound")]
    ChannelStolen,

    /// A parameter was out of range or contradictory.
    #[error("Invalid parameter: {0}")]
    InvalidParam(&'static str),

    /// The file system could not find the file.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A read reached the end of the file.
    #[error("End of file")]
    FileEof,

    /// The file could not be read or is corrupt.
    #[error("Bad file: {0}")]
    FileBad(String),

    /// The data is in a format the engine cannot decode.
    #[error("Unsupported format: {0}")]
    Format(String),

    /// The sound is still opening.
    #[error("Sound is not ready")]
    NotReady,

    /// A 3D-only call was made on a 2D voice.
    #[error("Operation needs a 3D voice")]
    Needs3D,

    /// No voice could be allocated.
    #[error("No voice available")]
    ChannelAlloc,

    /// The engine has not been initialized.
    #[error("Engine not initialized")]
    Uninitialized,

    /// The call is only valid before initialization.
    #[error("Engine already initialized")]
    Initialized,

    /// The output device failed.
    #[error("Output device error: {0}")]
    Output(String),
}

impl EngineError {
    /// Whether the error means the voice behind a handle is gone.
    #[must_use]
    pub fn is_handle_revoked(&self) -> bool {
        matches!(self, Self::InvalidHandle | Self::ChannelStolen)
    }
}

/// Result type for engine calls.
pub type EngineResult<T> = Result<T, EngineError>;
