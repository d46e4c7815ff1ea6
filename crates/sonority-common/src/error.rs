//! Error types for Sonority sound systems.

use thiserror::Error;

/// Top-level error type for sound-system operations.
#[derive(Debug, Error)]
pub enum SoundError {
    /// The backend could not bring up its engine session.
    #[error("Sound system initialization failed: {0}")]
    Initialization(String),

    /// An engine call failed and the active error policy propagates failures.
    #[error("Engine error in {operation}: {message}")]
    Engine {
        /// Engine call that failed
        operation: &'static str,
        /// Engine error text
        message: String,
    },

    /// The engine decoded a sample format the host interface cannot represent.
    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    /// A sound could not be created from the given path.
    #[error("Failed to load sound '{path}': {message}")]
    LoadFailed {
        /// Normalized path of the sound
        path: String,
        /// Error message
        message: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SoundError {
    /// Builds an engine error for the given operation.
    pub fn engine(operation: &'static str, message: impl ToString) -> Self {
        Self::Engine {
            operation,
            message: message.to_string(),
        }
    }
}

/// Result type alias for sound-system operations.
pub type SoundResult<T> = Result<T, SoundError>;
