//! Error types for the playback engine

use thiserror::Error;

/// Playback errors
///
/// Errors raised on the audio thread never reach the caller of a transport
/// method. They end the current session and are reported through the
/// engine's error callback.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Frame source failed (open, seek or read)
    #[error("Frame source error: {0}")]
    Source(String),

    /// Block sink failed (open, start, stop or write)
    #[error("Block sink error: {0}")]
    Sink(String),

    /// Stream parameters the engine cannot play
    #[error("Unsupported stream: {0}")]
    UnsupportedStream(String),

    /// Engine configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Audio thread could not be started
    #[error("Failed to spawn audio thread: {0}")]
    ThreadSpawn(std::io::Error),

    /// Equalizer error
    #[error(transparent)]
    Dsp(#[from] onyx_dsp::DspError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
