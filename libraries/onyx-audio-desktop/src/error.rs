/// Desktop audio errors
use onyx_playback::PlaybackError;
use thiserror::Error;

/// Result type for desktop audio operations
pub type Result<T> = std::result::Result<T, AudioError>;

/// Desktop audio errors
#[derive(Debug, Error)]
pub enum AudioError {
    /// No output device
    #[error("Audio device not found")]
    DeviceNotFound,

    /// Device error reported by the stream
    #[error("Device error: {0}")]
    DeviceError(String),

    /// Failed to build output stream
    #[error("Failed to build output stream: {0}")]
    StreamBuildError(String),

    /// Failed to play stream
    #[error("Failed to play stream: {0}")]
    PlayError(String),

    /// Failed to pause stream
    #[error("Failed to pause stream: {0}")]
    PauseError(String),

    /// Device stopped consuming audio
    #[error("Timed out after {0} ms waiting for the device")]
    Timeout(u64),

    /// Output used before `open`
    #[error("Output stream not open")]
    NotOpen,

    /// Container or codec the source cannot play
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Demuxing or decoding failed
    #[error("Decode error: {0}")]
    Decode(String),

    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<cpal::BuildStreamError> for AudioError {
    fn from(err: cpal::BuildStreamError) -> Self {
        AudioError::StreamBuildError(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for AudioError {
    fn from(err: cpal::PlayStreamError) -> Self {
        AudioError::PlayError(err.to_string())
    }
}

impl From<cpal::PauseStreamError> for AudioError {
    fn from(err: cpal::PauseStreamError) -> Self {
        AudioError::PauseError(err.to_string())
    }
}

impl From<symphonia::core::errors::Error> for AudioError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        use symphonia::core::errors::Error;
        match err {
            Error::IoError(e) => AudioError::Io(e),
            Error::Unsupported(what) => AudioError::UnsupportedFormat(what.to_string()),
            other => AudioError::Decode(other.to_string()),
        }
    }
}

impl From<AudioError> for PlaybackError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::UnsupportedFormat(_) => PlaybackError::UnsupportedStream(err.to_string()),
            AudioError::Decode(_) | AudioError::Io(_) => PlaybackError::Source(err.to_string()),
            _ => PlaybackError::Sink(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_into_playback_errors() {
        let err: PlaybackError = AudioError::UnsupportedFormat("opus".into()).into();
        assert!(matches!(err, PlaybackError::UnsupportedStream(_)));

        let err: PlaybackError = AudioError::Decode("bad packet".into()).into();
        assert!(matches!(err, PlaybackError::Source(_)));

        let err: PlaybackError = AudioError::Timeout(2000).into();
        assert!(matches!(err, PlaybackError::Sink(ref m) if m.contains("2000")));
    }

    #[test]
    fn symphonia_unsupported_is_format_error() {
        let err: AudioError =
            symphonia::core::errors::Error::Unsupported("no suitable format reader found").into();
        assert!(matches!(err, AudioError::UnsupportedFormat(_)));
    }
}
