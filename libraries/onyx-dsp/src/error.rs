//! Error types for the equalizer

use thiserror::Error;

/// DSP errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DspError {
    /// Sample rate must be positive
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    /// Channel count must be positive
    #[error("Invalid channel count: {0}")]
    InvalidChannelCount(u16),

    /// Gain vectors carry exactly one value per band
    #[error("Expected {expected} band gains, got {actual}")]
    BandCount {
        /// Number of bands the equalizer has
        expected: usize,
        /// Number of values supplied
        actual: usize,
    },
}

/// Result type for DSP operations
pub type Result<T> = std::result::Result<T, DspError>;
