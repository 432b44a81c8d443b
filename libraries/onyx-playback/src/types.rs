//! Core types shared by the engine and its collaborators

use serde::{Deserialize, Serialize};

/// Transport state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    /// No audio thread running
    #[default]
    Idle,

    /// Audio thread streaming blocks
    Playing,

    /// Audio thread alive, output suspended
    Paused,
}

impl TransportState {
    /// Whether an audio thread owns a stream in this state
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

/// Format of an opened stream, as reported by a frame source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Frames per second
    pub sample_rate: u32,

    /// Interleaved channels per frame
    pub channels: u16,

    /// Length of the stream in frames
    pub total_frames: u64,
}

impl StreamInfo {
    /// Stream length in milliseconds
    pub fn duration_ms(&self) -> u64 {
        frames_to_ms(self.total_frames, self.sample_rate)
    }
}

/// Convert a frame count to milliseconds, truncating. Zero sample rate gives zero.
pub fn frames_to_ms(frames: u64, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    u64::try_from(u128::from(frames) * 1000 / u128::from(sample_rate)).unwrap_or(u64::MAX)
}

/// Convert milliseconds to a frame index, truncating and saturating at `u64::MAX`
pub fn ms_to_frames(ms: u64, sample_rate: u32) -> u64 {
    u64::try_from(u128::from(ms) * u128::from(sample_rate) / 1000).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_conversions() {
        assert_eq!(frames_to_ms(11025, 22050), 500);
        assert_eq!(frames_to_ms(44100, 44100), 1000);
        assert_eq!(frames_to_ms(1000, 0), 0);
        assert_eq!(ms_to_frames(500, 22050), 11025);
        assert_eq!(ms_to_frames(1, 44100), 44);
    }

    #[test]
    fn huge_values_saturate() {
        assert_eq!(ms_to_frames(1 << 63, 48000), u64::MAX);
        assert_eq!(ms_to_frames(u64::MAX, 192_000), u64::MAX);
        assert_eq!(frames_to_ms(u64::MAX, 1), u64::MAX);
    }

    #[test]
    fn stream_duration() {
        let info = StreamInfo {
            sample_rate: 48000,
            channels: 2,
            total_frames: 48000 * 3 + 24000,
        };
        assert_eq!(info.duration_ms(), 3500);
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(TransportState::default(), TransportState::Idle);
        assert!(!TransportState::Idle.is_active());
        assert!(TransportState::Paused.is_active());
    }
}
