//! Engine configuration

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`PlaybackEngine`](crate::PlaybackEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Frames read, filtered and written per loop iteration (default: 1024)
    #[serde(default = "default_block_frames")]
    pub block_frames: usize,

    /// Volume before the first `set_volume` call, 0.0 - 1.0 (default: 0.7)
    #[serde(default = "default_volume")]
    pub default_volume: f64,

    /// Upper bound on waiting for the audio thread in `stop()` (default: 1500 ms)
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
}

fn default_block_frames() -> usize {
    1024
}

fn default_volume() -> f64 {
    0.7
}

fn default_join_timeout_ms() -> u64 {
    1500
}

impl EngineConfig {
    /// Join timeout as a `Duration`
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.block_frames == 0 {
            return Err(PlaybackError::InvalidConfig(
                "block_frames must be at least 1".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(PlaybackError::InvalidConfig(format!(
                "default_volume {} is outside 0.0 - 1.0",
                self.default_volume
            )));
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_frames: default_block_frames(),
            default_volume: default_volume(),
            join_timeout_ms: default_join_timeout_ms(),
        }
    }
}
