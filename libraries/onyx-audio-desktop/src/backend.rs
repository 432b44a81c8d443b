//! Desktop audio backend

use crate::sink::{CpalBlockSink, SinkConfig};
use crate::source::FileFrameSource;
use cpal::traits::HostTrait;
use onyx_playback::{AudioBackend, BlockSink, FrameSource};
use tracing::{info, warn};

/// Symphonia decoding with CPAL output on the default device
///
/// Availability is probed once at construction. A machine without an output
/// device yields a backend that reports unavailable instead of an error, so
/// the engine can still be built and configured.
#[derive(Debug, Clone)]
pub struct DesktopBackend {
    sink_config: SinkConfig,
    available: bool,
}

impl DesktopBackend {
    pub fn new() -> Self {
        Self::with_config(SinkConfig::default())
    }

    pub fn with_config(sink_config: SinkConfig) -> Self {
        let host = cpal::default_host();
        let available = host.default_output_device().is_some();

        if available {
            info!(host = ?host.id(), "audio output available");
        } else {
            warn!(host = ?host.id(), "no default output device");
        }

        Self {
            sink_config,
            available,
        }
    }

    pub fn sink_config(&self) -> &SinkConfig {
        &self.sink_config
    }
}

impl Default for DesktopBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for DesktopBackend {
    fn is_available(&self) -> bool {
        self.available
    }

    fn frame_source(&self) -> Box<dyn FrameSource> {
        Box::new(FileFrameSource::new())
    }

    fn block_sink(&self) -> Box<dyn BlockSink> {
        Box::new(CpalBlockSink::new(self.sink_config.clone()))
    }
}
