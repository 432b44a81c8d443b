//! Audio backend: factory for sources and sinks

use crate::sink::BlockSink;
use crate::source::FrameSource;

/// Platform audio backend
///
/// Shared between the control side and the audio thread. The factory
/// methods are only ever called on the audio thread.
pub trait AudioBackend: Send + Sync {
    /// Whether the backend initialized at all
    ///
    /// When `false` the engine turns every transport call into a no-op.
    fn is_available(&self) -> bool;

    /// Create an unopened frame source
    fn frame_source(&self) -> Box<dyn FrameSource>;

    /// Create an unopened block sink
    fn block_sink(&self) -> Box<dyn BlockSink>;
}
