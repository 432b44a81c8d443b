//! Block sink trait
//!
//! Abstracts the output device. Like [`FrameSource`](crate::FrameSource), a
//! sink lives and dies on the audio thread.

use crate::error::Result;

/// Blocking consumer of interleaved `f32` blocks
pub trait BlockSink {
    /// Prepare an output stream for the given format
    fn open(&mut self, sample_rate: u32, channels: u16, block_frames: usize) -> Result<()>;

    /// Start (or restart after [`stop`](Self::stop)) consuming audio
    fn start(&mut self) -> Result<()>;

    /// Suspend output without discarding the stream
    fn stop(&mut self) -> Result<()>;

    /// Queue one block, blocking while the device catches up
    fn write(&mut self, block: &[f32]) -> Result<()>;

    /// Flush and release the stream
    fn close(&mut self) -> Result<()>;
}
