//! Frame source trait
//!
//! Abstracts file decoding. The engine creates, opens, reads and closes a
//! source entirely on its audio thread, so implementations need not be `Send`.

use crate::error::Result;
use crate::types::StreamInfo;
use std::path::Path;

/// Seekable stream of interleaved `f32` frames
pub trait FrameSource {
    /// Open a file and report its format
    ///
    /// # Returns
    /// * `Ok(info)` - Sample rate, channel count and total frames
    /// * `Err(_)` - Missing file, unsupported format, etc.
    fn open(&mut self, path: &Path) -> Result<StreamInfo>;

    /// Reposition to a frame index
    ///
    /// The engine only requests indices inside `[0, total_frames)`.
    fn seek(&mut self, frame: u64) -> Result<()>;

    /// Read up to `buffer.len() / channels` frames into `buffer`
    ///
    /// Samples are interleaved and normalized to [-1.0, 1.0].
    ///
    /// # Returns
    /// * `Ok(n)` - Number of whole frames written (0 = end of stream)
    /// * `Err(_)` - Decoding error
    fn read_frames(&mut self, buffer: &mut [f32]) -> Result<usize>;

    /// Index of the next frame `read_frames` will return
    fn tell(&self) -> u64;

    /// Release the underlying file
    fn close(&mut self) -> Result<()>;
}
