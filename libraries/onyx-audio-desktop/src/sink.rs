//! CPAL block sink
//!
//! The engine's audio thread pushes whole blocks into a bounded queue; the
//! device callback pops them and copies samples out as the hardware asks.
//! The queue depth bounds latency, and a full queue is what makes `write`
//! block at the device's pace.

use crate::error::{AudioError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TryRecvError};
use onyx_playback::BlockSink;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Output queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Blocks queued ahead of the device (default: 4)
    #[serde(default = "default_queue_blocks")]
    pub queue_blocks: usize,

    /// How long `write` waits for queue space before failing (default: 2000 ms)
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// How long `close` waits for queued audio to play out (default: 1000 ms)
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

fn default_queue_blocks() -> usize {
    4
}

fn default_write_timeout_ms() -> u64 {
    2000
}

fn default_drain_timeout_ms() -> u64 {
    1000
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            queue_blocks: default_queue_blocks(),
            write_timeout_ms: default_write_timeout_ms(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

/// Consumer side of the block queue, owned by the device callback
struct BlockReader {
    blocks: Receiver<Vec<f32>>,
    current: Vec<f32>,
    offset: usize,
    underruns: Arc<AtomicU64>,
}

impl BlockReader {
    fn new(blocks: Receiver<Vec<f32>>, underruns: Arc<AtomicU64>) -> Self {
        Self {
            blocks,
            current: Vec::new(),
            offset: 0,
            underruns,
        }
    }

    /// Fill `output` from queued blocks; missing samples are silence
    fn fill(&mut self, output: &mut [f32]) {
        let mut written = 0;

        while written < output.len() {
            if self.offset == self.current.len() {
                match self.blocks.try_recv() {
                    Ok(block) => {
                        self.current = block;
                        self.offset = 0;
                        continue;
                    }
                    Err(TryRecvError::Empty) => {
                        self.underruns.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Err(TryRecvError::Disconnected) => break,
                }
            }

            let n = (self.current.len() - self.offset).min(output.len() - written);
            output[written..written + n]
                .copy_from_slice(&self.current[self.offset..self.offset + n]);
            self.offset += n;
            written += n;
        }

        output[written..].fill(0.0);
    }
}

/// Block sink on the default CPAL output device
///
/// Plays f32 at the stream's own sample rate and channel count; there is no
/// resampling, so a device that rejects the format fails `open`.
pub struct CpalBlockSink {
    config: SinkConfig,
    stream: Option<Stream>,
    blocks: Option<Sender<Vec<f32>>>,
    /// Last error reported by the stream's error callback
    device_error: Arc<Mutex<Option<String>>>,
    underruns: Arc<AtomicU64>,
}

impl CpalBlockSink {
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            stream: None,
            blocks: None,
            device_error: Arc::new(Mutex::new(None)),
            underruns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Device callbacks that found the queue empty
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    fn stream(&self) -> Result<&Stream> {
        self.stream.as_ref().ok_or(AudioError::NotOpen)
    }

    fn check_device(&self) -> Result<()> {
        let error = self
            .device_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match error {
            Some(message) => Err(AudioError::DeviceError(message)),
            None => Ok(()),
        }
    }

    fn open_stream(&mut self, sample_rate: u32, channels: u16) -> Result<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::DeviceNotFound)?;

        let config = StreamConfig {
            channels,
            sample_rate,
            buffer_size: BufferSize::Default,
        };

        let (tx, rx) = bounded(self.config.queue_blocks.max(1));
        let mut reader = BlockReader::new(rx, Arc::clone(&self.underruns));
        let device_error = Arc::clone(&self.device_error);

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| reader.fill(data),
            move |err| {
                warn!(error = %err, "audio stream error");
                *device_error.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(err.to_string());
            },
            None,
        )?;

        debug!(sample_rate, channels, "output stream built");

        self.stream = Some(stream);
        self.blocks = Some(tx);
        Ok(())
    }

    fn write_block(&mut self, block: &[f32]) -> Result<()> {
        self.check_device()?;
        let blocks = self.blocks.as_ref().ok_or(AudioError::NotOpen)?;
        let timeout = Duration::from_millis(self.config.write_timeout_ms);

        match blocks.send_timeout(block.to_vec(), timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => {
                Err(AudioError::Timeout(self.config.write_timeout_ms))
            }
            Err(SendTimeoutError::Disconnected(_)) => Err(AudioError::DeviceError(
                "output stream closed".to_string(),
            )),
        }
    }

    /// Wait (bounded) for the callback to take every queued block
    fn drain(&self) {
        let Some(blocks) = &self.blocks else {
            return;
        };
        let deadline = Instant::now() + Duration::from_millis(self.config.drain_timeout_ms);

        while !blocks.is_empty() {
            if Instant::now() >= deadline {
                debug!(queued = blocks.len(), "dropping undrained output");
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl BlockSink for CpalBlockSink {
    fn open(
        &mut self,
        sample_rate: u32,
        channels: u16,
        _block_frames: usize,
    ) -> onyx_playback::Result<()> {
        Ok(self.open_stream(sample_rate, channels)?)
    }

    fn start(&mut self) -> onyx_playback::Result<()> {
        self.stream()?.play().map_err(AudioError::from)?;
        Ok(())
    }

    fn stop(&mut self) -> onyx_playback::Result<()> {
        self.stream()?.pause().map_err(AudioError::from)?;
        Ok(())
    }

    fn write(&mut self, block: &[f32]) -> onyx_playback::Result<()> {
        Ok(self.write_block(block)?)
    }

    fn close(&mut self) -> onyx_playback::Result<()> {
        self.drain();
        self.blocks = None;
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!(error = %e, "failed to pause stream on close");
            }
        }

        let underruns = self.underruns();
        if underruns > 0 {
            debug!(underruns, "output stream closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(depth: usize) -> (Sender<Vec<f32>>, BlockReader, Arc<AtomicU64>) {
        let (tx, rx) = bounded(depth);
        let underruns = Arc::new(AtomicU64::new(0));
        (tx, BlockReader::new(rx, Arc::clone(&underruns)), underruns)
    }

    #[test]
    fn default_config() {
        let config = SinkConfig::default();
        assert_eq!(config.queue_blocks, 4);
        assert_eq!(config.write_timeout_ms, 2000);
        assert_eq!(config.drain_timeout_ms, 1000);
    }

    #[test]
    fn fill_spans_block_boundaries() {
        let (tx, mut reader, underruns) = reader(4);
        tx.send(vec![1.0, 2.0, 3.0]).unwrap();
        tx.send(vec![4.0, 5.0]).unwrap();

        let mut out = [0.0_f32; 4];
        reader.fill(&mut out);
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0]);

        let mut out = [9.0_f32; 1];
        reader.fill(&mut out);
        assert_eq!(out, [5.0]);
        assert_eq!(underruns.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn underrun_plays_silence() {
        let (tx, mut reader, underruns) = reader(4);
        tx.send(vec![0.5, 0.5]).unwrap();

        let mut out = [9.0_f32; 5];
        reader.fill(&mut out);
        assert_eq!(out, [0.5, 0.5, 0.0, 0.0, 0.0]);
        assert_eq!(underruns.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn closed_queue_plays_silence() {
        let (tx, mut reader, underruns) = reader(1);
        drop(tx);

        let mut out = [9.0_f32; 3];
        reader.fill(&mut out);
        assert_eq!(out, [0.0; 3]);
        assert_eq!(underruns.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn unopened_sink_errors() {
        let mut sink = CpalBlockSink::new(SinkConfig::default());
        assert!(sink.start().is_err());
        assert!(sink.write(&[0.0; 4]).is_err());
        assert!(sink.close().is_ok());
    }
}
