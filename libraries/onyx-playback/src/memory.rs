//! In-memory backend for tests
//!
//! Tracks are registered under a path and decoded from memory; output blocks
//! are captured instead of played. Optionally paces writes in real time and
//! injects source or sink failures.

use crate::backend::AudioBackend;
use crate::error::{PlaybackError, Result};
use crate::sink::BlockSink;
use crate::source::FrameSource;
use crate::types::{ms_to_frames, StreamInfo};
use std::collections::HashMap;
use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Interleaved audio held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTrack {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl MemoryTrack {
    /// Wrap interleaved samples
    pub fn from_samples(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels,
            samples,
        }
    }

    /// Digital silence of the given length
    pub fn silent(sample_rate: u32, channels: u16, duration_ms: u64) -> Self {
        let frames = ms_to_frames(duration_ms, sample_rate) as usize;
        Self::from_samples(sample_rate, channels, vec![0.0; frames * usize::from(channels)])
    }

    /// Sine wave, identical on every channel
    pub fn sine(
        sample_rate: u32,
        channels: u16,
        frequency: f32,
        amplitude: f32,
        duration_ms: u64,
    ) -> Self {
        let frames = ms_to_frames(duration_ms, sample_rate) as usize;
        let samples = (0..frames)
            .flat_map(|i| {
                let t = i as f32 / sample_rate as f32;
                let s = amplitude * (TAU * frequency * t).sin();
                std::iter::repeat(s).take(usize::from(channels))
            })
            .collect();
        Self::from_samples(sample_rate, channels, samples)
    }

    pub fn frames(&self) -> u64 {
        if self.channels == 0 {
            return 0;
        }
        (self.samples.len() / usize::from(self.channels)) as u64
    }

    fn info(&self) -> StreamInfo {
        StreamInfo {
            sample_rate: self.sample_rate,
            channels: self.channels,
            total_frames: self.frames(),
        }
    }
}

/// Everything the engine did to the backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capture {
    /// `(sample_rate, channels, block_frames)` of the last opened sink
    pub format: Option<(u32, u16, usize)>,
    /// All written samples, interleaved
    pub samples: Vec<f32>,
    pub blocks: usize,
    pub sink_opens: usize,
    pub sink_closes: usize,
    pub starts: usize,
    pub stops: usize,
    pub source_opens: usize,
    pub source_closes: usize,
}

type Tracks = Arc<Mutex<HashMap<PathBuf, MemoryTrack>>>;
type SharedCapture = Arc<Mutex<Capture>>;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Test backend producing [`MemorySource`]s and [`CaptureSink`]s
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    available: bool,
    realtime: bool,
    fail_reads_after: Option<u64>,
    fail_sink_open: bool,
    tracks: Tracks,
    capture: SharedCapture,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            available: true,
            realtime: false,
            fail_reads_after: None,
            fail_sink_open: false,
            tracks: Arc::default(),
            capture: Arc::default(),
        }
    }

    /// Backend reporting that no output device exists
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Register a track under `path`
    pub fn with_track(self, path: impl Into<PathBuf>, track: MemoryTrack) -> Self {
        self.insert_track(path, track);
        self
    }

    /// Sleep for each written block's duration, like a real device
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Fail every read once the source position reaches `frames`
    pub fn fail_reads_after(mut self, frames: u64) -> Self {
        self.fail_reads_after = Some(frames);
        self
    }

    /// Fail every sink open
    pub fn fail_sink_open(mut self) -> Self {
        self.fail_sink_open = true;
        self
    }

    pub fn insert_track(&self, path: impl Into<PathBuf>, track: MemoryTrack) {
        lock(&self.tracks).insert(path.into(), track);
    }

    /// Snapshot of everything captured so far
    pub fn capture(&self) -> Capture {
        lock(&self.capture).clone()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for MemoryBackend {
    fn is_available(&self) -> bool {
        self.available
    }

    fn frame_source(&self) -> Box<dyn FrameSource> {
        Box::new(MemorySource {
            tracks: Arc::clone(&self.tracks),
            capture: Arc::clone(&self.capture),
            fail_reads_after: self.fail_reads_after,
            track: None,
            position: 0,
        })
    }

    fn block_sink(&self) -> Box<dyn BlockSink> {
        Box::new(CaptureSink {
            capture: Arc::clone(&self.capture),
            realtime: self.realtime,
            fail_open: self.fail_sink_open,
            sample_rate: 0,
            channels: 0,
        })
    }
}

/// Frame source reading a registered [`MemoryTrack`]
pub struct MemorySource {
    tracks: Tracks,
    capture: SharedCapture,
    fail_reads_after: Option<u64>,
    track: Option<MemoryTrack>,
    position: u64,
}

impl MemorySource {
    fn track(&self) -> Result<&MemoryTrack> {
        self.track
            .as_ref()
            .ok_or_else(|| PlaybackError::Source("source not open".to_string()))
    }
}

impl FrameSource for MemorySource {
    fn open(&mut self, path: &Path) -> Result<StreamInfo> {
        let track = lock(&self.tracks).get(path).cloned().ok_or_else(|| {
            PlaybackError::Source(format!("no such track: {}", path.display()))
        })?;

        let info = track.info();
        self.track = Some(track);
        self.position = 0;
        lock(&self.capture).source_opens += 1;
        Ok(info)
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        let total = self.track()?.frames();
        self.position = frame.min(total);
        Ok(())
    }

    fn read_frames(&mut self, buffer: &mut [f32]) -> Result<usize> {
        if let Some(limit) = self.fail_reads_after {
            if self.position >= limit {
                return Err(PlaybackError::Source(format!(
                    "injected read failure at frame {}",
                    self.position
                )));
            }
        }

        let track = self.track()?;
        let channels = usize::from(track.channels);
        let remaining = (track.frames() - self.position) as usize;
        let frames = (buffer.len() / channels).min(remaining);

        let start = self.position as usize * channels;
        let len = frames * channels;
        buffer[..len].copy_from_slice(&track.samples[start..start + len]);

        self.position += frames as u64;
        Ok(frames)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn close(&mut self) -> Result<()> {
        if self.track.take().is_some() {
            lock(&self.capture).source_closes += 1;
        }
        Ok(())
    }
}

/// Block sink appending everything it receives to a [`Capture`]
pub struct CaptureSink {
    capture: SharedCapture,
    realtime: bool,
    fail_open: bool,
    sample_rate: u32,
    channels: u16,
}

impl BlockSink for CaptureSink {
    fn open(&mut self, sample_rate: u32, channels: u16, block_frames: usize) -> Result<()> {
        if self.fail_open {
            return Err(PlaybackError::Sink("injected open failure".to_string()));
        }
        self.sample_rate = sample_rate;
        self.channels = channels;

        let mut capture = lock(&self.capture);
        capture.format = Some((sample_rate, channels, block_frames));
        capture.sink_opens += 1;
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        lock(&self.capture).starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        lock(&self.capture).stops += 1;
        Ok(())
    }

    fn write(&mut self, block: &[f32]) -> Result<()> {
        {
            let mut capture = lock(&self.capture);
            capture.samples.extend_from_slice(block);
            capture.blocks += 1;
        }

        if self.realtime && self.sample_rate > 0 && self.channels > 0 {
            let frames = block.len() / usize::from(self.channels);
            let secs = frames as f64 / f64::from(self.sample_rate);
            std::thread::sleep(Duration::from_secs_f64(secs));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        lock(&self.capture).sink_closes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_track_length() {
        let track = MemoryTrack::silent(22050, 1, 500);
        assert_eq!(track.frames(), 11025);
        assert!(track.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sine_track_is_interleaved() {
        let track = MemoryTrack::sine(8000, 2, 1000.0, 0.5, 10);
        assert_eq!(track.frames(), 80);
        for frame in track.samples.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
            assert!(frame[0].abs() <= 0.5);
        }
    }

    #[test]
    fn source_reads_to_end() {
        let samples: Vec<f32> = (0..10).map(|i| i as f32 / 10.0).collect();
        let backend =
            MemoryBackend::new().with_track("a", MemoryTrack::from_samples(100, 2, samples));
        let mut source = backend.frame_source();

        let info = source.open(Path::new("a")).unwrap();
        assert_eq!(info.total_frames, 5);

        let mut buffer = [0.0_f32; 6];
        assert_eq!(source.read_frames(&mut buffer).unwrap(), 3);
        assert_eq!(source.tell(), 3);
        assert_eq!(buffer[0], 0.0);
        assert_eq!(buffer[5], 0.5);

        assert_eq!(source.read_frames(&mut buffer).unwrap(), 2);
        assert_eq!(source.read_frames(&mut buffer).unwrap(), 0);

        source.seek(1).unwrap();
        assert_eq!(source.read_frames(&mut buffer).unwrap(), 3);
        assert_eq!(buffer[0], 0.2);

        source.close().unwrap();
        assert_eq!(backend.capture().source_closes, 1);
    }

    #[test]
    fn missing_track_fails_open() {
        let backend = MemoryBackend::new();
        let mut source = backend.frame_source();
        assert!(matches!(
            source.open(Path::new("missing")),
            Err(PlaybackError::Source(_))
        ));
    }

    #[test]
    fn injected_read_failure() {
        let backend = MemoryBackend::new()
            .with_track("a", MemoryTrack::silent(1000, 1, 100))
            .fail_reads_after(50);
        let mut source = backend.frame_source();
        source.open(Path::new("a")).unwrap();

        let mut buffer = [0.0_f32; 40];
        assert_eq!(source.read_frames(&mut buffer).unwrap(), 40);
        assert_eq!(source.read_frames(&mut buffer).unwrap(), 40);
        assert!(source.read_frames(&mut buffer).is_err());
    }

    #[test]
    fn sink_captures_blocks() {
        let backend = MemoryBackend::new();
        let mut sink = backend.block_sink();
        sink.open(44100, 2, 4).unwrap();
        sink.start().unwrap();
        sink.write(&[0.1, 0.2, 0.3, 0.4]).unwrap();
        sink.write(&[0.5, 0.6]).unwrap();
        sink.stop().unwrap();
        sink.close().unwrap();

        let capture = backend.capture();
        assert_eq!(capture.format, Some((44100, 2, 4)));
        assert_eq!(capture.samples, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(capture.blocks, 2);
        assert_eq!((capture.starts, capture.stops), (1, 1));
        assert_eq!((capture.sink_opens, capture.sink_closes), (1, 1));
    }
}
