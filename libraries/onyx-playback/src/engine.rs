//! Playback engine
//!
//! The control side (any thread holding the engine) only mutates a small
//! shared control block. A single audio thread per engine owns the frame
//! source and block sink, reads the control block once per block, filters
//! and scales the audio, and writes it out.
//!
//! # Sessions
//!
//! Every `play()` starts a new session tagged with a generation number.
//! `stop()` bumps the generation after joining, so an audio thread that
//! outlived the bounded join can no longer touch shared state or fire
//! callbacks.

use crate::backend::AudioBackend;
use crate::config::EngineConfig;
use crate::error::{PlaybackError, Result};
use crate::events::Callbacks;
use crate::sink::BlockSink;
use crate::source::FrameSource;
use crate::types::{frames_to_ms, ms_to_frames, StreamInfo, TransportState};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use onyx_dsp::{FilterBank, GainVector};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, warn};

/// State shared between the control side and the audio thread
///
/// Guarded by a single mutex that is never held across I/O.
#[derive(Debug)]
struct Control {
    /// Session tag; the audio thread exits once this moves past its own
    generation: u64,
    state: TransportState,
    stop: bool,
    paused: bool,
    seek_ms: Option<u64>,
    gains: GainVector,
    volume: f64,
    sample_rate: u32,
    position_frames: u64,
    total_frames: u64,
    /// Thread running the current session, set once it starts
    audio_thread: Option<ThreadId>,
}

impl Control {
    fn is_cancelled(&self, generation: u64) -> bool {
        self.stop || self.generation != generation
    }

    fn position_ms(&self) -> u64 {
        frames_to_ms(self.position_frames, self.sample_rate)
    }

    fn duration_ms(&self) -> u64 {
        frames_to_ms(self.total_frames, self.sample_rate)
    }

    fn clear_stream(&mut self) {
        self.sample_rate = 0;
        self.position_frames = 0;
        self.total_frames = 0;
        self.seek_ms = None;
    }
}

struct Shared {
    control: Mutex<Control>,
    /// Signalled on resume and stop
    wake: Condvar,
    callbacks: Callbacks,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle on a running (or finished, not yet joined) audio thread
struct Worker {
    handle: JoinHandle<()>,
    /// Disconnects when the audio thread exits
    done: Receiver<()>,
}

/// Real-time equalized playback engine
///
/// All methods take `&self`, so the engine can be shared behind an `Arc`
/// between a UI thread and callbacks.
///
/// # Example
///
/// ```rust,no_run
/// use onyx_playback::{AudioBackend, PlaybackEngine};
/// use onyx_dsp::GainVector;
/// use std::sync::Arc;
///
/// # fn example(backend: Arc<dyn AudioBackend>) -> onyx_playback::Result<()> {
/// let engine = PlaybackEngine::new(backend);
/// engine.on_finished(|| println!("done"));
/// engine.set_gains(GainVector::new([4.0, 2.0, 0.0, 0.0, -2.0]));
/// engine.play("/music/song.flac", 0)?;
/// engine.set_volume(0.5);
/// engine.seek(30_000);
/// engine.stop();
/// # Ok(())
/// # }
/// ```
pub struct PlaybackEngine {
    backend: Arc<dyn AudioBackend>,
    config: EngineConfig,
    shared: Arc<Shared>,
    /// Serializes play/stop so at most one audio thread is live
    worker: Mutex<Option<Worker>>,
}

impl PlaybackEngine {
    /// Create an engine with default configuration
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self::build(backend, EngineConfig::default())
    }

    /// Create an engine with custom configuration
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the configuration does not validate.
    pub fn with_config(backend: Arc<dyn AudioBackend>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(backend, config))
    }

    fn build(backend: Arc<dyn AudioBackend>, config: EngineConfig) -> Self {
        let control = Control {
            generation: 0,
            state: TransportState::Idle,
            stop: false,
            paused: false,
            seek_ms: None,
            gains: GainVector::FLAT,
            volume: config.default_volume,
            sample_rate: 0,
            position_frames: 0,
            total_frames: 0,
            audio_thread: None,
        };

        if !backend.is_available() {
            warn!("audio backend unavailable; playback disabled");
        }

        Self {
            backend,
            config,
            shared: Arc::new(Shared {
                control: Mutex::new(control),
                wake: Condvar::new(),
                callbacks: Callbacks::default(),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether the audio backend initialized
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    // ===== Transport =====

    /// Start playing a file from `start_ms`
    ///
    /// Any current playback is stopped and its audio thread joined first.
    /// The start position is clamped to the stream once it is opened. Open
    /// and decode failures are reported through [`on_error`](Self::on_error),
    /// not returned here.
    ///
    /// # Errors
    /// Only if the audio thread cannot be spawned.
    pub fn play(&self, path: impl AsRef<Path>, start_ms: u64) -> Result<()> {
        if !self.is_available() {
            debug!("play ignored: backend unavailable");
            return Ok(());
        }

        let path = path.as_ref().to_path_buf();
        let mut slot = if self.on_audio_thread() {
            // A control-side play or stop holding the lock is waiting on
            // this thread, and supersedes this request
            match self.worker.try_lock() {
                Ok(slot) => slot,
                Err(TryLockError::Poisoned(e)) => e.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    debug!("play from callback superseded by a concurrent transport call");
                    return Ok(());
                }
            }
        } else {
            self.lock_worker()
        };
        self.stop_worker(&mut slot);

        let generation = {
            let mut ctl = self.shared.lock();
            ctl.clear_stream();
            ctl.paused = false;
            ctl.state = TransportState::Playing;
            ctl.generation
        };

        let (done_tx, done_rx) = bounded(0);
        let session = Session {
            shared: Arc::clone(&self.shared),
            backend: Arc::clone(&self.backend),
            generation,
            block_frames: self.config.block_frames,
            path,
            start_ms,
            _done: done_tx,
        };

        debug!(path = %session.path.display(), start_ms, generation, "starting playback");

        let spawned = thread::Builder::new()
            .name("onyx-audio".to_string())
            .spawn(move || session.run());

        match spawned {
            Ok(handle) => {
                *slot = Some(Worker {
                    handle,
                    done: done_rx,
                });
                Ok(())
            }
            Err(e) => {
                self.shared.lock().state = TransportState::Idle;
                Err(PlaybackError::ThreadSpawn(e))
            }
        }
    }

    /// Suspend output; the audio thread blocks until resumed or stopped
    pub fn pause(&self) {
        if !self.is_available() {
            return;
        }
        let mut ctl = self.shared.lock();
        ctl.paused = true;
        if ctl.state == TransportState::Playing {
            ctl.state = TransportState::Paused;
        }
    }

    /// Resume after [`pause`](Self::pause)
    pub fn resume(&self) {
        if !self.is_available() {
            return;
        }
        {
            let mut ctl = self.shared.lock();
            ctl.paused = false;
            if ctl.state == TransportState::Paused {
                ctl.state = TransportState::Playing;
            }
        }
        self.shared.wake.notify_all();
    }

    /// Request a jump to `ms`
    ///
    /// The target is stored as given and applied (clamped to the stream) at
    /// the start of the next block. A newer request replaces an unconsumed
    /// one.
    pub fn seek(&self, ms: u64) {
        if !self.is_available() {
            return;
        }
        self.shared.lock().seek_ms = Some(ms);
    }

    /// Stop playback and join the audio thread (bounded wait)
    ///
    /// Safe to call when idle, repeatedly, or from inside a callback.
    pub fn stop(&self) {
        if self.on_audio_thread() {
            // Retire the session without the worker lock; the handle is
            // joined by the next play, stop or drop
            {
                let mut ctl = self.shared.lock();
                ctl.generation = ctl.generation.wrapping_add(1);
                ctl.clear_stream();
                ctl.paused = false;
                ctl.state = TransportState::Idle;
            }
            self.shared.wake.notify_all();
            debug!("stop requested from the audio thread");
            return;
        }

        let mut slot = self.lock_worker();
        self.stop_worker(&mut slot);

        let mut ctl = self.shared.lock();
        ctl.clear_stream();
        ctl.paused = false;
        ctl.state = TransportState::Idle;
    }

    // ===== Parameters =====

    /// Replace all five band gains; applied from the next block
    pub fn set_gains(&self, gains: impl Into<GainVector>) {
        self.shared.lock().gains = gains.into();
    }

    /// Set output volume, clamped to 0.0 - 1.0. NaN is ignored.
    pub fn set_volume(&self, volume: f64) {
        if volume.is_nan() {
            return;
        }
        self.shared.lock().volume = volume.clamp(0.0, 1.0);
    }

    /// Current band gains
    pub fn gains(&self) -> GainVector {
        self.shared.lock().gains
    }

    /// Current volume
    pub fn volume(&self) -> f64 {
        self.shared.lock().volume
    }

    // ===== State =====

    /// Transport state
    pub fn state(&self) -> TransportState {
        self.shared.lock().state
    }

    /// Whether the pause flag is set
    pub fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    /// Seek target not yet consumed by the audio thread
    pub fn pending_seek_ms(&self) -> Option<u64> {
        self.shared.lock().seek_ms
    }

    /// Position of the last block read, in milliseconds
    pub fn position_ms(&self) -> u64 {
        self.shared.lock().position_ms()
    }

    /// Length of the current stream in milliseconds (0 before it is opened)
    pub fn duration_ms(&self) -> u64 {
        self.shared.lock().duration_ms()
    }

    // ===== Callbacks =====

    /// Called once when a stream plays to its end
    pub fn on_finished<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.callbacks.set_finished(Some(Arc::new(callback)));
    }

    /// Called after every block with `(position_ms, duration_ms)`
    pub fn on_position<F>(&self, callback: F)
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        self.shared.callbacks.set_position(Some(Arc::new(callback)));
    }

    /// Called when a session ends because the source or sink failed
    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(&PlaybackError) + Send + Sync + 'static,
    {
        self.shared.callbacks.set_error(Some(Arc::new(callback)));
    }

    /// Remove all registered callbacks
    pub fn clear_callbacks(&self) {
        self.shared.callbacks.set_finished(None);
        self.shared.callbacks.set_position(None);
        self.shared.callbacks.set_error(None);
    }

    // ===== Internals =====

    fn on_audio_thread(&self) -> bool {
        self.shared.lock().audio_thread == Some(thread::current().id())
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Signal the current session to end, wait for its thread, then retire
    /// its generation
    fn stop_worker(&self, slot: &mut Option<Worker>) {
        self.shared.lock().stop = true;
        self.shared.wake.notify_all();

        if let Some(worker) = slot.take() {
            if worker.handle.thread().id() == thread::current().id() {
                // Called from a callback; the thread exits once it returns
                debug!("skipping join from the audio thread");
            } else {
                match worker.done.recv_timeout(self.config.join_timeout()) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        if worker.handle.join().is_err() {
                            warn!("audio thread panicked");
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        warn!(
                            timeout_ms = self.config.join_timeout_ms,
                            "audio thread did not exit in time; detaching"
                        );
                    }
                }
            }
        }

        let mut ctl = self.shared.lock();
        ctl.generation = ctl.generation.wrapping_add(1);
        ctl.stop = false;
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        let mut slot = self.lock_worker();
        self.stop_worker(&mut slot);
    }
}

/// How a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// Source reached end of stream
    Finished,
    /// Stop requested or session superseded
    Stopped,
}

/// One playback session, run on the audio thread
struct Session {
    shared: Arc<Shared>,
    backend: Arc<dyn AudioBackend>,
    generation: u64,
    block_frames: usize,
    path: PathBuf,
    start_ms: u64,
    /// Dropped when the thread exits, which wakes `stop_worker`
    _done: Sender<()>,
}

impl Session {
    fn run(self) {
        {
            let mut ctl = self.shared.lock();
            if ctl.generation == self.generation {
                ctl.audio_thread = Some(thread::current().id());
            }
        }

        let outcome = self.open_and_stream();

        let current = {
            let mut ctl = self.shared.lock();
            let current = ctl.generation == self.generation;
            if current {
                ctl.state = TransportState::Idle;
            }
            current
        };

        match outcome {
            Ok(Exit::Finished) if current => {
                debug!(path = %self.path.display(), "end of stream");
                self.shared.callbacks.finished();
            }
            Ok(_) => debug!(path = %self.path.display(), "playback stopped"),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "playback aborted");
                if current {
                    self.shared.callbacks.error(&e);
                }
            }
        }
    }

    fn lock(&self) -> Option<MutexGuard<'_, Control>> {
        let ctl = self.shared.lock();
        (!ctl.is_cancelled(self.generation)).then_some(ctl)
    }

    fn open_and_stream(&self) -> Result<Exit> {
        let mut source = self.backend.frame_source();
        let info = source.open(&self.path)?;

        let result = self.stream_source(source.as_mut(), info);
        if let Err(e) = source.close() {
            debug!(error = %e, "failed to close frame source");
        }
        result
    }

    fn stream_source(&self, source: &mut dyn FrameSource, info: StreamInfo) -> Result<Exit> {
        if info.sample_rate == 0 || info.channels == 0 {
            return Err(PlaybackError::UnsupportedStream(format!(
                "{} Hz, {} channels",
                info.sample_rate, info.channels
            )));
        }

        let start = clamp_frame(ms_to_frames(self.start_ms, info.sample_rate), info.total_frames);
        source.seek(start)?;

        let gains = {
            let Some(mut ctl) = self.lock() else {
                return Ok(Exit::Stopped);
            };
            ctl.sample_rate = info.sample_rate;
            ctl.total_frames = info.total_frames;
            ctl.position_frames = start;
            ctl.gains
        };

        debug!(
            sample_rate = info.sample_rate,
            channels = info.channels,
            total_frames = info.total_frames,
            start,
            "stream opened"
        );

        let mut sink = self.backend.block_sink();
        sink.open(info.sample_rate, info.channels, self.block_frames)?;

        let result = self.stream_blocks(source, sink.as_mut(), info, gains);
        if let Err(e) = sink.close() {
            debug!(error = %e, "failed to close block sink");
        }
        result
    }

    fn stream_blocks(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn BlockSink,
        info: StreamInfo,
        gains: GainVector,
    ) -> Result<Exit> {
        let channels = usize::from(info.channels);
        let mut bank = FilterBank::new(info.sample_rate, info.channels, gains)?;
        let mut input = vec![0.0_f32; self.block_frames * channels];
        let mut work: Vec<f64> = Vec::with_capacity(input.len());
        let mut output: Vec<f32> = Vec::with_capacity(input.len());

        sink.start()?;

        loop {
            // Stop and pause
            let paused = match self.lock() {
                Some(ctl) => ctl.paused,
                None => return Ok(Exit::Stopped),
            };
            if paused {
                sink.stop()?;
                if !self.wait_while_paused() {
                    return Ok(Exit::Stopped);
                }
                sink.start()?;
            }

            // Snapshot parameters
            let (seek_ms, gains, volume) = match self.lock() {
                Some(mut ctl) => (ctl.seek_ms.take(), ctl.gains, ctl.volume),
                None => return Ok(Exit::Stopped),
            };

            if let Some(ms) = seek_ms {
                let frame = clamp_frame(ms_to_frames(ms, info.sample_rate), info.total_frames);
                source.seek(frame)?;
                bank.reset();
                match self.lock() {
                    Some(mut ctl) => ctl.position_frames = frame,
                    None => return Ok(Exit::Stopped),
                }
                debug!(ms, frame, "seeked");
            }

            let frames = source.read_frames(&mut input)?.min(self.block_frames);
            if frames == 0 {
                return Ok(Exit::Finished);
            }

            let position = source.tell();
            match self.lock() {
                Some(mut ctl) => ctl.position_frames = position,
                None => return Ok(Exit::Stopped),
            }

            if bank.update_gains(&gains) {
                debug!(?gains, "filter bank rebuilt");
            }

            let samples = &input[..frames * channels];
            work.clear();
            work.extend(samples.iter().map(|&s| f64::from(s)));
            bank.process(&mut work);

            output.clear();
            output.extend(work.iter().map(|&s| (s * volume).clamp(-1.0, 1.0) as f32));
            sink.write(&output)?;

            let (position_ms, duration_ms) = match self.lock() {
                Some(ctl) => (ctl.position_ms(), ctl.duration_ms()),
                None => return Ok(Exit::Stopped),
            };
            self.shared.callbacks.position(position_ms, duration_ms);
        }
    }

    /// Block until resumed. Returns `false` if the session was cancelled.
    fn wait_while_paused(&self) -> bool {
        let ctl = self.shared.lock();
        let ctl = self
            .shared
            .wake
            .wait_while(ctl, |c| c.paused && !c.is_cancelled(self.generation))
            .unwrap_or_else(PoisonError::into_inner);
        !ctl.is_cancelled(self.generation)
    }
}

/// Clamp a frame index to `[0, total - 1]`
fn clamp_frame(frame: u64, total_frames: u64) -> u64 {
    frame.min(total_frames.saturating_sub(1))
}
