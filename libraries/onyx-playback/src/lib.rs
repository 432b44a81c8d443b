//! Onyx Player - Playback Engine
//!
//! Real-time equalized playback for Onyx Player.
//!
//! This crate provides:
//! - A transport (play, pause, resume, seek, stop) driving one audio thread
//! - Live five-band equalizer and volume updates, applied per block
//! - Finished, position and error callbacks
//! - A bounded stop that never hangs the caller
//!
//! # Architecture
//!
//! `onyx-playback` has no platform code. File decoding and device output
//! are provided through the [`FrameSource`] and [`BlockSink`] traits, created
//! by an [`AudioBackend`]. `onyx-audio-desktop` implements them with
//! Symphonia and CPAL; the `test-utils` feature adds an in-memory backend.
//!
//! # Example
//!
//! Requires the `test-utils` feature.
//!
//! ```rust,ignore
//! use onyx_playback::memory::{MemoryBackend, MemoryTrack};
//! use onyx_playback::{PlaybackEngine, TransportState};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let backend = MemoryBackend::new().with_track("tone", MemoryTrack::silent(22050, 1, 100));
//! let engine = PlaybackEngine::new(Arc::new(backend));
//!
//! let (tx, rx) = crossbeam_channel::unbounded();
//! engine.on_finished(move || {
//!     let _ = tx.send(());
//! });
//!
//! engine.play("tone", 0).unwrap();
//! rx.recv_timeout(Duration::from_secs(5)).unwrap();
//! assert_eq!(engine.duration_ms(), 100);
//! ```

mod backend;
mod config;
mod engine;
mod error;
mod events;
mod sink;
mod source;
pub mod time;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod memory;

// Public exports
pub use backend::AudioBackend;
pub use config::EngineConfig;
pub use engine::PlaybackEngine;
pub use error::{PlaybackError, Result};
pub use events::{ErrorCallback, FinishedCallback, PositionCallback};
pub use sink::BlockSink;
pub use source::FrameSource;
pub use time::format_ms;
pub use types::{frames_to_ms, ms_to_frames, StreamInfo, TransportState};

pub use onyx_dsp::GainVector;
