//! Onyx Player - Desktop Audio
//!
//! Desktop implementations of the `onyx-playback` collaborator traits:
//!
//! - [`FileFrameSource`]: Symphonia decoding of local files
//! - [`CpalBlockSink`]: CPAL output on the default device
//! - [`DesktopBackend`]: factory handing both to the engine
//!
//! # Example
//!
//! ```rust,no_run
//! use onyx_audio_desktop::DesktopBackend;
//! use onyx_playback::PlaybackEngine;
//! use std::sync::Arc;
//!
//! let engine = PlaybackEngine::new(Arc::new(DesktopBackend::new()));
//! engine.play("/music/song.flac", 0).unwrap();
//! ```

mod backend;
mod error;
mod sink;
mod source;

pub use backend::DesktopBackend;
pub use error::{AudioError, Result};
pub use sink::{CpalBlockSink, SinkConfig};
pub use source::FileFrameSource;
