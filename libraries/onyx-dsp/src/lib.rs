//! Onyx Player - Equalizer
//!
//! Five fixed peaking bands (60 Hz, 250 Hz, 1 kHz, 4 kHz, 16 kHz, Q = 1.41)
//! implemented as a cascade of biquads. All filter math runs in `f64`;
//! conversion to and from the device sample format happens at the edges
//! of the playback engine.
//!
//! # Example
//!
//! ```rust
//! use onyx_dsp::{FilterBank, GainVector};
//!
//! let mut bank = FilterBank::new(44100, 2, GainVector::FLAT)?;
//!
//! // Boost bass, cut treble
//! bank.update_gains(&GainVector::new([6.0, 3.0, 0.0, -2.0, -4.0]));
//!
//! let mut block = vec![0.0_f64; 1024 * 2]; // interleaved stereo
//! bank.process(&mut block);
//! # Ok::<(), onyx_dsp::DspError>(())
//! ```

pub mod bands;
mod bank;
pub mod biquad;
pub mod coefficients;
mod error;

pub use bands::{
    Band, GainVector, BANDS, BAND_COUNT, BAND_FREQUENCIES, BAND_LABELS, BAND_Q, UI_GAIN_RANGE_DB,
};
pub use bank::FilterBank;
pub use biquad::{apply, BiquadState};
pub use coefficients::{peaking, SosCoefficients, BYPASS_THRESHOLD_DB};
pub use error::{DspError, Result};
