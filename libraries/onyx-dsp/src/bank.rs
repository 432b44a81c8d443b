//! Five-band filter bank
//!
//! Owns one coefficient set per band plus per-channel state for each band.
//! The bank is rebuilt from scratch (fresh zero state) whenever the gain
//! vector changes; it never morphs coefficients under existing state.

use crate::bands::{GainVector, BAND_COUNT};
use crate::biquad::{process_sample, BiquadState};
use crate::coefficients::{peaking, SosCoefficients};
use crate::error::{DspError, Result};

/// Cascade of the five peaking sections for one stream
#[derive(Debug, Clone)]
pub struct FilterBank {
    sample_rate: u32,
    channels: usize,
    gains: GainVector,
    sections: [SosCoefficients; BAND_COUNT],
    /// `states[channel][band]`
    states: Vec<[BiquadState; BAND_COUNT]>,
}

impl FilterBank {
    /// Create a bank for a stream
    ///
    /// # Errors
    /// Fails if `sample_rate` or `channels` is zero.
    pub fn new(sample_rate: u32, channels: u16, gains: GainVector) -> Result<Self> {
        if sample_rate == 0 {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        if channels == 0 {
            return Err(DspError::InvalidChannelCount(channels));
        }

        Ok(Self {
            sample_rate,
            channels: channels as usize,
            gains,
            sections: design(&gains, sample_rate),
            states: vec![[BiquadState::ZERO; BAND_COUNT]; channels as usize],
        })
    }

    /// Gains the current sections were designed for
    pub fn gains(&self) -> GainVector {
        self.gains
    }

    /// Sample rate the sections were designed for
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Current coefficients of one band
    pub fn section(&self, band: usize) -> Option<&SosCoefficients> {
        self.sections.get(band)
    }

    /// State of one band on one channel
    pub fn state(&self, channel: usize, band: usize) -> Option<BiquadState> {
        self.states.get(channel).and_then(|s| s.get(band)).copied()
    }

    /// Rebuild all sections if `gains` differs from the active vector
    ///
    /// Returns `true` when a rebuild happened. A rebuild discards all filter
    /// history.
    pub fn update_gains(&mut self, gains: &GainVector) -> bool {
        if *gains == self.gains {
            return false;
        }
        self.gains = *gains;
        self.sections = design(gains, self.sample_rate);
        self.reset();
        true
    }

    /// Zero every band's state on every channel
    pub fn reset(&mut self) {
        for channel in &mut self.states {
            for state in channel.iter_mut() {
                state.reset();
            }
        }
    }

    /// Whether all five sections are pass-through
    pub fn is_bypassed(&self) -> bool {
        self.sections.iter().all(SosCoefficients::is_identity)
    }

    /// Filter an interleaved block in place
    ///
    /// Each channel runs through band 0 to band 4 in series. A trailing
    /// partial frame is left untouched.
    pub fn process(&mut self, block: &mut [f64]) {
        for frame in block.chunks_exact_mut(self.channels) {
            for (sample, states) in frame.iter_mut().zip(self.states.iter_mut()) {
                let mut x = *sample;
                for (coeffs, state) in self.sections.iter().zip(states.iter_mut()) {
                    x = process_sample(coeffs, state, x);
                }
                *sample = x;
            }
        }
    }
}

fn design(gains: &GainVector, sample_rate: u32) -> [SosCoefficients; BAND_COUNT] {
    let fs = f64::from(sample_rate);
    let mut sections = [SosCoefficients::IDENTITY; BAND_COUNT];
    for (section, (band, gain)) in sections.iter_mut().zip(gains.iter()) {
        *section = peaking(band.frequency, gain, band.q, fs);
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biquad::apply;

    fn stereo_sine(freq: f64, sample_rate: u32, frames: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let t = i as f64 / f64::from(sample_rate);
            let s = (2.0 * std::f64::consts::PI * freq * t).sin() * 0.5;
            out.push(s);
            out.push(-s);
        }
        out
    }

    #[test]
    fn rejects_degenerate_streams() {
        assert_eq!(
            FilterBank::new(0, 2, GainVector::FLAT).unwrap_err(),
            DspError::InvalidSampleRate(0)
        );
        assert_eq!(
            FilterBank::new(44100, 0, GainVector::FLAT).unwrap_err(),
            DspError::InvalidChannelCount(0)
        );
    }

    #[test]
    fn flat_bank_is_transparent() {
        let mut bank = FilterBank::new(44100, 2, GainVector::FLAT).unwrap();
        assert!(bank.is_bypassed());

        let input = stereo_sine(440.0, 44100, 1024);
        let mut block = input.clone();
        bank.process(&mut block);
        assert_eq!(block, input);
    }

    #[test]
    fn rebuild_only_on_value_change() {
        let gains = GainVector::new([3.0, 0.0, 0.0, 0.0, -3.0]);
        let mut bank = FilterBank::new(48000, 2, gains).unwrap();

        assert!(!bank.update_gains(&GainVector::new([3.0, 0.0, 0.0, 0.0, -3.0])));
        assert!(bank.update_gains(&GainVector::new([3.0, 0.0, 1.0, 0.0, -3.0])));
        assert_eq!(bank.gains().get(2), Some(1.0));
    }

    #[test]
    fn rebuild_discards_state() {
        let mut bank = FilterBank::new(48000, 2, GainVector::new([6.0; 5])).unwrap();
        let mut block = stereo_sine(1000.0, 48000, 256);
        bank.process(&mut block);
        assert_ne!(bank.state(0, 2), Some(BiquadState::ZERO));

        bank.update_gains(&GainVector::new([-6.0; 5]));
        for ch in 0..2 {
            for band in 0..BAND_COUNT {
                assert_eq!(bank.state(ch, band), Some(BiquadState::ZERO));
            }
        }
    }

    #[test]
    fn unchanged_gains_keep_state() {
        let gains = GainVector::new([6.0; 5]);
        let mut bank = FilterBank::new(48000, 1, gains).unwrap();
        let mut block = vec![0.5; 64];
        bank.process(&mut block);
        let before = bank.state(0, 0);

        bank.update_gains(&gains);
        assert_eq!(bank.state(0, 0), before);
    }

    #[test]
    fn cascade_matches_sequential_single_sections() {
        let gains = GainVector::new([4.0, -2.0, 6.0, -8.0, 3.0]);
        let mut bank = FilterBank::new(44100, 1, gains).unwrap();

        let input: Vec<f64> = (0..300).map(|i| ((i % 17) as f64 - 8.0) / 10.0).collect();
        let mut block = input.clone();
        bank.process(&mut block);

        let mut expected = input;
        for band in 0..BAND_COUNT {
            let (out, _) = apply(bank.section(band).unwrap(), &expected, BiquadState::ZERO);
            expected = out;
        }

        for (a, b) in block.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn channels_are_filtered_independently() {
        let mut bank = FilterBank::new(44100, 2, GainVector::new([12.0; 5])).unwrap();
        // Left carries signal, right is silent
        let mut block: Vec<f64> = (0..512)
            .flat_map(|i| [((i as f64) * 0.1).sin(), 0.0])
            .collect();
        bank.process(&mut block);

        assert!(block.iter().skip(1).step_by(2).all(|&s| s == 0.0));
        assert!(block.iter().step_by(2).any(|&s| s != 0.0));
    }

    #[test]
    fn boost_raises_level_at_center() {
        let sample_rate = 48000;
        let input = stereo_sine(1000.0, sample_rate, 4800);
        let rms = |b: &[f64]| (b.iter().map(|s| s * s).sum::<f64>() / b.len() as f64).sqrt();

        let mut boosted = input.clone();
        let mut bank = FilterBank::new(sample_rate, 2, GainVector::FLAT.with_band(2, 6.0)).unwrap();
        bank.process(&mut boosted);

        // Skip the first 10 ms of settling
        let ratio = rms(&boosted[960..]) / rms(&input[960..]);
        let db = 20.0 * ratio.log10();
        assert!((db - 6.0).abs() < 0.5, "expected ~6 dB boost, got {:.2} dB", db);
    }

    #[test]
    fn reset_zeroes_state() {
        let mut bank = FilterBank::new(44100, 2, GainVector::new([6.0; 5])).unwrap();
        let mut block = stereo_sine(250.0, 44100, 128);
        bank.process(&mut block);
        bank.reset();
        assert_eq!(bank.state(1, 4), Some(BiquadState::ZERO));
    }
}
