//! Fixed band layout and the gain vector that drives it

use crate::error::{DspError, Result};
use serde::{Deserialize, Serialize};

/// Number of equalizer bands
pub const BAND_COUNT: usize = 5;

/// Q factor shared by every band
pub const BAND_Q: f64 = 1.41;

/// Center frequencies in Hz, low to high
pub const BAND_FREQUENCIES: [f64; BAND_COUNT] = [60.0, 250.0, 1000.0, 4000.0, 16000.0];

/// Short labels for display next to each band
pub const BAND_LABELS: [&str; BAND_COUNT] = ["60Hz", "250Hz", "1kHz", "4kHz", "16kHz"];

/// Gain range offered by front ends (±dB). The engine itself never clamps.
pub const UI_GAIN_RANGE_DB: f64 = 12.0;

/// Immutable band descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Center frequency in Hz
    pub frequency: f64,
    /// Bandwidth control
    pub q: f64,
}

/// The five bands in processing order
pub const BANDS: [Band; BAND_COUNT] = [
    Band { frequency: BAND_FREQUENCIES[0], q: BAND_Q },
    Band { frequency: BAND_FREQUENCIES[1], q: BAND_Q },
    Band { frequency: BAND_FREQUENCIES[2], q: BAND_Q },
    Band { frequency: BAND_FREQUENCIES[3], q: BAND_Q },
    Band { frequency: BAND_FREQUENCIES[4], q: BAND_Q },
];

/// Per-band gains in dB, index-aligned with [`BANDS`]
///
/// Always replaced as a whole. Two vectors are equal only if every band
/// matches, which is what decides whether the filter bank is rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct GainVector([f64; BAND_COUNT]);

impl GainVector {
    /// All bands at 0 dB
    pub const FLAT: Self = Self([0.0; BAND_COUNT]);

    /// Create from one gain per band
    pub const fn new(gains: [f64; BAND_COUNT]) -> Self {
        Self(gains)
    }

    /// Build from a slice, rejecting anything but exactly five values
    pub fn from_slice(gains: &[f64]) -> Result<Self> {
        let gains: [f64; BAND_COUNT] = gains.try_into().map_err(|_| DspError::BandCount {
            expected: BAND_COUNT,
            actual: gains.len(),
        })?;
        Ok(Self(gains))
    }

    /// Gain of a single band
    pub fn get(&self, band: usize) -> Option<f64> {
        self.0.get(band).copied()
    }

    /// Copy with one band replaced. Out-of-range indices return the vector unchanged.
    #[must_use]
    pub fn with_band(mut self, band: usize, gain_db: f64) -> Self {
        if let Some(slot) = self.0.get_mut(band) {
            *slot = gain_db;
        }
        self
    }

    /// Gains as an array
    pub fn as_array(&self) -> &[f64; BAND_COUNT] {
        &self.0
    }

    /// Whether every band would bypass
    pub fn is_flat(&self) -> bool {
        self.0
            .iter()
            .all(|g| g.abs() < crate::coefficients::BYPASS_THRESHOLD_DB)
    }

    /// Iterate `(band, gain)` pairs in processing order
    pub fn iter(&self) -> impl Iterator<Item = (&'static Band, f64)> + '_ {
        BANDS.iter().zip(self.0.iter().copied())
    }
}

impl From<[f64; BAND_COUNT]> for GainVector {
    fn from(gains: [f64; BAND_COUNT]) -> Self {
        Self(gains)
    }
}

impl TryFrom<&[f64]> for GainVector {
    type Error = DspError;

    fn try_from(gains: &[f64]) -> Result<Self> {
        Self::from_slice(gains)
    }
}

impl TryFrom<Vec<f64>> for GainVector {
    type Error = DspError;

    fn try_from(gains: Vec<f64>) -> Result<Self> {
        Self::from_slice(&gains)
    }
}

impl From<GainVector> for Vec<f64> {
    fn from(gains: GainVector) -> Self {
        gains.0.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_ascending_with_fixed_q() {
        for pair in BANDS.windows(2) {
            assert!(pair[0].frequency < pair[1].frequency);
        }
        assert!(BANDS.iter().all(|b| b.q == BAND_Q));
    }

    #[test]
    fn from_slice_requires_five_values() {
        assert!(GainVector::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]).is_ok());

        let err = GainVector::from_slice(&[1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            DspError::BandCount {
                expected: 5,
                actual: 2
            }
        );
        assert!(GainVector::from_slice(&[0.0; 6]).is_err());
    }

    #[test]
    fn equality_is_by_value() {
        let a = GainVector::new([3.0, -3.0, 6.0, -6.0, 12.0]);
        let b = GainVector::from_slice(&[3.0, -3.0, 6.0, -6.0, 12.0]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, a.with_band(2, 0.0));
    }

    #[test]
    fn with_band_ignores_out_of_range() {
        let g = GainVector::FLAT.with_band(9, 4.0);
        assert_eq!(g, GainVector::FLAT);
        assert_eq!(GainVector::FLAT.with_band(4, 4.0).get(4), Some(4.0));
    }

    #[test]
    fn flat_detection_uses_bypass_threshold() {
        assert!(GainVector::FLAT.is_flat());
        assert!(GainVector::new([0.01, -0.04, 0.0, 0.0, 0.0]).is_flat());
        assert!(!GainVector::new([0.0, 0.0, 0.0, 0.0, 0.5]).is_flat());
    }
}
