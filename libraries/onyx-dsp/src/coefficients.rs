//! Peaking EQ biquad design
//!
//! Classic RBJ cookbook peaking filter. Pure functions, safe to call from
//! any thread.

use std::f64::consts::PI;

/// Gains smaller than this (in dB, absolute) produce the identity section
pub const BYPASS_THRESHOLD_DB: f64 = 0.05;

/// One second-order section, normalized so that `a0 == 1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SosCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
}

impl SosCoefficients {
    /// Pass-through section `{1, 0, 0, 1, 0, 0}`
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a0: 1.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Coefficients in `[b0, b1, b2, a0, a1, a2]` order
    pub fn to_array(&self) -> [f64; 6] {
        [self.b0, self.b1, self.b2, self.a0, self.a1, self.a2]
    }

    /// Whether this section passes audio through untouched
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Whether every coefficient is finite
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|c| c.is_finite())
    }
}

impl Default for SosCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Design a peaking EQ section
///
/// # Arguments
/// * `frequency` - Center frequency in Hz (caller keeps it below Nyquist)
/// * `gain_db` - Boost (positive) or cut (negative) in dB
/// * `q` - Bandwidth control
/// * `sample_rate` - Sample rate in Hz
///
/// Returns [`SosCoefficients::IDENTITY`] when `|gain_db| < 0.05`.
pub fn peaking(frequency: f64, gain_db: f64, q: f64, sample_rate: f64) -> SosCoefficients {
    if gain_db.abs() < BYPASS_THRESHOLD_DB {
        return SosCoefficients::IDENTITY;
    }

    let a = 10.0_f64.powf(gain_db / 40.0);
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = omega.cos();
    let sin_omega = omega.sin();
    let alpha = sin_omega / (2.0 * q);

    let b0 = 1.0 + alpha * a;
    let b1 = -2.0 * cos_omega;
    let b2 = 1.0 - alpha * a;
    let a0 = 1.0 + alpha / a;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha / a;

    SosCoefficients {
        b0: b0 / a0,
        b1: b1 / a0,
        b2: b2 / a0,
        a0: 1.0,
        a1: a1 / a0,
        a2: a2 / a0,
    }
}
