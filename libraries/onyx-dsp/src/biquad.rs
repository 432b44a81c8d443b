//! Single second-order section with explicit state
//!
//! Transposed direct form II. State is two registers per channel and is
//! passed in and out explicitly, so a signal can be filtered in any number
//! of consecutive blocks with the same result as one call.

use crate::coefficients::SosCoefficients;

/// Running state of one biquad on one channel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BiquadState {
    pub z0: f64,
    pub z1: f64,
}

impl BiquadState {
    /// Zeroed registers
    pub const ZERO: Self = Self { z0: 0.0, z1: 0.0 };

    /// Clear both registers
    pub fn reset(&mut self) {
        *self = Self::ZERO;
    }
}

/// Filter one sample, updating `state`
#[inline]
pub fn process_sample(coeffs: &SosCoefficients, state: &mut BiquadState, x: f64) -> f64 {
    let y = coeffs.b0 * x + state.z0;
    state.z0 = coeffs.b1 * x - coeffs.a1 * y + state.z1;
    state.z1 = coeffs.b2 * x - coeffs.a2 * y;
    y
}

/// Filter a block in place, threading `state` through
///
/// An identity section leaves the samples untouched whatever `state` holds,
/// and hands back zeroed registers.
pub fn apply_in_place(coeffs: &SosCoefficients, samples: &mut [f64], state: &mut BiquadState) {
    if coeffs.is_identity() {
        state.reset();
        return;
    }
    for sample in samples.iter_mut() {
        *sample = process_sample(coeffs, state, *sample);
    }
}

/// Filter one channel's block
///
/// Returns the filtered block (same length as `input`) and the state to
/// hand to the next call.
pub fn apply(
    coeffs: &SosCoefficients,
    input: &[f64],
    state: BiquadState,
) -> (Vec<f64>, BiquadState) {
    let mut output = input.to_vec();
    let mut state = state;
    apply_in_place(coeffs, &mut output, &mut state);
    (output, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::BAND_Q;
    use crate::coefficients::peaking;

    fn ramp(len: usize) -> Vec<f64> {
        (0..len).map(|i| ((i * 7919) % 200) as f64 / 100.0 - 1.0).collect()
    }

    #[test]
    fn identity_passes_signal_across_blocks() {
        let x = ramp(256);
        let (y1, state) = apply(&SosCoefficients::IDENTITY, &x[..100], BiquadState::ZERO);
        let (y2, state) = apply(&SosCoefficients::IDENTITY, &x[100..], state);
        assert_eq!(y1, x[..100]);
        assert_eq!(y2, x[100..]);
        // Identity never accumulates history
        assert_eq!(state, BiquadState::ZERO);
    }

    #[test]
    fn identity_ignores_prior_history() {
        let x = [0.1, -0.2, 0.3, 0.0];
        let (y, state) = apply(
            &SosCoefficients::IDENTITY,
            &x,
            BiquadState { z0: 0.25, z1: -0.5 },
        );
        assert_eq!(y, x);
        assert_eq!(state, BiquadState::ZERO);
    }

    #[test]
    fn output_matches_input_length() {
        let sos = peaking(1000.0, 6.0, BAND_Q, 44100.0);
        let x = ramp(512);
        let (y, _) = apply(&sos, &x, BiquadState::ZERO);
        assert_eq!(y.len(), x.len());
    }

    #[test]
    fn empty_block_keeps_state() {
        let sos = peaking(1000.0, 6.0, BAND_Q, 44100.0);
        let state = BiquadState { z0: 0.25, z1: -0.5 };
        let (y, next) = apply(&sos, &[], state);
        assert!(y.is_empty());
        assert_eq!(next, state);
    }

    #[test]
    fn split_processing_matches_whole() {
        let sos = peaking(250.0, 6.0, BAND_Q, 44100.0);
        let x = ramp(200);

        let (whole, _) = apply(&sos, &x, BiquadState::ZERO);
        let (first, mid) = apply(&sos, &x[..100], BiquadState::ZERO);
        let (second, _) = apply(&sos, &x[100..], mid);

        let joined: Vec<f64> = first.into_iter().chain(second).collect();
        for (a, b) in whole.iter().zip(joined.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn impulse_response_starts_with_b0() {
        let sos = peaking(4000.0, -6.0, BAND_Q, 48000.0);
        let mut impulse = vec![0.0; 8];
        impulse[0] = 1.0;
        let (y, _) = apply(&sos, &impulse, BiquadState::ZERO);
        assert_eq!(y[0], sos.b0);
        assert!((y[1] - (sos.b1 - sos.a1 * sos.b0)).abs() < 1e-15);
    }

    #[test]
    fn reset_clears_registers() {
        let mut state = BiquadState { z0: 1.0, z1: 2.0 };
        state.reset();
        assert_eq!(state, BiquadState::ZERO);
    }
}
