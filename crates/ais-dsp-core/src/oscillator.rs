//! Numerically Controlled Oscillator (NCO).
//!
//! Provides the local oscillator used to translate an AIS channel from its
//! offset in the captured band down to 0 Hz.

use crate::types::IqSample;
use core::f32::consts::PI;
#[allow(unused_imports)]
use micromath::F32Ext;

/// Numerically Controlled Oscillator.
///
/// Generates a complex exponential at a programmable frequency using a
/// phase accumulator.
#[derive(Clone, Debug)]
pub struct Nco {
    /// Current phase in radians (-π to π)
    phase: f32,
    /// Phase increment per sample (frequency)
    phase_inc: f32,
    /// Oscillator frequency in Hz
    frequency: f32,
    /// Sample rate in Hz
    sample_rate: f32,
}

impl Nco {
    /// Create a new NCO.
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `frequency` - Frequency in Hz (negative values rotate clockwise)
    #[must_use]
    pub fn new(sample_rate: f32, frequency: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: 2.0 * PI * frequency / sample_rate,
            frequency,
            sample_rate,
        }
    }

    /// Set oscillator frequency in Hz.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
        self.phase_inc = 2.0 * PI * frequency / self.sample_rate;
    }

    /// Get current frequency in Hz.
    #[must_use]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Get current phase in radians.
    #[must_use]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Generate next IQ sample (cos + j*sin) and advance phase.
    #[inline]
    pub fn next_iq(&mut self) -> IqSample {
        let output = IqSample::from_phase(self.phase);
        self.phase = wrap_phase(self.phase + self.phase_inc);
        output
    }

    /// Shift `input` down by the NCO frequency.
    ///
    /// Multiplies by the conjugate local oscillator, `e^(-j*2π*f*t)`.
    #[inline]
    pub fn mix(&mut self, input: IqSample) -> IqSample {
        let lo = self.next_iq();
        input.multiply(lo.conjugate())
    }
}

/// Wrap phase to range [-π, π].
#[inline]
pub(crate) fn wrap_phase(phase: f32) -> f32 {
    let mut p = phase;
    while p > PI {
        p -= 2.0 * PI;
    }
    while p < -PI {
        p += 2.0 * PI;
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nco_frequency() {
        let mut nco = Nco::new(1_536_000.0, -25_000.0);
        assert!((nco.frequency() + 25_000.0).abs() < 1e-3);

        nco.set_frequency(25_000.0);
        assert!((nco.frequency() - 25_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_nco_starts_at_zero_phase() {
        let mut nco = Nco::new(48_000.0, 1_000.0);
        let iq = nco.next_iq();
        assert!((iq.i - 1.0).abs() < 1e-6);
        assert!(iq.q.abs() < 1e-6);
    }

    #[test]
    fn test_mix_moves_tone_to_dc() {
        let fs = 1_536_000.0;
        let offset = 25_000.0;
        let mut tone = Nco::new(fs, offset);
        let mut lo = Nco::new(fs, offset);

        for _ in 0..10_000 {
            let mixed = lo.mix(tone.next_iq());
            assert!((mixed.i - 1.0).abs() < 1e-3, "i drifted: {}", mixed.i);
            assert!(mixed.q.abs() < 1e-3, "q drifted: {}", mixed.q);
        }
    }

    #[test]
    fn test_wrap_phase() {
        assert!((wrap_phase(0.0) - 0.0).abs() < 1e-6);
        let wrapped = wrap_phase(3.0 * PI);
        assert!(wrapped.abs() - PI < 1e-5);
        assert!((wrap_phase(-1.5 * PI) - 0.5 * PI).abs() < 1e-5);
    }
}
