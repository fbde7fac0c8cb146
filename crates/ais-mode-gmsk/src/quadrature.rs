//! Quadrature (frequency) discriminator.

use ais_dsp_core::IqSample;
use alloc::vec::Vec;

/// Instantaneous frequency detector.
///
/// Outputs `gain * arg(x[n] * conj(x[n-1]))`. The previous sample is kept
/// across calls so the output stream has no seams at chunk boundaries.
/// A non-finite sample on either side of the difference yields 0.0.
#[derive(Clone, Debug)]
pub struct QuadratureDemod {
    gain: f32,
    prev: IqSample,
}

impl QuadratureDemod {
    /// Create a discriminator with the given output gain.
    #[must_use]
    pub const fn new(gain: f32) -> Self {
        Self {
            gain,
            prev: IqSample::ZERO,
        }
    }

    /// Output gain.
    #[must_use]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Demodulate a single sample.
    #[inline]
    pub fn process(&mut self, sample: IqSample) -> f32 {
        let out = self.gain * sample.phase_delta(self.prev);
        self.prev = sample;
        if out.is_finite() {
            out
        } else {
            0.0
        }
    }

    /// Demodulate a chunk, appending one output per input sample.
    pub fn process_block(&mut self, input: &[IqSample], output: &mut Vec<f32>) {
        output.extend(input.iter().map(|&s| self.process(s)));
    }
}
