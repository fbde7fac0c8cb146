//! Mueller-and-Müller symbol timing recovery.
//!
//! Consumes a real oversampled symbol waveform and emits one interpolated
//! sample per recovered symbol. The timing phase (`mu`) and the symbol
//! period estimate (`omega`) are running state: they are updated once per
//! symbol and never reset between calls. A non-finite detector output
//! leaves both untouched, so one corrupt sample cannot unlock the loop.

use crate::error::ModeError;
use alloc::vec::Vec;
#[allow(unused_imports)]
use micromath::F32Ext;

/// Samples needed around the interpolation point.
const INTERP_TAPS: usize = 4;

/// Timing error detector output is limited to this magnitude.
const MAX_TIMING_ERROR: f32 = 1.0;

/// Smallest advance per symbol, in input samples.
const MIN_ADVANCE: f32 = 0.5;

/// Mueller-and-Müller clock recovery for real-valued symbols.
#[derive(Clone, Debug)]
pub struct ClockRecoveryMm {
    omega: f32,
    omega_mid: f32,
    omega_lim: f32,
    gain_omega: f32,
    gain_mu: f32,
    mu: f32,
    last_sample: f32,
    last_error: f32,
    /// Input not yet consumed by the interpolator
    buffer: Vec<f32>,
    /// Samples the loop has stepped past that were not yet buffered
    skip: usize,
}

impl ClockRecoveryMm {
    /// Create a timing recovery loop.
    ///
    /// # Arguments
    /// * `omega` - Nominal samples per symbol
    /// * `gain_omega` - Symbol period loop gain
    /// * `mu` - Initial fractional timing phase in [0, 1)
    /// * `gain_mu` - Timing phase loop gain
    /// * `omega_relative_limit` - Maximum relative deviation of `omega`
    ///
    /// # Errors
    /// Rejects `omega < 1.5`, gains outside (0, 1], `mu` outside [0, 1)
    /// and limits outside [0, 1).
    pub fn new(
        omega: f32,
        gain_omega: f32,
        mu: f32,
        gain_mu: f32,
        omega_relative_limit: f32,
    ) -> Result<Self, ModeError> {
        if !(omega >= 1.5) {
            return Err(ModeError::SamplesPerSymbol(omega));
        }
        if !(gain_mu > 0.0 && gain_mu <= 1.0) {
            return Err(ModeError::TimingGain(gain_mu));
        }
        if !(gain_omega > 0.0 && gain_omega <= 1.0) {
            return Err(ModeError::TimingGain(gain_omega));
        }
        if !(0.0..1.0).contains(&mu) {
            return Err(ModeError::TimingPhase(mu));
        }
        if !(0.0..1.0).contains(&omega_relative_limit) {
            return Err(ModeError::OmegaLimit(omega_relative_limit));
        }

        Ok(Self {
            omega,
            omega_mid: omega,
            omega_lim: omega * omega_relative_limit,
            gain_omega,
            gain_mu,
            mu,
            last_sample: 0.0,
            last_error: 0.0,
            buffer: Vec::new(),
            skip: 0,
        })
    }

    /// Current symbol period estimate in samples.
    #[must_use]
    pub fn omega(&self) -> f32 {
        self.omega
    }

    /// Current fractional timing phase.
    #[must_use]
    pub fn mu(&self) -> f32 {
        self.mu
    }

    /// Most recent timing error detector output.
    #[must_use]
    pub fn last_error(&self) -> f32 {
        self.last_error
    }

    /// Run the loop over a chunk of samples, appending recovered symbols.
    pub fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        let skipped = self.skip.min(input.len());
        self.skip -= skipped;
        self.buffer.extend_from_slice(&input[skipped..]);

        let mut ii = 0usize;
        while ii + INTERP_TAPS <= self.buffer.len() {
            let sample = interpolate(&self.buffer[ii..ii + INTERP_TAPS], self.mu);

            let error = (slice(self.last_sample) * sample - slice(sample) * self.last_sample)
                .clamp(-MAX_TIMING_ERROR, MAX_TIMING_ERROR);
            let error = if error.is_finite() { error } else { 0.0 };
            if sample.is_finite() {
                self.last_sample = sample;
            }
            self.last_error = error;

            self.omega += self.gain_omega * error;
            self.omega = self.omega_mid
                + (self.omega - self.omega_mid).clamp(-self.omega_lim, self.omega_lim);

            // Guarantees forward progress even with a saturated detector
            self.mu += (self.omega + self.gain_mu * error).max(MIN_ADVANCE);
            let step = self.mu.floor();
            self.mu -= step;
            ii += step as usize;

            output.push(sample);
        }

        let consumed = ii.min(self.buffer.len());
        self.skip += ii - consumed;
        self.buffer.drain(..consumed);
    }
}

#[inline]
fn slice(x: f32) -> f32 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Cubic Lagrange interpolation between `y[1]` and `y[2]` at fraction `t`.
#[inline]
fn interpolate(y: &[f32], t: f32) -> f32 {
    let (y0, y1, y2, y3) = (y[0], y[1], y[2], y[3]);
    let c0 = y1;
    let c1 = -y0 / 3.0 - y1 / 2.0 + y2 - y3 / 6.0;
    let c2 = y0 / 2.0 - y1 + y2 / 2.0;
    let c3 = -y0 / 6.0 + y1 / 2.0 - y2 / 2.0 + y3 / 6.0;
    ((c3 * t + c2) * t + c1) * t + c0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol_wave(symbols: &[f32], sps: usize) -> Vec<f32> {
        symbols
            .iter()
            .flat_map(|&s| core::iter::repeat(s).take(sps))
            .collect()
    }

    #[test]
    fn test_interpolate_hits_nodes_and_cubic() {
        let y = [1.0, 2.0, 4.0, 8.0];
        assert!((interpolate(&y, 0.0) - 2.0).abs() < 1e-6);
        assert!((interpolate(&y, 1.0) - 4.0).abs() < 1e-5);

        // Exact for cubic polynomials: f(x) = x^3 sampled at x = -1, 0, 1, 2
        let cubic = [-1.0, 0.0, 1.0, 8.0];
        assert!((interpolate(&cubic, 0.5) - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert_eq!(
            ClockRecoveryMm::new(1.0, 0.01, 0.5, 0.175, 0.005).unwrap_err(),
            ModeError::SamplesPerSymbol(1.0)
        );
        assert!(ClockRecoveryMm::new(2.0, 0.01, 1.0, 0.175, 0.005).is_err());
        assert!(ClockRecoveryMm::new(2.0, 0.01, 0.5, 0.0, 0.005).is_err());
        assert!(ClockRecoveryMm::new(2.0, 0.01, 0.5, 0.175, 1.5).is_err());
    }

    #[test]
    fn test_one_output_per_symbol() {
        let symbols: Vec<f32> = (0..400).map(|n| if (n * 7) % 3 == 0 { 1.0 } else { -1.0 }).collect();
        let wave = symbol_wave(&symbols, 2);

        let mut mm = ClockRecoveryMm::new(2.0, 0.25 * 0.175 * 0.175, 0.5, 0.175, 0.005).unwrap();
        let mut out = Vec::new();
        mm.process(&wave, &mut out);

        // Interpolator lookahead and the bounded omega drift allow a small slack
        let diff = out.len() as i64 - symbols.len() as i64;
        assert!(diff.abs() <= 6, "{} symbols from {}", out.len(), symbols.len());
    }

    #[test]
    fn test_omega_stays_within_limit() {
        let symbols: Vec<f32> = (0..2000).map(|n| if n % 2 == 0 { 1.0 } else { -1.0 }).collect();
        // Nominal period 1% away from the actual symbol period
        let wave = symbol_wave(&symbols, 2);
        let mut mm = ClockRecoveryMm::new(2.02, 0.05, 0.5, 0.175, 0.005).unwrap();
        let mut out = Vec::new();
        mm.process(&wave, &mut out);
        assert!((mm.omega() - 2.02).abs() <= 2.02 * 0.005 + 1e-6);
    }

    #[test]
    fn test_chunking_does_not_change_output() {
        let symbols: Vec<f32> = (0..300).map(|n| if (n * 5 + 1) % 4 < 2 { 1.0 } else { -1.0 }).collect();
        let wave = symbol_wave(&symbols, 2);

        let mut whole = ClockRecoveryMm::new(2.0, 0.0077, 0.5, 0.175, 0.005).unwrap();
        let mut expected = Vec::new();
        whole.process(&wave, &mut expected);

        let mut chunked = ClockRecoveryMm::new(2.0, 0.0077, 0.5, 0.175, 0.005).unwrap();
        let mut out = Vec::new();
        for chunk in wave.chunks(3) {
            chunked.process(chunk, &mut out);
        }
        assert_eq!(out, expected);
    }

    #[test]
    fn test_nan_input_does_not_unlock_loop() {
        let symbols: Vec<f32> = (0..600).map(|n| if (n * 7) % 3 == 0 { 1.0 } else { -1.0 }).collect();
        let mut wave = symbol_wave(&symbols, 2);
        wave[40] = f32::NAN;

        let mut mm = ClockRecoveryMm::new(2.0, 0.25 * 0.175 * 0.175, 0.5, 0.175, 0.005).unwrap();
        let mut out = Vec::new();
        mm.process(&wave, &mut out);

        assert!(mm.omega().is_finite());
        assert!((mm.omega() - 2.0).abs() <= 2.0 * 0.005 + 1e-6);
        assert!(mm.mu().is_finite());
        let diff = out.len() as i64 - symbols.len() as i64;
        assert!(diff.abs() <= 6, "{} symbols from {}", out.len(), symbols.len());
    }
}
