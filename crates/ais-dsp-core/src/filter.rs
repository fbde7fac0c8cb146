//! Digital filter implementations.
//!
//! Provides FIR tap design ([`firdes`]), runtime-length FIR filters for
//! real and complex streams, and DC blocking filters.

use crate::error::DspError;
use crate::types::IqSample;
use alloc::vec;
use alloc::vec::Vec;
#[allow(unused_imports)]
use micromath::F32Ext;

/// FIR tap design.
///
/// Designs run once at pipeline construction, never in the sample path.
pub mod firdes {
    use super::{DspError, Vec};
    use core::f32::consts::PI;
    #[allow(unused_imports)]
    use micromath::F32Ext;

    /// Stopband attenuation achieved by a Hamming window, in dB.
    const HAMMING_ATTENUATION_DB: f32 = 53.0;

    /// Hamming window of `ntaps` points.
    #[must_use]
    pub fn hamming(ntaps: usize) -> Vec<f32> {
        if ntaps == 1 {
            return alloc::vec![1.0];
        }
        let m = (ntaps - 1) as f32;
        (0..ntaps)
            .map(|n| 0.54 - 0.46 * (2.0 * PI * n as f32 / m).cos())
            .collect()
    }

    /// Number of taps needed for a Hamming-windowed filter with the given
    /// transition width. Always odd so the filter has an integer group delay.
    #[must_use]
    pub fn hamming_ntaps(sample_rate: f32, transition_width: f32) -> usize {
        let ntaps = (HAMMING_ATTENUATION_DB / (22.0 * transition_width / sample_rate)) as usize;
        ntaps | 1
    }

    /// Windowed-sinc low-pass filter.
    ///
    /// # Arguments
    /// * `gain` - DC gain of the resulting filter
    /// * `sample_rate` - Sample rate in Hz
    /// * `cutoff` - Cutoff frequency in Hz (-6 dB point)
    /// * `transition_width` - Width of the transition band in Hz
    ///
    /// # Errors
    /// Returns an error if the cutoff is not inside (0, Nyquist) or the
    /// transition width is not positive.
    pub fn low_pass(
        gain: f32,
        sample_rate: f32,
        cutoff: f32,
        transition_width: f32,
    ) -> Result<Vec<f32>, DspError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(f64::from(sample_rate)));
        }
        if !(cutoff > 0.0 && cutoff < sample_rate / 2.0) {
            return Err(DspError::InvalidCutoff(f64::from(cutoff)));
        }
        if !(transition_width > 0.0) {
            return Err(DspError::InvalidTransition(f64::from(transition_width)));
        }

        let ntaps = hamming_ntaps(sample_rate, transition_width);
        let window = hamming(ntaps);
        let middle = (ntaps / 2) as isize;
        let omega = 2.0 * PI * cutoff / sample_rate;

        let mut taps: Vec<f32> = window
            .iter()
            .enumerate()
            .map(|(idx, w)| {
                let n = idx as isize - middle;
                if n == 0 {
                    omega / PI * w
                } else {
                    let n = n as f32;
                    (n * omega).sin() / (n * PI) * w
                }
            })
            .collect();

        // Unity (times `gain`) response at DC
        let dc: f32 = taps.iter().sum();
        for tap in &mut taps {
            *tap *= gain / dc;
        }
        Ok(taps)
    }

    /// Gaussian pulse shaping filter, normalised to `gain` total area.
    ///
    /// # Arguments
    /// * `gain` - Sum of all taps
    /// * `samples_per_symbol` - Oversampling factor
    /// * `bt` - Bandwidth-time product (0.4 for AIS)
    /// * `ntaps` - Number of taps
    #[must_use]
    pub fn gaussian(gain: f32, samples_per_symbol: f32, bt: f32, ntaps: usize) -> Vec<f32> {
        let dt = 1.0 / samples_per_symbol;
        let s = 1.0 / (2.0f32.ln().sqrt() / (2.0 * PI * bt));
        let mut t0 = -0.5 * ntaps as f32;
        let mut taps = Vec::with_capacity(ntaps);
        for _ in 0..ntaps {
            t0 += 1.0;
            let ts = s * dt * t0;
            taps.push((-0.5 * ts * ts).exp());
        }
        let scale: f32 = taps.iter().sum();
        for tap in &mut taps {
            *tap = *tap / scale * gain;
        }
        taps
    }

    /// Full convolution of two tap sets.
    #[must_use]
    pub fn convolve(a: &[f32], b: &[f32]) -> Vec<f32> {
        if a.is_empty() || b.is_empty() {
            return Vec::new();
        }
        let mut out = alloc::vec![0.0; a.len() + b.len() - 1];
        for (i, x) in a.iter().enumerate() {
            for (j, y) in b.iter().enumerate() {
                out[i + j] += x * y;
            }
        }
        out
    }
}

/// FIR filter over real samples with runtime tap count.
///
/// Uses a circular buffer for efficient processing.
#[derive(Clone, Debug)]
pub struct FirFilter {
    taps: Vec<f32>,
    buffer: Vec<f32>,
    write_pos: usize,
}

impl FirFilter {
    /// Create a new FIR filter with given taps.
    ///
    /// # Errors
    /// Returns [`DspError::EmptyTaps`] if `taps` is empty.
    pub fn new(taps: Vec<f32>) -> Result<Self, DspError> {
        if taps.is_empty() {
            return Err(DspError::EmptyTaps);
        }
        let len = taps.len();
        Ok(Self {
            taps,
            buffer: vec![0.0; len],
            write_pos: 0,
        })
    }

    /// Number of taps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// Always false; construction rejects empty tap sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Process a single sample.
    pub fn process(&mut self, input: f32) -> f32 {
        let n = self.taps.len();
        self.buffer[self.write_pos] = input;

        let mut output = 0.0;
        let mut read_pos = self.write_pos;
        for coeff in &self.taps {
            output += self.buffer[read_pos] * coeff;
            read_pos = if read_pos == 0 { n - 1 } else { read_pos - 1 };
        }

        self.write_pos = (self.write_pos + 1) % n;
        output
    }

    /// Reset filter state.
    pub fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|x| *x = 0.0);
        self.write_pos = 0;
    }
}

/// FIR filter over complex samples with real taps.
///
/// Writing and computing are split so decimating users only pay for
/// the outputs they keep.
#[derive(Clone, Debug)]
pub struct FirFilterIq {
    taps: Vec<f32>,
    buffer: Vec<IqSample>,
    write_pos: usize,
}

impl FirFilterIq {
    /// Create a new complex FIR filter with given taps.
    ///
    /// # Errors
    /// Returns [`DspError::EmptyTaps`] if `taps` is empty.
    pub fn new(taps: Vec<f32>) -> Result<Self, DspError> {
        if taps.is_empty() {
            return Err(DspError::EmptyTaps);
        }
        let len = taps.len();
        Ok(Self {
            taps,
            buffer: vec![IqSample::ZERO; len],
            write_pos: 0,
        })
    }

    /// Group delay in samples for a linear-phase (symmetric) tap set.
    #[must_use]
    pub fn group_delay(&self) -> usize {
        (self.taps.len() - 1) / 2
    }

    /// Number of taps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// Always false; construction rejects empty tap sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Store a sample in the delay line without computing an output.
    #[inline]
    pub fn push(&mut self, input: IqSample) {
        self.buffer[self.write_pos] = input;
        self.write_pos = (self.write_pos + 1) % self.taps.len();
    }

    /// Filter output for the most recently pushed sample.
    pub fn output(&self) -> IqSample {
        let n = self.taps.len();
        let mut acc = IqSample::ZERO;
        let mut read_pos = if self.write_pos == 0 { n - 1 } else { self.write_pos - 1 };
        for coeff in &self.taps {
            acc += self.buffer[read_pos] * *coeff;
            read_pos = if read_pos == 0 { n - 1 } else { read_pos - 1 };
        }
        acc
    }

    /// Push a sample and return the filter output.
    #[inline]
    pub fn process(&mut self, input: IqSample) -> IqSample {
        self.push(input);
        self.output()
    }

    /// Reset filter state.
    pub fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|x| *x = IqSample::ZERO);
        self.write_pos = 0;
    }
}

/// DC blocking filter.
///
/// Removes DC offset from a signal using a simple IIR highpass.
/// Transfer function: H(z) = (1 - z^-1) / (1 - alpha * z^-1)
#[derive(Clone, Debug)]
pub struct DcBlocker {
    alpha: f32,
    prev_input: f32,
    prev_output: f32,
}

impl DcBlocker {
    /// Create a new DC blocker.
    ///
    /// # Arguments
    /// * `alpha` - Feedback coefficient (0.99 to 0.9999 typical, higher = lower cutoff)
    #[must_use]
    pub const fn new(alpha: f32) -> Self {
        Self {
            alpha,
            prev_input: 0.0,
            prev_output: 0.0,
        }
    }

    /// Process a single sample. Non-finite input yields 0.0 and leaves the
    /// filter state untouched.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        if !input.is_finite() {
            return 0.0;
        }
        let output = input - self.prev_input + self.alpha * self.prev_output;
        self.prev_input = input;
        self.prev_output = output;
        output
    }
}

impl Default for DcBlocker {
    fn default() -> Self {
        Self::new(0.9995)
    }
}

/// DC blocker for IQ signals.
#[derive(Clone, Debug, Default)]
pub struct DcBlockerIq {
    i_blocker: DcBlocker,
    q_blocker: DcBlocker,
}

impl DcBlockerIq {
    /// Create a new IQ DC blocker.
    #[must_use]
    pub const fn new(alpha: f32) -> Self {
        Self {
            i_blocker: DcBlocker::new(alpha),
            q_blocker: DcBlocker::new(alpha),
        }
    }

    /// Process an IQ sample.
    #[inline]
    pub fn process(&mut self, input: IqSample) -> IqSample {
        IqSample::new(
            self.i_blocker.process(input.i),
            self.q_blocker.process(input.q),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_pass_unity_dc_gain() {
        let taps = firdes::low_pass(1.0, 48_000.0, 6_000.0, 2_000.0).unwrap();
        assert_eq!(taps.len() % 2, 1);
        let dc: f32 = taps.iter().sum();
        assert!((dc - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_low_pass_is_symmetric() {
        let taps = firdes::low_pass(1.0, 1.0, 0.2, 0.05).unwrap();
        let n = taps.len();
        for k in 0..n / 2 {
            assert!((taps[k] - taps[n - 1 - k]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_low_pass_rejects_bad_cutoff() {
        assert_eq!(
            firdes::low_pass(1.0, 48_000.0, 30_000.0, 1_000.0),
            Err(DspError::InvalidCutoff(30_000.0))
        );
        assert!(firdes::low_pass(1.0, 48_000.0, 1_000.0, 0.0).is_err());
    }

    #[test]
    fn test_gaussian_area_and_peak() {
        let taps = firdes::gaussian(1.0, 2.0, 0.4, 8);
        let area: f32 = taps.iter().sum();
        assert!((area - 1.0).abs() < 1e-5);
        // Symmetric around the centre pair of the window
        let peak = taps.iter().cloned().fold(0.0f32, f32::max);
        assert!((taps[3] - peak).abs() < 1e-6);
    }

    #[test]
    fn test_convolve_with_unit_impulse() {
        let a = [0.25, 0.5, 0.25];
        assert_eq!(firdes::convolve(&a, &[1.0]), a.to_vec());
        assert_eq!(firdes::convolve(&[1.0, 1.0], &[1.0, 1.0]), vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_fir_impulse_response() {
        let mut fir = FirFilter::new(vec![0.5, 0.25, 0.125]).unwrap();
        let out: Vec<f32> = [1.0, 0.0, 0.0, 0.0].iter().map(|&x| fir.process(x)).collect();
        assert_eq!(out, vec![0.5, 0.25, 0.125, 0.0]);
    }

    #[test]
    fn test_fir_iq_lowpass_attenuates_high_freq() {
        let taps = firdes::low_pass(1.0, 48_000.0, 2_000.0, 1_000.0).unwrap();
        let mut fir = FirFilterIq::new(taps).unwrap();

        let mut max_output = 0.0f32;
        for n in 0..2000 {
            // 15 kHz tone, well inside the stopband
            let phase = 2.0 * core::f32::consts::PI * 15_000.0 * n as f32 / 48_000.0;
            let out = fir.process(IqSample::from_phase(phase));
            if n > fir.len() {
                max_output = max_output.max(out.magnitude());
            }
        }
        assert!(max_output < 0.01, "stopband leak {}", max_output);
    }

    #[test]
    fn test_fir_rejects_empty_taps() {
        assert_eq!(FirFilter::new(Vec::new()).unwrap_err(), DspError::EmptyTaps);
        assert!(FirFilterIq::new(Vec::new()).is_err());
    }

    #[test]
    fn test_dc_blocker_removes_dc() {
        let mut blocker = DcBlockerIq::new(0.99);
        let mut out = IqSample::ZERO;
        for _ in 0..2000 {
            out = blocker.process(IqSample::new(1.0, -0.5));
        }
        assert!(out.magnitude() < 0.01);
    }

    #[test]
    fn test_dc_blocker_survives_nan() {
        let mut clean = DcBlocker::new(0.99);
        let mut hit = DcBlocker::new(0.99);
        for n in 0..50 {
            let x = (n as f32 * 0.3).sin();
            assert_eq!(clean.process(x), hit.process(x));
        }
        assert_eq!(hit.process(f32::NAN), 0.0);
        for n in 50..100 {
            let x = (n as f32 * 0.3).sin();
            assert_eq!(clean.process(x), hit.process(x));
        }
    }
}
