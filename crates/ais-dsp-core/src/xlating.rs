//! Frequency-translating FIR filter (channel selector).
//!
//! Mixes the shared wideband stream down by a fixed offset, band-limits it
//! with a low-pass FIR and keeps every `decimation`-th output.

use crate::error::DspError;
use crate::filter::{firdes, FirFilterIq};
use crate::oscillator::Nco;
use crate::types::IqSample;
use alloc::vec::Vec;

/// Channel selector: NCO mixer followed by a decimating low-pass FIR.
#[derive(Clone, Debug)]
pub struct FreqXlatingFir {
    nco: Nco,
    filter: FirFilterIq,
    decimation: usize,
    /// Input samples left before the next kept output
    countdown: usize,
    sample_rate: f64,
    offset_hz: f64,
}

impl FreqXlatingFir {
    /// Create a channel selector with explicit filter taps.
    ///
    /// # Arguments
    /// * `sample_rate` - Input sample rate in Hz
    /// * `offset_hz` - Channel offset from the tuned centre; the input is
    ///   multiplied by `e^(-j*2π*offset*t)`
    /// * `decimation` - Integer output rate reduction (1 = filtering only)
    /// * `taps` - Low-pass taps at the input rate
    ///
    /// # Errors
    /// Rejects non-positive rates, zero decimation, offsets beyond Nyquist
    /// and empty tap sets.
    pub fn new(
        sample_rate: f64,
        offset_hz: f64,
        decimation: usize,
        taps: Vec<f32>,
    ) -> Result<Self, DspError> {
        validate(sample_rate, offset_hz, decimation)?;
        Ok(Self {
            nco: Nco::new(sample_rate as f32, offset_hz as f32),
            filter: FirFilterIq::new(taps)?,
            decimation,
            countdown: 0,
            sample_rate,
            offset_hz,
        })
    }

    /// Create a channel selector with a Hamming-windowed low-pass design.
    ///
    /// # Errors
    /// See [`FreqXlatingFir::new`] and [`firdes::low_pass`].
    pub fn with_low_pass(
        sample_rate: f64,
        offset_hz: f64,
        decimation: usize,
        cutoff_hz: f64,
        transition_hz: f64,
    ) -> Result<Self, DspError> {
        validate(sample_rate, offset_hz, decimation)?;
        let taps = firdes::low_pass(
            1.0,
            sample_rate as f32,
            cutoff_hz as f32,
            transition_hz as f32,
        )?;
        Self::new(sample_rate, offset_hz, decimation, taps)
    }

    /// Output sample rate in Hz.
    #[must_use]
    pub fn output_rate(&self) -> f64 {
        self.sample_rate / self.decimation as f64
    }

    /// Channel offset in Hz.
    #[must_use]
    pub fn offset_hz(&self) -> f64 {
        self.offset_hz
    }

    /// Filter length in taps.
    #[must_use]
    pub fn num_taps(&self) -> usize {
        self.filter.len()
    }

    /// Group delay in input samples.
    #[must_use]
    pub fn group_delay(&self) -> usize {
        self.filter.group_delay()
    }

    /// Translate and filter a chunk of input, appending outputs.
    ///
    /// Mixer phase and decimation phase carry over between calls.
    pub fn process(&mut self, input: &[IqSample], output: &mut Vec<IqSample>) {
        output.reserve(input.len() / self.decimation + 1);
        for &sample in input {
            self.filter.push(self.nco.mix(sample));
            if self.countdown == 0 {
                output.push(self.filter.output());
                self.countdown = self.decimation;
            }
            self.countdown -= 1;
        }
    }
}

fn validate(sample_rate: f64, offset_hz: f64, decimation: usize) -> Result<(), DspError> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(DspError::InvalidSampleRate(sample_rate));
    }
    if decimation == 0 {
        return Err(DspError::ZeroDecimation);
    }
    let nyquist_hz = sample_rate / 2.0;
    if !offset_hz.is_finite() || offset_hz.abs() > nyquist_hz {
        return Err(DspError::OffsetAboveNyquist {
            offset_hz,
            nyquist_hz,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_rejects_offset_above_nyquist() {
        let err = FreqXlatingFir::new(48_000.0, 30_000.0, 1, vec![1.0]).unwrap_err();
        assert_eq!(
            err,
            DspError::OffsetAboveNyquist {
                offset_hz: 30_000.0,
                nyquist_hz: 24_000.0
            }
        );
        assert!(FreqXlatingFir::new(48_000.0, -24_000.0, 1, vec![1.0]).is_ok());
    }

    #[test]
    fn test_rejects_zero_decimation() {
        assert_eq!(
            FreqXlatingFir::new(48_000.0, 0.0, 0, vec![1.0]).unwrap_err(),
            DspError::ZeroDecimation
        );
    }

    #[test]
    fn test_zero_offset_unity_tap_is_identity() {
        let mut xlate = FreqXlatingFir::new(1_000.0, 0.0, 1, vec![1.0]).unwrap();
        let input: Vec<IqSample> = (0..16).map(|n| IqSample::new(n as f32, -(n as f32))).collect();
        let mut out = Vec::new();
        xlate.process(&input, &mut out);
        assert_eq!(out, input);
    }

    #[test]
    fn test_offset_tone_lands_at_dc() {
        let fs = 1_536_000.0;
        let offset = 25_000.0;
        let mut xlate = FreqXlatingFir::with_low_pass(fs, offset, 1, 10_000.0, 5_000.0).unwrap();
        let mut tone = Nco::new(fs as f32, offset as f32);
        let input: Vec<IqSample> = (0..4 * xlate.num_taps()).map(|_| tone.next_iq()).collect();

        let mut out = Vec::new();
        xlate.process(&input, &mut out);
        let settled = &out[xlate.num_taps()..];
        for s in settled {
            assert!((s.magnitude() - 1.0).abs() < 0.01, "magnitude {}", s.magnitude());
            assert!(s.q.abs() < 0.01);
        }
    }

    #[test]
    fn test_decimation_phase_survives_chunking() {
        let input: Vec<IqSample> = (0..30).map(|n| IqSample::new(n as f32, 0.0)).collect();

        let mut whole = FreqXlatingFir::new(1_000.0, 0.0, 3, vec![1.0]).unwrap();
        let mut expected = Vec::new();
        whole.process(&input, &mut expected);
        assert_eq!(expected.len(), 10);

        let mut chunked = FreqXlatingFir::new(1_000.0, 0.0, 3, vec![1.0]).unwrap();
        let mut out = Vec::new();
        for chunk in input.chunks(7) {
            chunked.process(chunk, &mut out);
        }
        assert_eq!(out, expected);
    }
}
