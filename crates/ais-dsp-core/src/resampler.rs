//! Polyphase rational resampler.
//!
//! Changes the sample rate by `interpolation / decimation` with a single
//! low-pass prototype split into `interpolation` polyphase branches. The
//! branch selector carries over between calls, so chunk boundaries never
//! add or drop samples.

use crate::error::DspError;
use crate::filter::firdes;
use crate::types::IqSample;
use alloc::vec;
use alloc::vec::Vec;

/// Default fractional bandwidth of the designed prototype.
pub const DEFAULT_FRACTIONAL_BW: f32 = 0.4;

/// Rational resampler over complex samples.
#[derive(Clone, Debug)]
pub struct RationalResampler {
    interpolation: usize,
    decimation: usize,
    /// `branches[p][k]` = prototype tap `p + k * interpolation`
    branches: Vec<Vec<f32>>,
    history: Vec<IqSample>,
    write_pos: usize,
    /// Next polyphase branch to evaluate
    branch: usize,
}

impl RationalResampler {
    /// Create a resampler with a designed low-pass prototype.
    ///
    /// An `interpolation == decimation == 1` resampler uses a single unity
    /// tap and is an exact pass-through with zero delay.
    ///
    /// # Errors
    /// Rejects zero factors and unusable bandwidths.
    pub fn new(interpolation: usize, decimation: usize) -> Result<Self, DspError> {
        Self::with_fractional_bw(interpolation, decimation, DEFAULT_FRACTIONAL_BW)
    }

    /// Create a resampler whose prototype passes `fractional_bw` of the
    /// narrower of the input and output bands.
    ///
    /// # Errors
    /// Rejects zero factors and bandwidths outside (0, 0.5).
    pub fn with_fractional_bw(
        interpolation: usize,
        decimation: usize,
        fractional_bw: f32,
    ) -> Result<Self, DspError> {
        check_factors(interpolation, decimation)?;
        let (interpolation, decimation) = reduce(interpolation, decimation);
        if interpolation == 1 && decimation == 1 {
            return Self::with_taps(1, 1, vec![1.0]);
        }

        let halfband = 0.5;
        if !(fractional_bw > 0.0 && fractional_bw < halfband) {
            return Err(DspError::InvalidCutoff(f64::from(fractional_bw)));
        }
        let rate = interpolation as f32 / decimation as f32;
        let (mid, transition) = if rate >= 1.0 {
            let transition = halfband - fractional_bw;
            (halfband - transition / 2.0, transition)
        } else {
            let transition = rate * (halfband - fractional_bw);
            (rate * halfband - transition / 2.0, transition)
        };
        // Designed at the interpolated rate; gain L restores amplitude
        let taps = firdes::low_pass(
            interpolation as f32,
            interpolation as f32,
            mid,
            transition,
        )?;
        Self::with_taps(interpolation, decimation, taps)
    }

    /// Create a resampler from explicit prototype taps.
    ///
    /// # Errors
    /// Rejects zero factors and empty tap sets.
    pub fn with_taps(
        interpolation: usize,
        decimation: usize,
        taps: Vec<f32>,
    ) -> Result<Self, DspError> {
        check_factors(interpolation, decimation)?;
        if taps.is_empty() {
            return Err(DspError::EmptyTaps);
        }

        let per_branch = taps.len().div_ceil(interpolation);
        let branches: Vec<Vec<f32>> = (0..interpolation)
            .map(|p| {
                (0..per_branch)
                    .map(|k| taps.get(p + k * interpolation).copied().unwrap_or(0.0))
                    .collect()
            })
            .collect();

        Ok(Self {
            interpolation,
            decimation,
            branches,
            history: vec![IqSample::ZERO; per_branch],
            write_pos: 0,
            branch: 0,
        })
    }

    /// Interpolation factor (after reduction by the common divisor).
    #[must_use]
    pub fn interpolation(&self) -> usize {
        self.interpolation
    }

    /// Decimation factor (after reduction by the common divisor).
    #[must_use]
    pub fn decimation(&self) -> usize {
        self.decimation
    }

    /// Taps per polyphase branch.
    #[must_use]
    pub fn taps_per_branch(&self) -> usize {
        self.history.len()
    }

    /// Resample a chunk of input, appending outputs.
    pub fn process(&mut self, input: &[IqSample], output: &mut Vec<IqSample>) {
        let n = self.history.len();
        output.reserve(input.len() * self.interpolation / self.decimation + 1);

        for &sample in input {
            self.history[self.write_pos] = sample;

            while self.branch < self.interpolation {
                let taps = &self.branches[self.branch];
                let mut acc = IqSample::ZERO;
                let mut read_pos = self.write_pos;
                for coeff in taps {
                    acc += self.history[read_pos] * *coeff;
                    read_pos = if read_pos == 0 { n - 1 } else { read_pos - 1 };
                }
                output.push(acc);
                self.branch += self.decimation;
            }
            self.branch -= self.interpolation;
            self.write_pos = (self.write_pos + 1) % n;
        }
    }
}

fn check_factors(interpolation: usize, decimation: usize) -> Result<(), DspError> {
    if interpolation == 0 {
        return Err(DspError::ZeroInterpolation);
    }
    if decimation == 0 {
        return Err(DspError::ZeroDecimation);
    }
    Ok(())
}

fn reduce(interpolation: usize, decimation: usize) -> (usize, usize) {
    let mut a = interpolation;
    let mut b = decimation;
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    (interpolation / a, decimation / a)
}
