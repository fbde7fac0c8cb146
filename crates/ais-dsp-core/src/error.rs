//! Parameter validation errors for DSP blocks.

use core::fmt;

/// Error raised when a DSP block is constructed with invalid parameters.
///
/// All checks happen at construction time; once built, blocks never fail
/// while processing samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DspError {
    /// Sample rate must be finite and strictly positive.
    InvalidSampleRate(f64),
    /// Decimation factor must be at least 1.
    ZeroDecimation,
    /// Interpolation factor must be at least 1.
    ZeroInterpolation,
    /// Mixing offset exceeds the Nyquist frequency of the input.
    OffsetAboveNyquist {
        /// Requested offset in Hz
        offset_hz: f64,
        /// Nyquist frequency (`sample_rate / 2`) in Hz
        nyquist_hz: f64,
    },
    /// Filter cutoff must lie strictly between 0 and Nyquist.
    InvalidCutoff(f64),
    /// Transition width must be strictly positive.
    InvalidTransition(f64),
    /// A filter needs at least one tap.
    EmptyTaps,
}

impl fmt::Display for DspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSampleRate(rate) => write!(f, "invalid sample rate {rate} Hz"),
            Self::ZeroDecimation => f.write_str("decimation must be >= 1"),
            Self::ZeroInterpolation => f.write_str("interpolation must be >= 1"),
            Self::OffsetAboveNyquist {
                offset_hz,
                nyquist_hz,
            } => write!(
                f,
                "offset {offset_hz} Hz exceeds Nyquist frequency {nyquist_hz} Hz"
            ),
            Self::InvalidCutoff(cutoff) => write!(f, "invalid filter cutoff {cutoff} Hz"),
            Self::InvalidTransition(width) => write!(f, "invalid transition width {width} Hz"),
            Self::EmptyTaps => f.write_str("filter has no taps"),
        }
    }
}

impl core::error::Error for DspError {}
