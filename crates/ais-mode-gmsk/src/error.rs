//! Configuration errors for the GMSK bit path.

use core::fmt;

/// Error raised when a demodulator, correlator or modulator is built with
/// invalid parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ModeError {
    /// Samples per symbol below what the timing interpolator supports.
    SamplesPerSymbol(f32),
    /// Timing loop gain must be in (0, 1].
    TimingGain(f32),
    /// Initial timing phase must be in [0, 1).
    TimingPhase(f32),
    /// Omega limit must be in [0, 1).
    OmegaLimit(f32),
    /// Gaussian bandwidth-time product must be positive.
    BandwidthTime(f32),
    /// Access code has no bits.
    EmptyAccessCode,
    /// Access code longer than the correlator register.
    AccessCodeTooLong(usize),
    /// Access code string contains something other than '0' or '1'.
    InvalidAccessCodeChar(char),
    /// Tolerated bit errors must be below the code length.
    ThresholdTooHigh {
        /// Requested tolerance
        max_bit_errors: u32,
        /// Code length in bits
        len: usize,
    },
}

impl fmt::Display for ModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SamplesPerSymbol(sps) => {
                write!(f, "samples per symbol {sps} below minimum of 1.5")
            }
            Self::TimingGain(gain) => write!(f, "timing loop gain {gain} outside (0, 1]"),
            Self::TimingPhase(mu) => write!(f, "initial timing phase {mu} outside [0, 1)"),
            Self::OmegaLimit(limit) => write!(f, "omega relative limit {limit} outside [0, 1)"),
            Self::BandwidthTime(bt) => write!(f, "bandwidth-time product {bt} must be > 0"),
            Self::EmptyAccessCode => f.write_str("access code is empty"),
            Self::AccessCodeTooLong(len) => {
                write!(f, "access code of {len} bits exceeds 64-bit register")
            }
            Self::InvalidAccessCodeChar(c) => write!(f, "invalid access code character {c:?}"),
            Self::ThresholdTooHigh {
                max_bit_errors,
                len,
            } => write!(
                f,
                "{max_bit_errors} tolerated bit errors for a {len}-bit access code matches everything"
            ),
        }
    }
}

impl core::error::Error for ModeError {}
