//! GMSK demodulator.
//!
//! Frequency discriminator → Mueller-and-Müller timing recovery → binary
//! slicer. All loop state lives in the demodulator and carries across
//! successive calls, so a channel is treated as one unbounded stream.

use crate::error::ModeError;
use crate::quadrature::QuadratureDemod;
use crate::timing::ClockRecoveryMm;
use ais_dsp_core::{IqSample, SignalMetrics};
use alloc::vec::Vec;
use core::f32::consts::FRAC_PI_2;

/// GMSK demodulator configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct GmskDemodulatorConfig {
    /// Nominal samples per symbol at the demodulator input
    pub samples_per_symbol: f32,
    /// Timing phase loop gain
    pub gain_mu: f32,
    /// Initial fractional timing phase
    pub mu: f32,
    /// Maximum relative deviation of the recovered symbol period
    pub omega_relative_limit: f32,
    /// Initial relative symbol clock error
    pub freq_error: f32,
}

impl Default for GmskDemodulatorConfig {
    fn default() -> Self {
        Self {
            samples_per_symbol: 2.0,
            gain_mu: 0.175,
            mu: 0.5,
            omega_relative_limit: 0.005,
            freq_error: 0.0,
        }
    }
}

impl GmskDemodulatorConfig {
    /// Symbol period loop gain derived from `gain_mu` (critically damped).
    #[must_use]
    pub fn gain_omega(&self) -> f32 {
        0.25 * self.gain_mu * self.gain_mu
    }

    /// Modulation sensitivity in radians per sample for h = 0.5.
    #[must_use]
    pub fn sensitivity(&self) -> f32 {
        FRAC_PI_2 / self.samples_per_symbol
    }
}

/// GMSK demodulator state.
pub struct GmskDemodulator {
    config: GmskDemodulatorConfig,
    discriminator: QuadratureDemod,
    clock: ClockRecoveryMm,

    // Scratch buffers reused between calls
    soft: Vec<f32>,
    symbols: Vec<f32>,

    // Signal quality
    power: f32,
}

impl GmskDemodulator {
    /// Create a new GMSK demodulator.
    ///
    /// # Errors
    /// Returns a [`ModeError`] if any timing loop parameter is out of range.
    pub fn new(config: GmskDemodulatorConfig) -> Result<Self, ModeError> {
        if !(config.samples_per_symbol >= 1.5) {
            return Err(ModeError::SamplesPerSymbol(config.samples_per_symbol));
        }
        let omega = config.samples_per_symbol * (1.0 + config.freq_error);
        let clock = ClockRecoveryMm::new(
            omega,
            config.gain_omega(),
            config.mu,
            config.gain_mu,
            config.omega_relative_limit,
        )?;

        Ok(Self {
            discriminator: QuadratureDemod::new(1.0 / config.sensitivity()),
            clock,
            soft: Vec::new(),
            symbols: Vec::new(),
            power: 0.0,
            config,
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &GmskDemodulatorConfig {
        &self.config
    }

    /// Demodulate a chunk of baseband samples, appending one bit decision
    /// (0 or 1) per recovered symbol.
    pub fn process(&mut self, input: &[IqSample], bits: &mut Vec<u8>) {
        self.demodulate(input);
        bits.extend(self.symbols.iter().map(|&s| slice_bit(s)));
    }

    fn demodulate(&mut self, input: &[IqSample]) {
        for s in input {
            let p = s.magnitude_squared();
            if p.is_finite() {
                self.power = 0.999 * self.power + 0.001 * p;
            }
        }

        self.soft.clear();
        self.discriminator.process_block(input, &mut self.soft);

        self.symbols.clear();
        self.clock.process(&self.soft, &mut self.symbols);
    }

    /// Get signal quality metrics.
    #[must_use]
    pub fn metrics(&self) -> SignalMetrics {
        SignalMetrics {
            power: self.power,
            omega: self.clock.omega(),
            mu: self.clock.mu(),
            timing_error: self.clock.last_error(),
        }
    }
}

/// Binary slicer: non-negative symbols decide 1.
#[inline]
fn slice_bit(symbol: f32) -> u8 {
    u8::from(symbol >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{GmskModulator, GmskModulatorConfig};

    fn pseudo_random_bits(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                ((state >> 16) & 1) as u8
            })
            .collect()
    }

    /// Offset at which `needle` appears in `haystack`.
    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn test_default_config_matches_ais_capture() {
        let config = GmskDemodulatorConfig::default();
        assert_eq!(config.samples_per_symbol, 2.0);
        assert_eq!(config.gain_mu, 0.175);
        assert_eq!(config.mu, 0.5);
        assert_eq!(config.omega_relative_limit, 0.005);
        assert_eq!(config.freq_error, 0.0);
        assert!((config.gain_omega() - 0.007_656_25).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_low_oversampling() {
        let config = GmskDemodulatorConfig {
            samples_per_symbol: 1.0,
            ..GmskDemodulatorConfig::default()
        };
        assert!(matches!(
            GmskDemodulator::new(config),
            Err(ModeError::SamplesPerSymbol(_))
        ));
    }

    #[test]
    fn test_recovers_modulated_bits() {
        let mut tx = GmskModulator::new(GmskModulatorConfig::default()).unwrap();
        let mut bits: Vec<u8> = (0..48).map(|n| (n % 2) as u8).collect();
        bits.extend(pseudo_random_bits(400, 7));

        let mut samples = tx.modulate(&bits);
        samples.extend(tx.flush());

        let mut rx = GmskDemodulator::new(GmskDemodulatorConfig::default()).unwrap();
        let mut out = Vec::new();
        for chunk in samples.chunks(61) {
            rx.process(chunk, &mut out);
        }

        // After the lock-in preamble the payload comes out intact
        let payload = &bits[48..];
        let at = find(&out, &payload[..64]).expect("payload start not found");
        assert!(at <= 48 + 8, "payload found too late at {}", at);
        let recovered = &out[at..];
        let n = payload.len() - 8;
        assert!(recovered.len() >= n);
        assert_eq!(&recovered[..n], &payload[..n]);
    }

    #[test]
    fn test_recovers_after_nan_sample() {
        let mut tx = GmskModulator::new(GmskModulatorConfig::default()).unwrap();
        let mut bits: Vec<u8> = (0..48).map(|n| (n % 2) as u8).collect();
        bits.extend(pseudo_random_bits(400, 11));
        let mut samples = tx.modulate(&bits);
        samples.extend(tx.flush());
        samples[10] = IqSample::new(f32::NAN, 0.0);

        let mut rx = GmskDemodulator::new(GmskDemodulatorConfig::default()).unwrap();
        let mut out = Vec::new();
        rx.process(&samples, &mut out);

        let metrics = rx.metrics();
        assert!(metrics.power.is_finite());
        assert!((metrics.omega - 2.0).abs() <= 2.0 * 0.005 + 1e-6);
        // An unlocked loop would step at its minimum advance and overproduce
        assert!(out.len() < bits.len() + 32, "{} bits from {}", out.len(), bits.len());
        assert!(find(&out, &bits[48..112]).is_some());
    }

    #[test]
    fn test_metrics_track_power_and_omega() {
        let mut tx = GmskModulator::new(GmskModulatorConfig::default()).unwrap();
        let samples = tx.modulate(&pseudo_random_bits(2000, 3));

        let mut rx = GmskDemodulator::new(GmskDemodulatorConfig::default()).unwrap();
        let mut out = Vec::new();
        rx.process(&samples, &mut out);

        let metrics = rx.metrics();
        assert!((metrics.power - 1.0).abs() < 0.05);
        assert!((metrics.omega - 2.0).abs() <= 2.0 * 0.005 + 1e-6);
        assert!((0.0..1.0).contains(&metrics.mu));
    }
}
