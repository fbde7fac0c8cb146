//! GMSK modulator.
//!
//! Used to synthesise AIS bursts for loopback tests and capture files. Bits
//! are mapped to ±1, shaped by a Gaussian frequency pulse spanning one
//! symbol and frequency modulated with h = 0.5.

use crate::error::ModeError;
use ais_dsp_core::{firdes, FirFilter, IqSample};
use alloc::vec;
use alloc::vec::Vec;
use core::f32::consts::{FRAC_PI_2, PI};
#[allow(unused_imports)]
use micromath::F32Ext;

/// Gaussian filter length in symbols.
const GAUSSIAN_SPAN_SYMBOLS: usize = 4;

/// GMSK modulator configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct GmskModulatorConfig {
    /// Output samples per symbol
    pub samples_per_symbol: usize,
    /// Gaussian bandwidth-time product
    pub bt: f32,
    /// Output amplitude
    pub amplitude: f32,
}

impl Default for GmskModulatorConfig {
    fn default() -> Self {
        Self {
            samples_per_symbol: 2,
            bt: 0.4,
            amplitude: 1.0,
        }
    }
}

/// GMSK modulator state.
pub struct GmskModulator {
    config: GmskModulatorConfig,
    shaping: FirFilter,
    sensitivity: f32,
    phase: f32,
}

impl GmskModulator {
    /// Create a new GMSK modulator.
    ///
    /// # Errors
    /// Rejects fewer than 2 samples per symbol and non-positive BT.
    pub fn new(config: GmskModulatorConfig) -> Result<Self, ModeError> {
        if config.samples_per_symbol < 2 {
            return Err(ModeError::SamplesPerSymbol(config.samples_per_symbol as f32));
        }
        if !(config.bt > 0.0) {
            return Err(ModeError::BandwidthTime(config.bt));
        }

        let sps = config.samples_per_symbol;
        let gaussian = firdes::gaussian(1.0, sps as f32, config.bt, GAUSSIAN_SPAN_SYMBOLS * sps);
        let taps = firdes::convolve(&gaussian, &vec![1.0; sps]);
        // Taps are never empty for sps >= 2
        let shaping = FirFilter::new(taps).map_err(|_| ModeError::SamplesPerSymbol(sps as f32))?;

        Ok(Self {
            sensitivity: FRAC_PI_2 / sps as f32,
            shaping,
            phase: 0.0,
            config,
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &GmskModulatorConfig {
        &self.config
    }

    /// Delay from a bit entering the modulator to the centre of its
    /// frequency pulse, in samples.
    #[must_use]
    pub fn delay(&self) -> usize {
        (self.shaping.len() - 1) / 2
    }

    /// Modulate bits (0 or 1, any non-zero counts as 1) into baseband
    /// samples, `samples_per_symbol` per bit.
    #[must_use]
    pub fn modulate(&mut self, bits: &[u8]) -> Vec<IqSample> {
        let mut out = Vec::with_capacity(bits.len() * self.config.samples_per_symbol);
        for &bit in bits {
            let symbol = if bit != 0 { 1.0 } else { -1.0 };
            self.push_symbol(symbol, &mut out);
        }
        out
    }

    /// Drain the shaping filter so the last bit's pulse is fully emitted.
    #[must_use]
    pub fn flush(&mut self) -> Vec<IqSample> {
        let mut out = Vec::with_capacity(self.shaping.len());
        for _ in 1..self.shaping.len() {
            let freq = self.shaping.process(0.0);
            out.push(self.advance(freq));
        }
        out
    }

    /// Reset filter and phase state.
    pub fn reset(&mut self) {
        self.shaping.reset();
        self.phase = 0.0;
    }

    fn push_symbol(&mut self, symbol: f32, out: &mut Vec<IqSample>) {
        // Zero-stuffed upsampling through the shaping filter
        for k in 0..self.config.samples_per_symbol {
            let x = if k == 0 { symbol } else { 0.0 };
            let freq = self.shaping.process(x);
            out.push(self.advance(freq));
        }
    }

    fn advance(&mut self, freq: f32) -> IqSample {
        self.phase += self.sensitivity * freq;
        if self.phase > PI {
            self.phase -= 2.0 * PI;
        } else if self.phase < -PI {
            self.phase += 2.0 * PI;
        }
        IqSample::from_phase(self.phase).scale(self.config.amplitude)
    }
}
