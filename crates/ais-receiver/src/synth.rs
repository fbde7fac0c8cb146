//! Synthetic AIS captures
//!
//! Produces complex baseband containing GMSK bursts at a channel offset,
//! for self-test replay and pipeline tests.

use crate::config::{AIS_CHANNEL_OFFSET_HZ, DEFAULT_SAMPLE_RATE};
use crate::error::ConfigError;
use ais_dsp_core::{DspError, IqSample, Nco};
use ais_mode_gmsk::{
    AisBurst, AisBurstBuilder, DifferentialEncoder, GmskModulator, GmskModulatorConfig,
};

/// Synthetic capture parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SynthConfig {
    /// Output sample rate in Hz
    pub sample_rate: f64,
    /// Samples per symbol of the modulated bursts
    pub samples_per_symbol: usize,
    /// Frequency offset of the bursts from the centre in Hz
    pub offset_hz: f64,
    /// Number of bursts
    pub bursts: usize,
    /// Silence before each burst, in symbols
    pub gap_symbols: usize,
    /// Burst amplitude
    pub amplitude: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            samples_per_symbol: 2,
            offset_hz: -AIS_CHANNEL_OFFSET_HZ,
            bursts: 4,
            gap_symbols: 64,
            amplitude: 0.7,
        }
    }
}

/// Burst placed in a synthetic capture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedBurst {
    /// Sample index of the burst's first bit divided by samples per symbol
    pub first_symbol: usize,
    /// Logical burst content
    pub burst: AisBurst,
}

/// Generated samples and where the bursts went.
#[derive(Clone, Debug)]
pub struct SyntheticCapture {
    /// Complex baseband at `sample_rate`
    pub samples: Vec<IqSample>,
    /// Bursts in order of transmission
    pub bursts: Vec<PlacedBurst>,
}

/// Payload bits of burst `n`: the text "AIS SELF TEST <n>", LSB first.
#[must_use]
pub fn test_payload(n: usize) -> Vec<u8> {
    format!("AIS SELF TEST {n}")
        .bytes()
        .flat_map(|byte| (0..8).map(move |k| (byte >> k) & 1))
        .collect()
}

/// Generate a capture of `config.bursts` bursts.
///
/// Each burst carries [`test_payload`] and closes with the second-stage
/// flag pattern, so both correlators fire once per burst.
///
/// # Errors
/// Rejects invalid rates, offsets beyond Nyquist and modulator settings.
pub fn synthesize(config: &SynthConfig) -> Result<SyntheticCapture, ConfigError> {
    if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
        return Err(DspError::InvalidSampleRate(config.sample_rate).into());
    }
    let nyquist_hz = config.sample_rate / 2.0;
    if config.offset_hz.abs() > nyquist_hz {
        return Err(DspError::OffsetAboveNyquist {
            offset_hz: config.offset_hz,
            nyquist_hz,
        }
        .into());
    }

    let mut modulator = GmskModulator::new(GmskModulatorConfig {
        samples_per_symbol: config.samples_per_symbol,
        amplitude: config.amplitude,
        ..GmskModulatorConfig::default()
    })?;
    // Mixing with the conjugate of -offset shifts the bursts up by offset
    let mut nco = Nco::new(config.sample_rate as f32, -config.offset_hz as f32);
    let builder = AisBurstBuilder::new().confirm_pattern(true);
    let sps = config.samples_per_symbol;

    let mut samples = Vec::new();
    let mut bursts = Vec::with_capacity(config.bursts);
    for n in 0..config.bursts {
        samples.extend(std::iter::repeat(IqSample::ZERO).take(config.gap_symbols * sps));

        let burst = builder.build(&test_payload(n));
        let mut encoder = DifferentialEncoder::new();
        let mut line = Vec::with_capacity(burst.bits.len());
        encoder.process_block(&burst.bits, &mut line);

        let first_symbol = samples.len() / sps;
        modulator.reset();
        samples.extend(modulator.modulate(&line));
        samples.extend(modulator.flush());

        bursts.push(PlacedBurst {
            first_symbol,
            burst,
        });
    }
    samples.extend(std::iter::repeat(IqSample::ZERO).take(config.gap_symbols * sps));

    for s in &mut samples {
        *s = nco.mix(*s);
    }
    log::debug!(
        "synthesised {} bursts, {} samples at {} S/s",
        bursts.len(),
        samples.len(),
        config.sample_rate
    );
    Ok(SyntheticCapture { samples, bursts })
}
