//! Receiver configuration and defaults
//!
//! Compile-time constants describe the capture setup the receiver was
//! built around; [`ReceiverConfig`] is the runtime surface, set once at
//! startup and turned into a pipeline by
//! [`PipelineBuilder::from_config`](crate::pipeline::PipelineBuilder::from_config).

use crate::error::ConfigError;
use crate::sink::{SinkOutput, SinkSpec};
use crate::stage::StageSpec;
use ais_dsp_core::DspError;
use ais_mode_gmsk::{
    AccessCode, GmskDemodulator, GmskDemodulatorConfig, AIS_START_FLAG, AIS_TRAINING,
    START_FLAG_PATTERN_ID, TRAINING_PATTERN_ID,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Capture sample rate (1.536 MS/s)
pub const DEFAULT_SAMPLE_RATE: f64 = 1_536_000.0;

/// Tuned centre frequency, midway between the two AIS channels
pub const DEFAULT_CENTER_FREQ_HZ: f64 = 162_000_000.0;

/// Distance of each AIS channel from the centre frequency
pub const AIS_CHANNEL_OFFSET_HZ: f64 = 25_000.0;

/// AIS symbol rate in baud
pub const AIS_SYMBOL_RATE: f64 = 9_600.0;

/// Bounded queue capacity between stages, in chunks
pub const DEFAULT_QUEUE_DEPTH: usize = 16;

/// Samples pulled from the source per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 8_192;

/// Channel filter cutoff as a fraction of the channel output rate
pub const CHANNEL_CUTOFF_FRACTION: f64 = 0.4;

/// Channel filter transition width as a fraction of the channel output rate
pub const CHANNEL_TRANSITION_FRACTION: f64 = 0.1;

/// Bits between a pattern's end in the transmitted stream and its frame
/// tag, for a default channel chain: the group delay of the 25-tap channel
/// filter (6 symbols at 2 samples per symbol) plus one symbol of timing
/// interpolator lookahead. Other decimations shift this constant.
pub const DEFAULT_CHAIN_LATENCY_BITS: u64 = 7;

/// Rational resampler settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ResamplerSpec {
    /// Upsampling factor
    pub interpolation: usize,
    /// Downsampling factor
    pub decimation: usize,
    /// Prototype passband as a fraction of the narrower band
    pub fractional_bw: f32,
}

impl Default for ResamplerSpec {
    fn default() -> Self {
        Self {
            interpolation: 1,
            decimation: 1,
            fractional_bw: ais_dsp_core::resampler::DEFAULT_FRACTIONAL_BW,
        }
    }
}

/// One access code correlator stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelatorSpec {
    /// Pattern as a string of '0' and '1'
    pub pattern: String,
    /// Tolerated bit errors (0 = exact match)
    pub max_bit_errors: u32,
    /// Identifier reported in frame tags
    pub pattern_id: u8,
}

impl CorrelatorSpec {
    /// Stage-one AIS training sequence correlator.
    #[must_use]
    pub fn ais_training(max_bit_errors: u32) -> Self {
        Self {
            pattern: AIS_TRAINING.to_string(),
            max_bit_errors,
            pattern_id: TRAINING_PATTERN_ID,
        }
    }

    /// Stage-two AIS flag correlator.
    #[must_use]
    pub fn ais_start_flag(max_bit_errors: u32) -> Self {
        Self {
            pattern: AIS_START_FLAG.to_string(),
            max_bit_errors,
            pattern_id: START_FLAG_PATTERN_ID,
        }
    }

    /// Parse into an access code.
    ///
    /// # Errors
    /// Returns the pattern validation error.
    pub fn access_code(&self) -> Result<AccessCode, ConfigError> {
        Ok(AccessCode::parse(
            &self.pattern,
            self.max_bit_errors,
            self.pattern_id,
        )?)
    }
}

/// Configuration of one channel chain.
#[derive(Clone, Debug)]
pub struct ChannelSpec {
    /// Channel name, used in thread names, logs and default file names
    pub name: String,
    /// Offset from the tuned centre frequency in Hz
    pub offset_hz: f64,
    /// Channel selector decimation
    pub decimation: usize,
    /// Channel filter cutoff; derived from the output rate when `None`
    pub cutoff_hz: Option<f64>,
    /// Channel filter transition width; derived when `None`
    pub transition_hz: Option<f64>,
    /// Insert a DC blocker ahead of the mixer
    pub dc_block: bool,
    /// Rate converter
    pub resampler: ResamplerSpec,
    /// GMSK demodulator
    pub demod: GmskDemodulatorConfig,
    /// Correlators, applied in order
    pub correlators: Vec<CorrelatorSpec>,
    /// Bit sink
    pub sink: SinkSpec,
}

impl ChannelSpec {
    /// AIS channel at `offset_hz` with the capture defaults, writing
    /// `bits_<name>.bin` and `bits_<name>.debug.bin` under `output_dir`.
    #[must_use]
    pub fn ais(name: &str, offset_hz: f64, output_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            offset_hz,
            decimation: 1,
            cutoff_hz: None,
            transition_hz: None,
            dc_block: false,
            resampler: ResamplerSpec::default(),
            demod: GmskDemodulatorConfig::default(),
            correlators: vec![
                CorrelatorSpec::ais_training(0),
                CorrelatorSpec::ais_start_flag(0),
            ],
            sink: SinkSpec::new(vec![
                SinkOutput::file("primary", output_dir.join(format!("bits_{name}.bin"))),
                SinkOutput::file("debug", output_dir.join(format!("bits_{name}.debug.bin"))),
            ]),
        }
    }

    /// Channel centre frequency for a given tuned frequency.
    #[must_use]
    pub fn frequency_hz(&self, center_freq_hz: f64) -> f64 {
        center_freq_hz + self.offset_hz
    }

    /// Channel filter `(cutoff, transition)` in Hz at the given input rate.
    #[must_use]
    pub fn filter_band(&self, sample_rate: f64) -> (f64, f64) {
        let out_rate = sample_rate / self.decimation.max(1) as f64;
        (
            self.cutoff_hz.unwrap_or(CHANNEL_CUTOFF_FRACTION * out_rate),
            self.transition_hz
                .unwrap_or(CHANNEL_TRANSITION_FRACTION * out_rate),
        )
    }

    /// Ordered stage list for this channel at the given input rate.
    #[must_use]
    pub fn stages(&self, sample_rate: f64) -> Vec<StageSpec> {
        let (cutoff_hz, transition_hz) = self.filter_band(sample_rate);

        let mut stages = Vec::with_capacity(6 + self.correlators.len());
        if self.dc_block {
            stages.push(StageSpec::DcBlock { alpha: 0.9995 });
        }
        stages.push(StageSpec::ChannelSelect {
            offset_hz: self.offset_hz,
            decimation: self.decimation,
            cutoff_hz,
            transition_hz,
        });
        stages.push(StageSpec::Resample(self.resampler.clone()));
        stages.push(StageSpec::Demodulate(self.demod.clone()));
        stages.push(StageSpec::DiffDecode);
        stages.extend(self.correlators.iter().cloned().map(StageSpec::Correlate));
        stages.push(StageSpec::Sink(self.sink.clone()));
        stages
    }

    /// Symbol rate at the demodulator for the given input rate.
    #[must_use]
    pub fn symbol_rate(&self, sample_rate: f64) -> f64 {
        let r = &self.resampler;
        sample_rate / self.decimation.max(1) as f64 * r.interpolation as f64
            / r.decimation.max(1) as f64
            / f64::from(self.demod.samples_per_symbol)
    }
}

/// Complete receiver configuration.
#[derive(Clone, Debug)]
pub struct ReceiverConfig {
    /// Input sample rate in Hz
    pub sample_rate: f64,
    /// Tuned centre frequency in Hz
    pub center_freq_hz: f64,
    /// Channel chains
    pub channels: Vec<ChannelSpec>,
    /// Bounded queue capacity between stages, in chunks
    pub queue_depth: usize,
    /// Samples per chunk read from the source
    pub chunk_size: usize,
    /// Drop chunks instead of blocking when a channel falls behind
    pub lossy: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self::with_output_dir(Path::new("."))
    }
}

impl ReceiverConfig {
    /// Default dual-channel configuration writing sinks under `output_dir`.
    ///
    /// Channel A (AIS1, 161.975 MHz) sits below the centre frequency and
    /// channel B (AIS2, 162.025 MHz) above it.
    #[must_use]
    pub fn with_output_dir(output_dir: &Path) -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            center_freq_hz: DEFAULT_CENTER_FREQ_HZ,
            channels: vec![
                ChannelSpec::ais("A", -AIS_CHANNEL_OFFSET_HZ, output_dir),
                ChannelSpec::ais("B", AIS_CHANNEL_OFFSET_HZ, output_dir),
            ],
            queue_depth: DEFAULT_QUEUE_DEPTH,
            chunk_size: DEFAULT_CHUNK_SIZE,
            lossy: false,
        }
    }

    /// Same configuration at a different input sample rate.
    ///
    /// Rate-dependent stage parameters (mixer increment, derived channel
    /// filter band, resampler taps) are computed from the sample rate when
    /// the pipeline is built, so they all follow the new rate. Explicit
    /// cutoff and transition frequencies are absolute and kept as given.
    #[must_use]
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Check the configuration without building anything.
    ///
    /// # Errors
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(self.sample_rate).into());
        }
        if self.channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::QueueDepth);
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ChunkSize);
        }

        let mut names = HashSet::new();
        for channel in &self.channels {
            if !names.insert(channel.name.as_str()) {
                return Err(ConfigError::DuplicateChannel(channel.name.clone()));
            }
            self.validate_channel(channel)?;
        }
        Ok(())
    }

    fn validate_channel(&self, channel: &ChannelSpec) -> Result<(), ConfigError> {
        let nyquist = self.sample_rate / 2.0;
        if !channel.offset_hz.is_finite() || channel.offset_hz.abs() > nyquist {
            return Err(DspError::OffsetAboveNyquist {
                offset_hz: channel.offset_hz,
                nyquist_hz: nyquist,
            }
            .into());
        }
        if channel.decimation == 0 {
            return Err(DspError::ZeroDecimation.into());
        }
        if channel.resampler.interpolation == 0 {
            return Err(DspError::ZeroInterpolation.into());
        }
        if channel.resampler.decimation == 0 {
            return Err(DspError::ZeroDecimation.into());
        }
        let (cutoff, transition) = channel.filter_band(self.sample_rate);
        if !(cutoff > 0.0 && cutoff < nyquist) {
            return Err(DspError::InvalidCutoff(cutoff).into());
        }
        if !(transition > 0.0) {
            return Err(DspError::InvalidTransition(transition).into());
        }

        GmskDemodulator::new(channel.demod.clone())?;
        for correlator in &channel.correlators {
            correlator.access_code()?;
        }
        if channel.sink.outputs.is_empty() {
            return Err(ConfigError::EmptySink(channel.name.clone()));
        }
        Ok(())
    }

    /// Paths of all file sink outputs.
    #[must_use]
    pub fn output_files(&self) -> Vec<PathBuf> {
        self.channels
            .iter()
            .flat_map(|c| c.sink.outputs.iter())
            .filter_map(|o| o.path().map(Path::to_path_buf))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_frequencies() {
        let config = ReceiverConfig::default();
        let a = &config.channels[0];
        let b = &config.channels[1];
        assert_eq!(a.frequency_hz(config.center_freq_hz), 161_975_000.0);
        assert_eq!(b.frequency_hz(config.center_freq_hz), 162_025_000.0);
    }

    #[test]
    fn test_default_filter_band_follows_output_rate() {
        let mut channel = ChannelSpec::ais("A", -25e3, Path::new("."));
        assert_eq!(channel.filter_band(1_536_000.0), (614_400.0, 153_600.0));
        channel.decimation = 80;
        let (cutoff, transition) = channel.filter_band(1_536_000.0);
        assert!((cutoff - 7_680.0).abs() < 1e-9);
        assert!((transition - 1_920.0).abs() < 1e-9);
    }

    #[test]
    fn test_stage_order() {
        let mut channel = ChannelSpec::ais("A", 0.0, Path::new("."));
        channel.dc_block = true;
        let names: Vec<String> = channel
            .stages(DEFAULT_SAMPLE_RATE)
            .iter()
            .map(StageSpec::name)
            .collect();
        assert_eq!(
            names,
            [
                "dc-block",
                "channel-select",
                "resample",
                "demod",
                "diff-decode",
                "correlate-1",
                "correlate-2",
                "sink"
            ]
        );
    }

    #[test]
    fn test_symbol_rate() {
        let mut channel = ChannelSpec::ais("A", 0.0, Path::new("."));
        assert_eq!(channel.symbol_rate(1_536_000.0), 768_000.0);
        channel.decimation = 80;
        assert!((channel.symbol_rate(1_536_000.0) - AIS_SYMBOL_RATE).abs() < 1e-6);
    }
}
