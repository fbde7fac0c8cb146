//! Pipeline stages
//!
//! [`StageSpec`] is the declarative description of one processing step;
//! [`StageSpec::instantiate`] turns it into a [`Stage`] object that owns all
//! of its stream state. Stages are driven chunk by chunk and never reset,
//! so every channel is processed as a single unbounded stream.

use crate::config::{CorrelatorSpec, ResamplerSpec};
use crate::error::{ConfigError, StageError};
use crate::observer::TapPoint;
use crate::sink::{BitSink, SinkSpec};
use ais_dsp_core::{DcBlockerIq, FreqXlatingFir, IqSample, RationalResampler};
use ais_mode_gmsk::{
    AccessCodeCorrelator, DifferentialDecoder, FrameTag, GmskDemodulator, GmskDemodulatorConfig,
};
use std::sync::Arc;

/// A chunk of bits with the frame tags found in it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaggedBits {
    /// Absolute index of `bits[0]` in the channel bit stream
    pub offset: u64,
    /// Bits, one per byte, value 0 or 1
    pub bits: Vec<u8>,
    /// Tags whose offset falls in `offset..=offset + bits.len()`
    pub tags: Vec<FrameTag>,
}

/// Data travelling between stages.
#[derive(Clone, Debug)]
pub enum Payload {
    /// Complex samples, shared read-only between consumers
    Samples(Arc<[IqSample]>),
    /// Bits and tags
    Bits(TaggedBits),
}

impl Payload {
    /// Kind of stream carried.
    #[must_use]
    pub fn kind(&self) -> StreamKind {
        match self {
            Self::Samples(_) => StreamKind::Samples,
            Self::Bits(_) => StreamKind::Bits,
        }
    }

    /// Number of samples or bits carried.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Samples(s) => s.len(),
            Self::Bits(b) => b.bits.len(),
        }
    }

    /// True if the chunk carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stream kind consumed or produced by a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    /// Complex samples
    Samples,
    /// Bits
    Bits,
}

impl StreamKind {
    /// Human-readable name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Samples => "samples",
            Self::Bits => "bits",
        }
    }
}

/// A processing step driven by its own thread.
pub trait Stage: Send {
    /// Process one chunk.
    ///
    /// # Errors
    /// Returns a [`StageError`] if the chunk cannot be handled; the chain
    /// stops.
    fn process(&mut self, input: Payload) -> Result<Payload, StageError>;

    /// Called once after the input closes. Returns any derived output still
    /// held by the stage.
    ///
    /// # Errors
    /// Returns a [`StageError`] if flushing fails.
    fn finish(&mut self) -> Result<Option<Payload>, StageError> {
        Ok(None)
    }
}

/// Declarative description of a stage.
#[derive(Clone, Debug)]
pub enum StageSpec {
    /// IIR DC blocker on I and Q
    DcBlock {
        /// Feedback coefficient
        alpha: f32,
    },
    /// Frequency-translating FIR channel selector
    ChannelSelect {
        /// Channel offset in Hz
        offset_hz: f64,
        /// Output decimation
        decimation: usize,
        /// Low-pass cutoff in Hz
        cutoff_hz: f64,
        /// Low-pass transition width in Hz
        transition_hz: f64,
    },
    /// Rational resampler
    Resample(ResamplerSpec),
    /// GMSK demodulator
    Demodulate(GmskDemodulatorConfig),
    /// Differential decoder
    DiffDecode,
    /// Access code correlator
    Correlate(CorrelatorSpec),
    /// Bit sink
    Sink(SinkSpec),
}

impl StageSpec {
    /// Stage name, used for thread names and error reports.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::DcBlock { .. } => "dc-block".into(),
            Self::ChannelSelect { .. } => "channel-select".into(),
            Self::Resample(_) => "resample".into(),
            Self::Demodulate(_) => "demod".into(),
            Self::DiffDecode => "diff-decode".into(),
            Self::Correlate(spec) => format!("correlate-{}", spec.pattern_id),
            Self::Sink(_) => "sink".into(),
        }
    }

    /// Stream kind accepted.
    #[must_use]
    pub fn input_kind(&self) -> StreamKind {
        match self {
            Self::DcBlock { .. }
            | Self::ChannelSelect { .. }
            | Self::Resample(_)
            | Self::Demodulate(_) => StreamKind::Samples,
            Self::DiffDecode | Self::Correlate(_) | Self::Sink(_) => StreamKind::Bits,
        }
    }

    /// Stream kind produced.
    #[must_use]
    pub fn output_kind(&self) -> StreamKind {
        match self {
            Self::DcBlock { .. } | Self::ChannelSelect { .. } | Self::Resample(_) => {
                StreamKind::Samples
            }
            Self::Demodulate(_) | Self::DiffDecode | Self::Correlate(_) | Self::Sink(_) => {
                StreamKind::Bits
            }
        }
    }

    /// Where observers see this stage's output.
    #[must_use]
    pub fn tap_point(&self) -> TapPoint {
        match self {
            Self::DcBlock { .. } => TapPoint::PostDcBlock,
            Self::ChannelSelect { .. } => TapPoint::PostMixer,
            Self::Resample(_) => TapPoint::PostResampler,
            Self::Demodulate(_) => TapPoint::PostDemod,
            Self::DiffDecode => TapPoint::PostDifferential,
            Self::Correlate(spec) => TapPoint::Correlated(spec.pattern_id),
            Self::Sink(_) => TapPoint::Tagged,
        }
    }

    /// Output sample rate for a given input rate.
    #[must_use]
    pub fn output_rate(&self, input_rate: f64) -> f64 {
        match self {
            Self::ChannelSelect { decimation, .. } => input_rate / (*decimation).max(1) as f64,
            Self::Resample(spec) => {
                input_rate * spec.interpolation as f64 / spec.decimation.max(1) as f64
            }
            Self::Demodulate(config) => input_rate / f64::from(config.samples_per_symbol),
            _ => input_rate,
        }
    }

    /// Build the stage for a stream at `input_rate`.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] for invalid parameters or unopenable sinks.
    pub fn instantiate(&self, input_rate: f64) -> Result<Box<dyn Stage>, ConfigError> {
        let stage: Box<dyn Stage> = match self {
            Self::DcBlock { alpha } => Box::new(DcBlockStage {
                blocker: DcBlockerIq::new(*alpha),
            }),
            Self::ChannelSelect {
                offset_hz,
                decimation,
                cutoff_hz,
                transition_hz,
            } => {
                let xlating = FreqXlatingFir::with_low_pass(
                    input_rate,
                    *offset_hz,
                    *decimation,
                    *cutoff_hz,
                    *transition_hz,
                )?;
                log::debug!(
                    "channel filter: {} taps, cutoff {} Hz, offset {} Hz, decimation {}",
                    xlating.num_taps(),
                    cutoff_hz,
                    offset_hz,
                    decimation
                );
                Box::new(ChannelSelectStage { xlating })
            }
            Self::Resample(spec) => {
                let resampler = RationalResampler::with_fractional_bw(
                    spec.interpolation,
                    spec.decimation,
                    spec.fractional_bw,
                )?;
                log::debug!(
                    "resampler {}/{}: {} taps per branch",
                    resampler.interpolation(),
                    resampler.decimation(),
                    resampler.taps_per_branch()
                );
                Box::new(ResampleStage { resampler })
            }
            Self::Demodulate(config) => Box::new(DemodStage {
                demod: GmskDemodulator::new(config.clone())?,
                next_bit: 0,
            }),
            Self::DiffDecode => Box::new(DiffDecodeStage {
                decoder: DifferentialDecoder::new(),
            }),
            Self::Correlate(spec) => Box::new(CorrelateStage {
                correlator: AccessCodeCorrelator::new(spec.access_code()?),
            }),
            Self::Sink(spec) => Box::new(SinkStage {
                sink: BitSink::open(spec)?,
            }),
        };
        Ok(stage)
    }
}

fn expect_samples(input: Payload) -> Result<Arc<[IqSample]>, StageError> {
    match input {
        Payload::Samples(samples) => Ok(samples),
        other => Err(StageError::UnexpectedPayload {
            expected: StreamKind::Samples.as_str(),
            found: other.kind().as_str(),
        }),
    }
}

fn expect_bits(input: Payload) -> Result<TaggedBits, StageError> {
    match input {
        Payload::Bits(bits) => Ok(bits),
        other => Err(StageError::UnexpectedPayload {
            expected: StreamKind::Bits.as_str(),
            found: other.kind().as_str(),
        }),
    }
}

struct DcBlockStage {
    blocker: DcBlockerIq,
}

impl Stage for DcBlockStage {
    fn process(&mut self, input: Payload) -> Result<Payload, StageError> {
        let samples = expect_samples(input)?;
        let out: Vec<IqSample> = samples.iter().map(|&s| self.blocker.process(s)).collect();
        Ok(Payload::Samples(out.into()))
    }
}

struct ChannelSelectStage {
    xlating: FreqXlatingFir,
}

impl Stage for ChannelSelectStage {
    fn process(&mut self, input: Payload) -> Result<Payload, StageError> {
        let samples = expect_samples(input)?;
        let mut out = Vec::with_capacity(samples.len());
        self.xlating.process(&samples, &mut out);
        Ok(Payload::Samples(out.into()))
    }
}

struct ResampleStage {
    resampler: RationalResampler,
}

impl Stage for ResampleStage {
    fn process(&mut self, input: Payload) -> Result<Payload, StageError> {
        let samples = expect_samples(input)?;
        let mut out = Vec::with_capacity(samples.len());
        self.resampler.process(&samples, &mut out);
        Ok(Payload::Samples(out.into()))
    }
}

struct DemodStage {
    demod: GmskDemodulator,
    next_bit: u64,
}

impl Stage for DemodStage {
    fn process(&mut self, input: Payload) -> Result<Payload, StageError> {
        let samples = expect_samples(input)?;
        let mut bits = Vec::with_capacity(samples.len() / 2 + 1);
        self.demod.process(&samples, &mut bits);

        let offset = self.next_bit;
        self.next_bit += bits.len() as u64;
        Ok(Payload::Bits(TaggedBits {
            offset,
            bits,
            tags: Vec::new(),
        }))
    }

    fn finish(&mut self) -> Result<Option<Payload>, StageError> {
        let metrics = self.demod.metrics();
        log::debug!(
            "demod finished after {} bits: power {:.1} dB, omega {:.4}, mu {:.3}",
            self.next_bit,
            metrics.power_db(),
            metrics.omega,
            metrics.mu
        );
        Ok(None)
    }
}

struct DiffDecodeStage {
    decoder: DifferentialDecoder,
}

impl Stage for DiffDecodeStage {
    fn process(&mut self, input: Payload) -> Result<Payload, StageError> {
        let mut chunk = expect_bits(input)?;
        for bit in &mut chunk.bits {
            *bit = self.decoder.process(*bit);
        }
        Ok(Payload::Bits(chunk))
    }
}

struct CorrelateStage {
    correlator: AccessCodeCorrelator,
}

impl Stage for CorrelateStage {
    fn process(&mut self, input: Payload) -> Result<Payload, StageError> {
        let mut chunk = expect_bits(input)?;
        let before = chunk.tags.len();
        self.correlator.process(&chunk.bits, &mut chunk.tags);
        if chunk.tags.len() > before {
            chunk.tags.sort_by_key(|t| t.bit_offset);
        }
        Ok(Payload::Bits(chunk))
    }
}

struct SinkStage {
    sink: BitSink,
}

impl Stage for SinkStage {
    fn process(&mut self, input: Payload) -> Result<Payload, StageError> {
        let chunk = expect_bits(input)?;
        self.sink.write(&chunk.bits)?;
        Ok(Payload::Bits(chunk))
    }

    fn finish(&mut self) -> Result<Option<Payload>, StageError> {
        self.sink.flush()?;
        log::debug!("sink closed after {} bits", self.sink.written());
        Ok(None)
    }
}
