//! Threaded dual-channel pipeline
//!
//! A [`PipelineBuilder`] holds an ordered stage list per channel. `build`
//! type-checks each list and instantiates the stages; [`Pipeline::run`]
//! then starts one thread per stage, joined by bounded `crossbeam`
//! channels, and reads the source on the calling thread. Every chunk read
//! is shared read-only with all channel chains.
//!
//! ```text
//! source ──┬─> [A: select] -> [resample] -> [demod] -> [diff] -> [corr 1] -> [corr 2] -> [sink]
//!          └─> [B: select] -> [resample] -> [demod] -> [diff] -> [corr 1] -> [corr 2] -> [sink]
//! ```

use crate::config::{ReceiverConfig, AIS_SYMBOL_RATE, DEFAULT_CHUNK_SIZE, DEFAULT_QUEUE_DEPTH};
use crate::error::{ConfigError, PipelineError, StageError};
use crate::observer::{StreamObserver, TapPoint};
use crate::shutdown::StopSignal;
use crate::source::SampleSource;
use crate::stage::{Payload, Stage, StageSpec, StreamKind};
use ais_dsp_core::IqSample;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Relative sample rate difference tolerated between source and pipeline.
const RATE_TOLERANCE: f64 = 1e-6;

/// Counters for one channel chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelReport {
    /// Channel name
    pub name: String,
    /// Samples accepted by the first stage
    pub samples_in: u64,
    /// Bits delivered to the sink
    pub bits_out: u64,
    /// Frame tags delivered to the sink
    pub tags: u64,
    /// Chunks dropped because the chain fell behind (lossy mode only)
    pub dropped_chunks: u64,
}

/// Summary of a completed run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Samples read from the source
    pub samples_read: u64,
    /// Per-channel counters, in channel order
    pub channels: Vec<ChannelReport>,
}

impl RunReport {
    /// Counters for a channel by name.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&ChannelReport> {
        self.channels.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} samples read", self.samples_read)?;
        for c in &self.channels {
            write!(
                f,
                "; {}: {} samples in, {} bits out, {} tags",
                c.name, c.samples_in, c.bits_out, c.tags
            )?;
            if c.dropped_chunks > 0 {
                write!(f, ", {} chunks dropped", c.dropped_chunks)?;
            }
        }
        Ok(())
    }
}

/// Describes a pipeline before any stage exists.
pub struct PipelineBuilder {
    sample_rate: f64,
    queue_depth: usize,
    chunk_size: usize,
    lossy: bool,
    channels: Vec<(String, Vec<StageSpec>)>,
    observers: Vec<Arc<dyn StreamObserver>>,
}

impl PipelineBuilder {
    /// Empty pipeline for a source at `sample_rate`.
    #[must_use]
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            chunk_size: DEFAULT_CHUNK_SIZE,
            lossy: false,
            channels: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Builder for a validated receiver configuration.
    ///
    /// # Errors
    /// Returns the first problem reported by [`ReceiverConfig::validate`].
    pub fn from_config(config: &ReceiverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut builder = Self::new(config.sample_rate)
            .queue_depth(config.queue_depth)
            .chunk_size(config.chunk_size)
            .lossy(config.lossy);
        for channel in &config.channels {
            log::info!(
                "channel {}: {:.3} MHz (offset {:+} Hz), {} baud",
                channel.name,
                channel.frequency_hz(config.center_freq_hz) / 1e6,
                channel.offset_hz,
                channel.symbol_rate(config.sample_rate)
            );
            builder = builder.channel(&channel.name, channel.stages(config.sample_rate));
        }
        Ok(builder)
    }

    /// Queue capacity between stages, in chunks.
    #[must_use]
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    /// Samples pulled from the source per chunk.
    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Drop chunks for a channel that is not keeping up instead of blocking
    /// the reader.
    #[must_use]
    pub fn lossy(mut self, lossy: bool) -> Self {
        self.lossy = lossy;
        self
    }

    /// Append a channel chain.
    #[must_use]
    pub fn channel(mut self, name: &str, stages: Vec<StageSpec>) -> Self {
        self.channels.push((name.to_string(), stages));
        self
    }

    /// Attach an observer to every channel.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Stage lists, in channel order.
    pub fn specs(&self) -> impl Iterator<Item = (&str, &[StageSpec])> {
        self.channels
            .iter()
            .map(|(name, stages)| (name.as_str(), stages.as_slice()))
    }

    /// Type-check every chain and instantiate its stages.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] for mismatched stage kinds, chains without
    /// a sink, invalid stage parameters or unopenable sink files.
    pub fn build(self) -> Result<Pipeline, ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ais_dsp_core::DspError::InvalidSampleRate(self.sample_rate).into());
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

        for (name, stages) in &self.channels {
            check_order(name, stages)?;
        }

        let mut chains = Vec::with_capacity(self.channels.len());
        for (name, specs) in &self.channels {
            let mut rate = self.sample_rate;
            let mut stages = Vec::with_capacity(specs.len());
            for spec in specs {
                if let StageSpec::Demodulate(config) = spec {
                    let baud = rate / f64::from(config.samples_per_symbol);
                    if (baud - AIS_SYMBOL_RATE).abs() > 0.01 * AIS_SYMBOL_RATE {
                        log::warn!(
                            "channel {}: demodulator runs at {} baud, AIS uses {}",
                            name,
                            baud,
                            AIS_SYMBOL_RATE
                        );
                    }
                }
                stages.push(ChainStage {
                    name: spec.name(),
                    tap: spec.tap_point(),
                    stage: spec.instantiate(rate)?,
                });
                rate = spec.output_rate(rate);
            }
            chains.push(Chain {
                name: Arc::from(name.as_str()),
                stages,
            });
        }

        Ok(Pipeline {
            sample_rate: self.sample_rate,
            queue_depth: self.queue_depth,
            chunk_size: self.chunk_size,
            lossy: self.lossy,
            chains,
            observers: self.observers.into(),
        })
    }
}

fn check_order(channel: &str, stages: &[StageSpec]) -> Result<(), ConfigError> {
    let mut kind = StreamKind::Samples;
    for (index, spec) in stages.iter().enumerate() {
        if spec.input_kind() != kind {
            return Err(ConfigError::StageOrder {
                channel: channel.to_string(),
                index,
                stage: spec.name(),
                expected: spec.input_kind().as_str(),
                found: kind.as_str(),
            });
        }
        if matches!(spec, StageSpec::Sink(_)) && index + 1 != stages.len() {
            return Err(ConfigError::StageOrder {
                channel: channel.to_string(),
                index: index + 1,
                stage: stages[index + 1].name(),
                expected: "nothing",
                found: "sink",
            });
        }
        kind = spec.output_kind();
    }
    match stages.last() {
        Some(StageSpec::Sink(_)) => Ok(()),
        _ => Err(ConfigError::MissingSink(channel.to_string())),
    }
}

struct ChainStage {
    name: String,
    tap: TapPoint,
    stage: Box<dyn Stage>,
}

struct Chain {
    name: Arc<str>,
    stages: Vec<ChainStage>,
}

/// Per-stage counters returned by a stage thread.
#[derive(Clone, Copy, Debug, Default)]
struct StageStats {
    items_in: u64,
    tags_in: u64,
}

/// A built pipeline, ready to run once.
pub struct Pipeline {
    sample_rate: f64,
    queue_depth: usize,
    chunk_size: usize,
    lossy: bool,
    chains: Vec<Chain>,
    observers: Arc<[Arc<dyn StreamObserver>]>,
}

impl Pipeline {
    /// Sample rate the pipeline was built for.
    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Channel names, in order.
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.chains.iter().map(|c| &*c.name)
    }

    /// Stream `source` through every channel until it ends or `stop` is
    /// set, then drain, flush and close all stages.
    ///
    /// # Errors
    /// Returns the first stage failure (with channel and stage name), a
    /// source failure, or a configuration error if the source rate does not
    /// match.
    pub fn run<S: SampleSource>(
        self,
        mut source: S,
        stop: &StopSignal,
    ) -> Result<RunReport, PipelineError> {
        let source_rate = source.sample_rate();
        if ((source_rate - self.sample_rate) / self.sample_rate).abs() > RATE_TOLERANCE {
            return Err(ConfigError::SampleRateMismatch {
                source_rate,
                configured: self.sample_rate,
            }
            .into());
        }

        let mut inputs: Vec<Option<Sender<Payload>>> = Vec::with_capacity(self.chains.len());
        let mut threads: Vec<Vec<(String, JoinHandle<Result<StageStats, StageError>>)>> =
            Vec::with_capacity(self.chains.len());
        let mut names = Vec::with_capacity(self.chains.len());

        for chain in self.chains {
            let (tx, rx) = channel::bounded(self.queue_depth);
            inputs.push(Some(tx));
            names.push(chain.name.clone());
            threads.push(spawn_chain(chain, rx, self.queue_depth, &self.observers)?);
        }

        let mut dropped = vec![0u64; inputs.len()];
        let mut samples_read = 0u64;
        let mut buf: Vec<IqSample> = Vec::with_capacity(self.chunk_size);
        let mut source_result = Ok(());

        while !stop.is_stopped() {
            buf.clear();
            match source.read_chunk(self.chunk_size, &mut buf) {
                Ok(0) => {
                    log::info!("end of stream after {} samples", samples_read);
                    break;
                }
                Ok(n) => samples_read += n as u64,
                Err(e) => {
                    log::warn!("source failed after {} samples: {}", samples_read, e);
                    source_result = Err(e);
                    break;
                }
            }

            let chunk: Arc<[IqSample]> = Arc::from(buf.as_slice());
            for (index, slot) in inputs.iter_mut().enumerate() {
                let Some(tx) = slot else { continue };
                let payload = Payload::Samples(Arc::clone(&chunk));
                let closed = if self.lossy {
                    match tx.try_send(payload) {
                        Ok(()) => false,
                        Err(TrySendError::Full(_)) => {
                            dropped[index] += 1;
                            log::warn!(
                                "[{}] overrun, dropped chunk ({} total)",
                                names[index],
                                dropped[index]
                            );
                            false
                        }
                        Err(TrySendError::Disconnected(_)) => true,
                    }
                } else {
                    tx.send(payload).is_err()
                };
                if closed {
                    log::warn!("[{}] chain stopped, no longer fed", names[index]);
                    *slot = None;
                }
            }
            if inputs.iter().all(Option::is_none) {
                break;
            }
        }
        if stop.is_stopped() {
            log::info!("stopping after {} samples", samples_read);
        }

        // Closing the inputs lets every stage drain, flush and exit
        drop(inputs);

        let mut report = RunReport {
            samples_read,
            channels: Vec::with_capacity(threads.len()),
        };
        let mut first_error = None;

        for ((name, handles), dropped_chunks) in names.iter().zip(threads).zip(dropped) {
            let mut channel = ChannelReport {
                name: name.to_string(),
                dropped_chunks,
                ..ChannelReport::default()
            };
            let last = handles.len().saturating_sub(1);
            for (index, (stage, handle)) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(stats)) => {
                        if index == 0 {
                            channel.samples_in = stats.items_in;
                        }
                        if index == last {
                            channel.bits_out = stats.items_in;
                            channel.tags = stats.tags_in;
                        }
                    }
                    Ok(Err(source)) => {
                        first_error.get_or_insert(PipelineError::Stage {
                            channel: name.to_string(),
                            stage,
                            source,
                        });
                    }
                    Err(_) => {
                        log::error!("[{}] stage {} panicked", name, stage);
                        first_error.get_or_insert(PipelineError::ThreadPanicked {
                            channel: name.to_string(),
                            stage,
                        });
                    }
                }
            }
            report.channels.push(channel);
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        source_result?;
        log::info!("run complete: {}", report);
        Ok(report)
    }
}

type StageHandle = (String, JoinHandle<Result<StageStats, StageError>>);

fn spawn_chain(
    chain: Chain,
    input: Receiver<Payload>,
    queue_depth: usize,
    observers: &Arc<[Arc<dyn StreamObserver>]>,
) -> Result<Vec<StageHandle>, PipelineError> {
    let count = chain.stages.len();
    let mut handles = Vec::with_capacity(count);
    let mut rx = input;

    for (index, stage) in chain.stages.into_iter().enumerate() {
        let (tx, next_rx) = if index + 1 < count {
            let (tx, next_rx) = channel::bounded(queue_depth);
            (Some(tx), Some(next_rx))
        } else {
            (None, None)
        };

        let channel = Arc::clone(&chain.name);
        let observers = Arc::clone(observers);
        let stage_name = stage.name.clone();
        let handle = thread::Builder::new()
            .name(format!("ais-{}-{}", chain.name, stage.name))
            .spawn(move || run_stage(&channel, stage, rx, tx, &observers))?;
        handles.push((stage_name, handle));

        match next_rx {
            Some(next) => rx = next,
            None => break,
        }
    }
    Ok(handles)
}

fn run_stage(
    channel: &str,
    mut stage: ChainStage,
    input: Receiver<Payload>,
    output: Option<Sender<Payload>>,
    observers: &[Arc<dyn StreamObserver>],
) -> Result<StageStats, StageError> {
    log::info!("[{}] {} started", channel, stage.name);
    let mut stats = StageStats::default();

    for payload in input.iter() {
        stats.items_in += payload.len() as u64;
        if let Payload::Bits(bits) = &payload {
            stats.tags_in += bits.tags.len() as u64;
        }

        let out = stage.stage.process(payload).map_err(|e| {
            log::error!("[{}] {} failed: {}", channel, stage.name, e);
            e
        })?;
        if !forward(channel, &stage, out, output.as_ref(), observers) {
            log::warn!("[{}] {}: downstream closed", channel, stage.name);
            return Ok(stats);
        }
    }

    let tail = stage.stage.finish().map_err(|e| {
        log::error!("[{}] {} failed to finish: {}", channel, stage.name, e);
        e
    })?;
    if let Some(out) = tail {
        forward(channel, &stage, out, output.as_ref(), observers);
    }

    log::info!("[{}] {} stopped", channel, stage.name);
    Ok(stats)
}

/// Notify observers and pass `out` downstream. Returns false once the
/// downstream stage has gone away.
fn forward(
    channel: &str,
    stage: &ChainStage,
    out: Payload,
    output: Option<&Sender<Payload>>,
    observers: &[Arc<dyn StreamObserver>],
) -> bool {
    for observer in observers {
        match &out {
            Payload::Samples(samples) => observer.on_samples(channel, stage.tap, samples),
            Payload::Bits(bits) => observer.on_bits(channel, stage.tap, bits),
        }
    }
    match output {
        Some(tx) => tx.send(out).is_ok(),
        None => true,
    }
}
