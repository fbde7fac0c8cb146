//! Receiver error types

use ais_dsp_core::DspError;
use ais_mode_gmsk::ModeError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Problems found while checking a configuration or building a pipeline.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid DSP block parameter.
    #[error("dsp: {0}")]
    Dsp(#[from] DspError),

    /// Invalid demodulator or correlator parameter.
    #[error("gmsk: {0}")]
    Mode(#[from] ModeError),

    /// A pipeline needs at least one channel.
    #[error("no channels configured")]
    NoChannels,

    /// Channel names must be unique.
    #[error("duplicate channel name {0:?}")]
    DuplicateChannel(String),

    /// A sink needs at least one output.
    #[error("channel {0:?} has a sink without outputs")]
    EmptySink(String),

    /// Stage input does not match the previous stage's output.
    #[error("channel {channel:?}: stage {index} ({stage}) expects {expected} input, got {found}")]
    StageOrder {
        /// Channel name
        channel: String,
        /// Position in the stage list
        index: usize,
        /// Stage name
        stage: String,
        /// Stream kind the stage accepts
        expected: &'static str,
        /// Stream kind offered by the previous stage
        found: &'static str,
    },

    /// The last stage of a channel must be a sink.
    #[error("channel {0:?} does not end in a sink")]
    MissingSink(String),

    /// Queue depth must be at least one chunk.
    #[error("queue depth must be >= 1")]
    QueueDepth,

    /// Chunk size must be at least one sample.
    #[error("chunk size must be >= 1")]
    ChunkSize,

    /// The source delivers a different rate than the pipeline was built for.
    #[error("source rate {source_rate} Hz does not match configured {configured} Hz")]
    SampleRateMismatch {
        /// Rate reported by the source
        source_rate: f64,
        /// Rate the pipeline was built for
        configured: f64,
    },

    /// A sink output file could not be created.
    #[error("cannot open sink output {path}: {source}")]
    SinkOpen {
        /// Output path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
}

/// Failure inside a running stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// Sink write or flush failed.
    #[error("i/o: {0}")]
    Io(#[from] io::Error),

    /// A stage received a stream kind it cannot handle.
    #[error("unexpected {found} payload, expected {expected}")]
    UnexpectedPayload {
        /// Kind the stage accepts
        expected: &'static str,
        /// Kind received
        found: &'static str,
    },
}

/// Sample source failure.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Reading the capture failed.
    #[error("i/o: {0}")]
    Io(#[from] io::Error),

    /// Sample rate must be finite and positive.
    #[error("invalid source sample rate {0} Hz")]
    InvalidSampleRate(f64),
}

/// Error that ended a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The pipeline could not be set up.
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// A stage failed while streaming.
    #[error("channel {channel} stage {stage} failed: {source}")]
    Stage {
        /// Channel name
        channel: String,
        /// Stage name
        stage: String,
        /// Underlying error
        source: StageError,
    },

    /// The sample source failed.
    #[error("source: {0}")]
    Source(#[from] SourceError),

    /// Thread creation failed.
    #[error("i/o: {0}")]
    Io(#[from] io::Error),

    /// A stage thread panicked.
    #[error("channel {channel} stage {stage} panicked")]
    ThreadPanicked {
        /// Channel name
        channel: String,
        /// Stage name
        stage: String,
    },
}
