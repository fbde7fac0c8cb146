//! Dual-channel AIS receiver
//!
//! Streams complex baseband from a [`SampleSource`] through two identical
//! channel chains (channel selector, rate converter, GMSK demodulator,
//! differential decoder, two access code correlators, bit sink), each
//! stage on its own thread.
//!
//! # Modules
//!
//! - [`config`] - Defaults and the runtime configuration surface
//! - [`pipeline`] - Pipeline builder and threaded runner
//! - [`stage`] - Stage descriptions and implementations
//! - [`source`] - Capture replay and in-memory sources
//! - [`sink`] - Multi-output bit sink
//! - [`observer`] - Taps on intermediate streams
//! - [`shutdown`] - Process-wide stop signal
//! - [`synth`] - Synthetic AIS captures
//! - [`error`] - Error types

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod observer;
pub mod pipeline;
pub mod shutdown;
pub mod sink;
pub mod source;
pub mod stage;
pub mod synth;

pub use config::{ChannelSpec, CorrelatorSpec, ReceiverConfig, ResamplerSpec};
pub use error::{ConfigError, PipelineError, SourceError, StageError};
pub use observer::{LogObserver, MemoryObserver, StreamObserver, TapPoint};
pub use pipeline::{ChannelReport, Pipeline, PipelineBuilder, RunReport};
pub use shutdown::StopSignal;
pub use sink::{BitSink, SharedBits, SinkOutput, SinkSpec, SinkTarget};
pub use source::{FileSource, SampleFormat, SampleSource, ThrottledSource, VecSource};
pub use stage::{Payload, Stage, StageSpec, StreamKind, TaggedBits};
pub use synth::{synthesize, SynthConfig, SyntheticCapture};
