//! `ais-rx`: dual-channel AIS receiver

use ais_receiver::config::{
    ReceiverConfig, AIS_CHANNEL_OFFSET_HZ, DEFAULT_CENTER_FREQ_HZ, DEFAULT_CHUNK_SIZE,
    DEFAULT_QUEUE_DEPTH, DEFAULT_SAMPLE_RATE,
};
use ais_receiver::source::write_cf32;
use ais_receiver::{
    synthesize, FileSource, LogObserver, PipelineBuilder, SampleFormat, StopSignal, SynthConfig,
    ThrottledSource,
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

/// Dual-channel AIS GMSK receiver
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Demodulate a recorded capture into tagged bit files
    Run(RunArgs),
    /// Write a capture of synthetic AIS bursts
    Synth(SynthArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Capture file to replay
    #[arg(short, long)]
    input: PathBuf,

    /// Sample format; guessed from the file extension when omitted
    #[arg(short, long, value_enum)]
    format: Option<SampleFormat>,

    /// Input sample rate in Hz
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: f64,

    /// Tuned centre frequency in Hz
    #[arg(long, default_value_t = DEFAULT_CENTER_FREQ_HZ)]
    center_freq: f64,

    /// Channel A offset from the centre in Hz
    #[arg(long, default_value_t = -AIS_CHANNEL_OFFSET_HZ, allow_hyphen_values = true)]
    offset_a: f64,

    /// Channel B offset from the centre in Hz
    #[arg(long, default_value_t = AIS_CHANNEL_OFFSET_HZ, allow_hyphen_values = true)]
    offset_b: f64,

    /// Channel selector decimation
    #[arg(long, default_value_t = 1)]
    decimation: usize,

    /// Resampler interpolation
    #[arg(long, default_value_t = 1)]
    interpolation: usize,

    /// Resampler decimation
    #[arg(long, default_value_t = 1)]
    resample_decimation: usize,

    /// Samples per symbol at the demodulator
    #[arg(long, default_value_t = 2.0)]
    sps: f32,

    /// Timing loop gain
    #[arg(long, default_value_t = 0.175)]
    gain_mu: f32,

    /// Initial timing phase
    #[arg(long, default_value_t = 0.5)]
    mu: f32,

    /// Maximum relative symbol rate deviation
    #[arg(long, default_value_t = 0.005)]
    omega_limit: f32,

    /// Initial relative symbol clock error
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    freq_error: f32,

    /// Tolerated bit errors in both correlators
    #[arg(long, default_value_t = 0)]
    max_bit_errors: u32,

    /// Directory for the bit files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Write only the primary bit file per channel
    #[arg(long)]
    no_debug_sink: bool,

    /// Remove DC before mixing
    #[arg(long)]
    dc_block: bool,

    /// Replay at the nominal sample rate instead of as fast as possible
    #[arg(long)]
    throttle: bool,

    /// Drop chunks for a channel that falls behind instead of blocking
    #[arg(long)]
    lossy: bool,

    /// Queue depth between stages, in chunks
    #[arg(long, default_value_t = DEFAULT_QUEUE_DEPTH)]
    queue_depth: usize,

    /// Samples per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
}

#[derive(Args, Debug)]
struct SynthArgs {
    /// Output cf32 file
    #[arg(short, long)]
    output: PathBuf,

    /// Number of bursts
    #[arg(long, default_value_t = 4)]
    bursts: usize,

    /// Sample rate in Hz
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: f64,

    /// Samples per symbol
    #[arg(long, default_value_t = 2)]
    sps: usize,

    /// Burst offset from the centre in Hz
    #[arg(long, default_value_t = -AIS_CHANNEL_OFFSET_HZ, allow_hyphen_values = true)]
    offset: f64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args),
        Command::Synth(args) => synth(args),
    }
}

fn receiver_config(args: &RunArgs) -> ReceiverConfig {
    let mut config =
        ReceiverConfig::with_output_dir(&args.output_dir).with_sample_rate(args.sample_rate);
    config.center_freq_hz = args.center_freq;
    config.queue_depth = args.queue_depth;
    config.chunk_size = args.chunk_size;
    config.lossy = args.lossy;

    for channel in &mut config.channels {
        channel.offset_hz = if channel.name == "A" {
            args.offset_a
        } else {
            args.offset_b
        };
        channel.decimation = args.decimation;
        channel.dc_block = args.dc_block;
        channel.resampler.interpolation = args.interpolation;
        channel.resampler.decimation = args.resample_decimation;
        channel.demod.samples_per_symbol = args.sps;
        channel.demod.gain_mu = args.gain_mu;
        channel.demod.mu = args.mu;
        channel.demod.omega_relative_limit = args.omega_limit;
        channel.demod.freq_error = args.freq_error;
        for correlator in &mut channel.correlators {
            correlator.max_bit_errors = args.max_bit_errors;
        }
        if args.no_debug_sink {
            channel.sink = std::mem::take(&mut channel.sink).without("debug");
        }
    }
    config
}

fn run(args: RunArgs) -> Result<()> {
    let format = match args.format.or_else(|| SampleFormat::from_path(&args.input)) {
        Some(format) => format,
        None => bail!(
            "cannot tell the sample format of {}; pass --format",
            args.input.display()
        ),
    };

    let config = receiver_config(&args);
    let pipeline = PipelineBuilder::from_config(&config)
        .context("invalid receiver configuration")?
        .observer(Arc::new(LogObserver))
        .build()
        .context("failed to build pipeline")?;

    let stop = StopSignal::new();
    stop.install_ctrlc_handler()
        .context("failed to install Ctrl-C handler")?;

    let source = FileSource::open(&args.input, format, args.sample_rate)
        .with_context(|| format!("failed to open {}", args.input.display()))?;

    let report = if args.throttle {
        pipeline.run(ThrottledSource::new(source), &stop)
    } else {
        pipeline.run(source, &stop)
    }
    .context("receiver stopped with an error")?;

    for channel in &report.channels {
        println!(
            "{}: {} samples, {} bits, {} frame tags",
            channel.name, channel.samples_in, channel.bits_out, channel.tags
        );
    }
    Ok(())
}

fn synth(args: SynthArgs) -> Result<()> {
    let config = SynthConfig {
        sample_rate: args.sample_rate,
        samples_per_symbol: args.sps,
        offset_hz: args.offset,
        bursts: args.bursts,
        ..SynthConfig::default()
    };
    let capture = synthesize(&config).context("invalid synthesis parameters")?;

    let file = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    write_cf32(file, &capture.samples)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    log::info!(
        "wrote {} bursts ({} samples) to {}",
        capture.bursts.len(),
        capture.samples.len(),
        args.output.display()
    );
    Ok(())
}
