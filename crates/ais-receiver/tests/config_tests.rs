//! Configuration Tests
//!
//! Defaults, validation and the mapping from configuration to stage lists.

use ais_dsp_core::DspError;
use ais_mode_gmsk::{ModeError, START_FLAG_PATTERN_ID, TRAINING_PATTERN_ID};
use ais_receiver::config::{
    AIS_CHANNEL_OFFSET_HZ, DEFAULT_CENTER_FREQ_HZ, DEFAULT_CHUNK_SIZE, DEFAULT_QUEUE_DEPTH,
    DEFAULT_SAMPLE_RATE,
};
use ais_receiver::{
    ChannelSpec, ConfigError, CorrelatorSpec, PipelineBuilder, ReceiverConfig, SharedBits,
    SinkOutput, SinkSpec, StageSpec,
};
use std::path::{Path, PathBuf};

fn memory_config() -> ReceiverConfig {
    let mut config = ReceiverConfig::default();
    for channel in &mut config.channels {
        channel.sink = SinkSpec::new(vec![SinkOutput::memory("primary", SharedBits::new())]);
    }
    config
}

// ============================================================================
// Default Tests
// ============================================================================

#[test]
fn test_default_capture_setup() {
    let config = ReceiverConfig::default();
    assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
    assert_eq!(config.center_freq_hz, DEFAULT_CENTER_FREQ_HZ);
    assert_eq!(config.queue_depth, DEFAULT_QUEUE_DEPTH);
    assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    assert!(!config.lossy);
    assert!(config.validate().is_ok());
}

#[test]
fn test_default_channels_mirror_each_other() {
    let config = ReceiverConfig::default();
    let names: Vec<&str> = config.channels.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["A", "B"]);

    let a = &config.channels[0];
    let b = &config.channels[1];
    assert_eq!(a.offset_hz, -AIS_CHANNEL_OFFSET_HZ);
    assert_eq!(b.offset_hz, AIS_CHANNEL_OFFSET_HZ);
    assert_eq!(a.decimation, b.decimation);
    assert_eq!(a.resampler, b.resampler);
    assert_eq!(a.demod, b.demod);
    assert_eq!(a.correlators, b.correlators);
}

#[test]
fn test_default_correlators() {
    let channel = ChannelSpec::ais("A", 0.0, Path::new("."));
    assert_eq!(
        channel.correlators,
        vec![CorrelatorSpec::ais_training(0), CorrelatorSpec::ais_start_flag(0)]
    );
    assert_eq!(channel.correlators[0].pattern_id, TRAINING_PATTERN_ID);
    assert_eq!(channel.correlators[1].pattern_id, START_FLAG_PATTERN_ID);
    assert_eq!(channel.correlators[0].access_code().unwrap().len(), 32);
    assert_eq!(channel.correlators[1].access_code().unwrap().len(), 24);
}

#[test]
fn test_default_output_files() {
    let config = ReceiverConfig::with_output_dir(Path::new("/data/ais"));
    assert_eq!(
        config.output_files(),
        vec![
            PathBuf::from("/data/ais/bits_A.bin"),
            PathBuf::from("/data/ais/bits_A.debug.bin"),
            PathBuf::from("/data/ais/bits_B.bin"),
            PathBuf::from("/data/ais/bits_B.debug.bin"),
        ]
    );
    assert!(memory_config().output_files().is_empty());
}

#[test]
fn test_with_sample_rate_rederives_filter_band() {
    let config = ReceiverConfig::default().with_sample_rate(96_000.0);
    assert_eq!(config.sample_rate, 96_000.0);
    let (cutoff, transition) = config.channels[0].filter_band(config.sample_rate);
    assert!((cutoff - 38_400.0).abs() < 1e-9);
    assert!((transition - 9_600.0).abs() < 1e-9);
    assert!(config.validate().is_ok());
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_rejects_bad_sample_rate() {
    for rate in [0.0, -1.0, f64::NAN] {
        let config = memory_config().with_sample_rate(rate);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Dsp(DspError::InvalidSampleRate(_)))
        ));
    }
}

#[test]
fn test_rejects_offset_beyond_nyquist() {
    // 25 kHz offsets do not fit a 40 kS/s capture
    let config = memory_config().with_sample_rate(40_000.0);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Dsp(DspError::OffsetAboveNyquist { .. }))
    ));
}

#[test]
fn test_rejects_empty_and_duplicate_channels() {
    let mut config = memory_config();
    config.channels.clear();
    assert!(matches!(config.validate(), Err(ConfigError::NoChannels)));

    let mut config = memory_config();
    config.channels[1].name = "A".into();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::DuplicateChannel(ref name)) if name == "A"
    ));
}

#[test]
fn test_rejects_zero_factors() {
    let mut config = memory_config();
    config.channels[0].decimation = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Dsp(DspError::ZeroDecimation))
    ));

    let mut config = memory_config();
    config.channels[0].resampler.interpolation = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Dsp(DspError::ZeroInterpolation))
    ));

    let mut config = memory_config();
    config.queue_depth = 0;
    assert!(matches!(config.validate(), Err(ConfigError::QueueDepth)));

    let mut config = memory_config();
    config.chunk_size = 0;
    assert!(matches!(config.validate(), Err(ConfigError::ChunkSize)));
}

#[test]
fn test_rejects_bad_filter_band() {
    let mut config = memory_config();
    config.channels[0].cutoff_hz = Some(DEFAULT_SAMPLE_RATE);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Dsp(DspError::InvalidCutoff(_)))
    ));

    let mut config = memory_config();
    config.channels[0].transition_hz = Some(0.0);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Dsp(DspError::InvalidTransition(_)))
    ));
}

#[test]
fn test_rejects_bad_demod_and_patterns() {
    let mut config = memory_config();
    config.channels[0].demod.samples_per_symbol = 1.0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Mode(ModeError::SamplesPerSymbol(_)))
    ));

    let mut config = memory_config();
    config.channels[1].correlators[0].pattern = "01x1".into();
    assert!(matches!(config.validate(), Err(ConfigError::Mode(_))));

    let mut config = memory_config();
    config.channels[1].correlators[1].pattern = String::new();
    assert!(matches!(config.validate(), Err(ConfigError::Mode(_))));
}

#[test]
fn test_rejects_empty_sink() {
    let mut config = memory_config();
    config.channels[0].sink = SinkSpec::default();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::EmptySink(ref name)) if name == "A"
    ));
}

// ============================================================================
// Builder Tests
// ============================================================================

#[test]
fn test_from_config_builds_both_chains() {
    let builder = PipelineBuilder::from_config(&memory_config()).unwrap();
    let specs: Vec<(&str, usize)> = builder.specs().map(|(name, s)| (name, s.len())).collect();
    assert_eq!(specs, [("A", 7), ("B", 7)]);

    let pipeline = builder.build().unwrap();
    assert_eq!(pipeline.sample_rate(), DEFAULT_SAMPLE_RATE);
    assert_eq!(pipeline.channel_names().collect::<Vec<_>>(), ["A", "B"]);
}

#[test]
fn test_from_config_propagates_validation() {
    let mut config = memory_config();
    config.channels.clear();
    assert!(matches!(
        PipelineBuilder::from_config(&config),
        Err(ConfigError::NoChannels)
    ));
}

#[test]
fn test_extra_correlator_extends_chain() {
    let mut config = memory_config();
    config.channels[0]
        .correlators
        .push(CorrelatorSpec {
            pattern: "0111111001111110".into(),
            max_bit_errors: 1,
            pattern_id: 7,
        });
    let stages = config.channels[0].stages(config.sample_rate);
    let names: Vec<String> = stages.iter().map(StageSpec::name).collect();
    assert_eq!(&names[names.len() - 2..], ["correlate-7", "sink"]);
    assert!(PipelineBuilder::from_config(&config).unwrap().build().is_ok());
}

#[test]
fn test_sink_open_failure_fails_build() {
    let mut config = ReceiverConfig::with_output_dir(
        &std::env::temp_dir().join("ais-config-missing").join("nested"),
    );
    config.channels.truncate(1);
    assert!(matches!(
        PipelineBuilder::from_config(&config).unwrap().build(),
        Err(ConfigError::SinkOpen { .. })
    ));
}
