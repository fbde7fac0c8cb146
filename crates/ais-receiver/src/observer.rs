//! Stream observers
//!
//! Observers see the intermediate streams of every channel without being
//! part of the pipeline: the stage thread calls them after each processed
//! chunk. A display layer, recorder or logger attaches here.

use crate::stage::TaggedBits;
use ais_dsp_core::IqSample;
use ais_mode_gmsk::FrameTag;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Point in a channel chain where a stream is observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TapPoint {
    /// After the optional DC blocker
    PostDcBlock,
    /// After mixing and channel filtering
    PostMixer,
    /// After rate conversion
    PostResampler,
    /// Raw bit decisions from the demodulator
    PostDemod,
    /// After differential decoding
    PostDifferential,
    /// After a correlator, identified by its pattern id
    Correlated(u8),
    /// The fully tagged stream as handed to the sink
    Tagged,
}

/// Receives intermediate streams from the channel chains.
///
/// Called from stage threads; implementations must be cheap or hand the
/// data off.
pub trait StreamObserver: Send + Sync {
    /// A chunk of complex samples.
    fn on_samples(&self, _channel: &str, _point: TapPoint, _samples: &[IqSample]) {}

    /// A chunk of bits with the tags that fall inside it.
    fn on_bits(&self, _channel: &str, _point: TapPoint, _bits: &TaggedBits) {}
}

/// Observer that records everything it sees.
#[derive(Debug, Default)]
pub struct MemoryObserver {
    samples: Mutex<HashMap<(String, TapPoint), Vec<IqSample>>>,
    bits: Mutex<HashMap<(String, TapPoint), Vec<u8>>>,
    tags: Mutex<HashMap<(String, TapPoint), Vec<FrameTag>>>,
}

impl MemoryObserver {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples recorded for a channel at a tap point.
    #[must_use]
    pub fn samples(&self, channel: &str, point: TapPoint) -> Vec<IqSample> {
        lookup(&self.samples, channel, point)
    }

    /// Bits recorded for a channel at a tap point.
    #[must_use]
    pub fn bits(&self, channel: &str, point: TapPoint) -> Vec<u8> {
        lookup(&self.bits, channel, point)
    }

    /// Tags recorded for a channel at a tap point.
    #[must_use]
    pub fn tags(&self, channel: &str, point: TapPoint) -> Vec<FrameTag> {
        lookup(&self.tags, channel, point)
    }
}

fn lookup<T: Clone>(
    map: &Mutex<HashMap<(String, TapPoint), Vec<T>>>,
    channel: &str,
    point: TapPoint,
) -> Vec<T> {
    map.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&(channel.to_string(), point))
        .cloned()
        .unwrap_or_default()
}

fn append<T: Clone>(
    map: &Mutex<HashMap<(String, TapPoint), Vec<T>>>,
    channel: &str,
    point: TapPoint,
    items: &[T],
) {
    map.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry((channel.to_string(), point))
        .or_default()
        .extend_from_slice(items);
}

impl StreamObserver for MemoryObserver {
    fn on_samples(&self, channel: &str, point: TapPoint, samples: &[IqSample]) {
        append(&self.samples, channel, point, samples);
    }

    fn on_bits(&self, channel: &str, point: TapPoint, bits: &TaggedBits) {
        append(&self.bits, channel, point, &bits.bits);
        append(&self.tags, channel, point, &bits.tags);
    }
}

/// Observer that logs every frame tag reaching the sink.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl StreamObserver for LogObserver {
    fn on_bits(&self, channel: &str, point: TapPoint, bits: &TaggedBits) {
        if point != TapPoint::Tagged {
            return;
        }
        log::debug!(
            "[{}] {} bits at offset {}, {} tags",
            channel,
            bits.bits.len(),
            bits.offset,
            bits.tags.len()
        );
        for tag in &bits.tags {
            log::info!(
                "[{}] frame tag: pattern {} at bit {} ({} bit errors)",
                channel,
                tag.pattern_id,
                tag.bit_offset,
                tag.observed_bit_errors
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_observer_keeps_channels_apart() {
        let obs = MemoryObserver::new();
        obs.on_samples("A", TapPoint::PostMixer, &[IqSample::new(1.0, 0.0)]);
        obs.on_samples("B", TapPoint::PostMixer, &[IqSample::new(0.0, 1.0)]);
        obs.on_samples("A", TapPoint::PostMixer, &[IqSample::new(2.0, 0.0)]);

        let a = obs.samples("A", TapPoint::PostMixer);
        assert_eq!(a, vec![IqSample::new(1.0, 0.0), IqSample::new(2.0, 0.0)]);
        assert_eq!(obs.samples("B", TapPoint::PostMixer).len(), 1);
        assert!(obs.samples("A", TapPoint::PostResampler).is_empty());
    }

    #[test]
    fn test_memory_observer_records_bits_and_tags() {
        let obs = MemoryObserver::new();
        let tag = FrameTag {
            bit_offset: 3,
            pattern_id: 1,
            observed_bit_errors: 0,
        };
        obs.on_bits(
            "A",
            TapPoint::Tagged,
            &TaggedBits {
                offset: 0,
                bits: vec![1, 0, 1],
                tags: vec![tag],
            },
        );
        assert_eq!(obs.bits("A", TapPoint::Tagged), vec![1, 0, 1]);
        assert_eq!(obs.tags("A", TapPoint::Tagged), vec![tag]);
        assert!(obs.tags("A", TapPoint::PostDemod).is_empty());
    }
}
