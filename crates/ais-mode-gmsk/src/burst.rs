//! AIS burst assembly for synthetic signals.
//!
//! Builds the logical bit sequence of one burst:
//! ramp-up, training sequence, start flag, bit-stuffed payload, end flag
//! and a short tail. Offsets of the interesting positions are returned
//! with the bits so tests can predict where tags land.

use crate::access_code::AIS_START_FLAG;
use alloc::vec::Vec;

/// Length of the alternating training sequence.
const TRAINING_BITS: usize = 24;

/// HDLC flag.
const FLAG: [u8; 8] = [0, 1, 1, 1, 1, 1, 1, 0];

/// A logical burst and the offsets of its frame boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AisBurst {
    /// Logical (pre-differential-coding) bits
    pub bits: Vec<u8>,
    /// Index of the first bit after the start flag
    pub data_start: usize,
    /// Index of the first bit after the end flag
    pub frame_end: usize,
}

/// Builder for synthetic AIS bursts.
#[derive(Clone, Debug)]
pub struct AisBurstBuilder {
    ramp_bits: usize,
    tail_bits: usize,
    confirm_pattern: bool,
}

impl Default for AisBurstBuilder {
    fn default() -> Self {
        Self {
            ramp_bits: 8,
            tail_bits: 8,
            confirm_pattern: false,
        }
    }
}

impl AisBurstBuilder {
    /// Builder with an 8-bit ramp-up and 8-bit tail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ramp-up length. Rounded up to an even count so the training
    /// sequence keeps its phase.
    #[must_use]
    pub fn ramp_bits(mut self, bits: usize) -> Self {
        self.ramp_bits = bits + bits % 2;
        self
    }

    /// Set the number of alternating bits after the end flag.
    #[must_use]
    pub fn tail_bits(mut self, bits: usize) -> Self {
        self.tail_bits = bits;
        self
    }

    /// Close the data with the leading bits of [`AIS_START_FLAG`] so that,
    /// together with the end flag, the second-stage pattern ends exactly at
    /// `frame_end`.
    #[must_use]
    pub fn confirm_pattern(mut self, enabled: bool) -> Self {
        self.confirm_pattern = enabled;
        self
    }

    /// Assemble a burst around `payload` (0/1 bytes, before stuffing).
    #[must_use]
    pub fn build(&self, payload: &[u8]) -> AisBurst {
        let stuffed = stuff_bits(payload);
        let mut bits = Vec::with_capacity(
            self.ramp_bits + TRAINING_BITS + 2 * FLAG.len() + stuffed.len() + self.tail_bits + 32,
        );

        bits.extend(alternating(self.ramp_bits + TRAINING_BITS));
        bits.extend_from_slice(&FLAG);
        let data_start = bits.len();

        bits.extend_from_slice(&stuffed);
        if self.confirm_pattern {
            // Separator keeps the pattern clear of any run of ones in the data
            bits.push(0);
            let head = AIS_START_FLAG.len() - FLAG.len();
            bits.extend(AIS_START_FLAG.bytes().take(head).map(|c| c - b'0'));
        }
        bits.extend_from_slice(&FLAG);
        let frame_end = bits.len();

        bits.extend(alternating(self.tail_bits));

        AisBurst {
            bits,
            data_start,
            frame_end,
        }
    }
}

/// HDLC bit stuffing: a 0 is inserted after every run of five 1s.
#[must_use]
pub fn stuff_bits(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + payload.len() / 5);
    let mut ones = 0;
    for &bit in payload {
        let bit = bit & 1;
        out.push(bit);
        if bit == 1 {
            ones += 1;
            if ones == 5 {
                out.push(0);
                ones = 0;
            }
        } else {
            ones = 0;
        }
    }
    out
}

fn alternating(len: usize) -> impl Iterator<Item = u8> {
    (0..len).map(|n| (n % 2) as u8)
}
