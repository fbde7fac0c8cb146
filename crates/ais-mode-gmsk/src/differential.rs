//! Differential bit coding.
//!
//! A decoded bit is 1 when the demodulated bit changed from the previous
//! one. The encoder is the exact inverse, used when synthesising bursts.

use alloc::vec::Vec;

/// Differential decoder (modulus 2).
///
/// `out[n] = in[n] XOR in[n-1]`, with the bit before the first input taken
/// as 0. Bits are 0/1 bytes; only the low bit of each input is used.
#[derive(Clone, Debug, Default)]
pub struct DifferentialDecoder {
    prev: u8,
}

impl DifferentialDecoder {
    /// Create a decoder with a zero history bit.
    #[must_use]
    pub const fn new() -> Self {
        Self { prev: 0 }
    }

    /// Decode a single bit.
    #[inline]
    pub fn process(&mut self, bit: u8) -> u8 {
        let bit = bit & 1;
        let out = bit ^ self.prev;
        self.prev = bit;
        out
    }

    /// Decode a chunk, appending one output bit per input bit.
    pub fn process_block(&mut self, input: &[u8], output: &mut Vec<u8>) {
        output.extend(input.iter().map(|&b| self.process(b)));
    }
}

/// Differential encoder, the inverse of [`DifferentialDecoder`].
#[derive(Clone, Debug, Default)]
pub struct DifferentialEncoder {
    prev: u8,
}

impl DifferentialEncoder {
    /// Create an encoder with a zero history bit.
    #[must_use]
    pub const fn new() -> Self {
        Self { prev: 0 }
    }

    /// Encode a single bit.
    #[inline]
    pub fn process(&mut self, bit: u8) -> u8 {
        self.prev ^= bit & 1;
        self.prev
    }

    /// Encode a chunk, appending one output bit per input bit.
    pub fn process_block(&mut self, input: &[u8], output: &mut Vec<u8>) {
        output.extend(input.iter().map(|&b| self.process(b)));
    }
}
