//! Access code correlation.
//!
//! A sliding correlator compares the most recent bits of the stream with a
//! fixed reference pattern at every bit position. Bits are never consumed
//! or altered; a match produces a [`FrameTag`] pointing at the bit right
//! after the matched window.

use crate::error::ModeError;
use alloc::vec::Vec;

/// Longest supported access code, in bits (width of the shift register).
pub const MAX_ACCESS_CODE_BITS: usize = 64;

/// AIS training sequence followed by the HDLC start flag.
pub const AIS_TRAINING: &str = "01010101010101010101010101111110";

/// Second-stage AIS frame flag pattern.
pub const AIS_START_FLAG: &str = "101100010011011101111110";

/// Pattern id reported for [`AIS_TRAINING`] matches.
pub const TRAINING_PATTERN_ID: u8 = 1;

/// Pattern id reported for [`AIS_START_FLAG`] matches.
pub const START_FLAG_PATTERN_ID: u8 = 2;

/// A reference bit pattern with a bit-error tolerance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessCode {
    bits: heapless::Vec<u8, MAX_ACCESS_CODE_BITS>,
    max_bit_errors: u32,
    pattern_id: u8,
}

impl AccessCode {
    /// Parse a pattern written as a string of '0' and '1'.
    ///
    /// # Arguments
    /// * `pattern` - Pattern bits, oldest first
    /// * `max_bit_errors` - Mismatching bits still accepted as a match
    /// * `pattern_id` - Identifier copied into every tag
    ///
    /// # Errors
    /// Rejects empty or overlong patterns, characters other than '0'/'1'
    /// and tolerances that would match any window.
    pub fn parse(pattern: &str, max_bit_errors: u32, pattern_id: u8) -> Result<Self, ModeError> {
        let mut bits = heapless::Vec::new();
        for c in pattern.chars() {
            let bit = match c {
                '0' => 0,
                '1' => 1,
                other => return Err(ModeError::InvalidAccessCodeChar(other)),
            };
            bits.push(bit)
                .map_err(|_| ModeError::AccessCodeTooLong(pattern.chars().count()))?;
        }
        Self::from_bits(bits, max_bit_errors, pattern_id)
    }

    fn from_bits(
        bits: heapless::Vec<u8, MAX_ACCESS_CODE_BITS>,
        max_bit_errors: u32,
        pattern_id: u8,
    ) -> Result<Self, ModeError> {
        if bits.is_empty() {
            return Err(ModeError::EmptyAccessCode);
        }
        if max_bit_errors as usize >= bits.len() {
            return Err(ModeError::ThresholdTooHigh {
                max_bit_errors,
                len: bits.len(),
            });
        }
        Ok(Self {
            bits,
            max_bit_errors,
            pattern_id,
        })
    }

    /// Stage-one AIS training pattern.
    ///
    /// # Errors
    /// Only if `max_bit_errors` reaches the pattern length.
    pub fn ais_training(max_bit_errors: u32) -> Result<Self, ModeError> {
        Self::parse(AIS_TRAINING, max_bit_errors, TRAINING_PATTERN_ID)
    }

    /// Stage-two AIS flag pattern.
    ///
    /// # Errors
    /// Only if `max_bit_errors` reaches the pattern length.
    pub fn ais_start_flag(max_bit_errors: u32) -> Result<Self, ModeError> {
        Self::parse(AIS_START_FLAG, max_bit_errors, START_FLAG_PATTERN_ID)
    }

    /// Pattern bits, oldest first.
    #[must_use]
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Pattern length in bits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Always false; construction rejects empty patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Tolerated bit errors.
    #[must_use]
    pub fn max_bit_errors(&self) -> u32 {
        self.max_bit_errors
    }

    /// Identifier reported in tags.
    #[must_use]
    pub fn pattern_id(&self) -> u8 {
        self.pattern_id
    }

    /// Pattern packed into the low bits of a word, newest bit in bit 0.
    fn word(&self) -> u64 {
        self.bits
            .iter()
            .fold(0u64, |acc, &b| (acc << 1) | u64::from(b))
    }

    fn mask(&self) -> u64 {
        if self.bits.len() == MAX_ACCESS_CODE_BITS {
            u64::MAX
        } else {
            (1u64 << self.bits.len()) - 1
        }
    }
}

/// Marker attached to a bit stream position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTag {
    /// Absolute index of the bit immediately following the matched window
    pub bit_offset: u64,
    /// Identifier of the matched pattern
    pub pattern_id: u8,
    /// Mismatching bits in the matched window
    pub observed_bit_errors: u32,
}

/// Sliding access code correlator.
#[derive(Clone, Debug)]
pub struct AccessCodeCorrelator {
    code: AccessCode,
    word: u64,
    mask: u64,
    register: u64,
    /// Bits seen since the stream started
    bit_count: u64,
}

impl AccessCodeCorrelator {
    /// Create a correlator for the given pattern.
    #[must_use]
    pub fn new(code: AccessCode) -> Self {
        Self {
            word: code.word(),
            mask: code.mask(),
            code,
            register: 0,
            bit_count: 0,
        }
    }

    /// Pattern this correlator searches for.
    #[must_use]
    pub fn code(&self) -> &AccessCode {
        &self.code
    }

    /// Bits scanned so far.
    #[must_use]
    pub fn bits_processed(&self) -> u64 {
        self.bit_count
    }

    /// Scan one bit. Returns a tag if the window ending at this bit matches.
    #[inline]
    pub fn push(&mut self, bit: u8) -> Option<FrameTag> {
        self.register = (self.register << 1) | u64::from(bit & 1);
        self.bit_count += 1;

        if self.bit_count < self.code.len() as u64 {
            return None;
        }
        let errors = ((self.register ^ self.word) & self.mask).count_ones();
        (errors <= self.code.max_bit_errors).then_some(FrameTag {
            bit_offset: self.bit_count,
            pattern_id: self.code.pattern_id,
            observed_bit_errors: errors,
        })
    }

    /// Scan a chunk of bits, appending any tags found.
    ///
    /// The bits themselves are left to the caller to forward.
    pub fn process(&mut self, bits: &[u8], tags: &mut Vec<FrameTag>) {
        tags.extend(bits.iter().filter_map(|&b| self.push(b)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_bits(pattern: &str) -> Vec<u8> {
        pattern.bytes().map(|c| c - b'0').collect()
    }

    /// Filler that never contains six consecutive ones.
    fn filler(len: usize) -> Vec<u8> {
        (0..len).map(|n| u8::from(n % 3 == 0)).collect()
    }

    fn scan(code: AccessCode, bits: &[u8]) -> Vec<FrameTag> {
        let mut corr = AccessCodeCorrelator::new(code);
        let mut tags = Vec::new();
        corr.process(bits, &mut tags);
        tags
    }

    #[test]
    fn test_parse_rejects_bad_patterns() {
        assert_eq!(AccessCode::parse("", 0, 0), Err(ModeError::EmptyAccessCode));
        assert_eq!(
            AccessCode::parse("01x1", 0, 0),
            Err(ModeError::InvalidAccessCodeChar('x'))
        );
        let long = "0".repeat(65);
        assert_eq!(
            AccessCode::parse(&long, 0, 0),
            Err(ModeError::AccessCodeTooLong(65))
        );
        assert!(matches!(
            AccessCode::parse("0110", 4, 0),
            Err(ModeError::ThresholdTooHigh { .. })
        ));
    }

    #[test]
    fn test_ais_patterns() {
        let training = AccessCode::ais_training(0).unwrap();
        assert_eq!(training.len(), 32);
        assert_eq!(training.pattern_id(), TRAINING_PATTERN_ID);
        let flag = AccessCode::ais_start_flag(0).unwrap();
        assert_eq!(flag.len(), 24);
        assert_eq!(flag.max_bit_errors(), 0);
    }

    #[test]
    fn test_exact_match_tags_following_bit() {
        let p = 57;
        let mut bits = filler(p);
        bits.extend(code_bits(AIS_TRAINING));
        bits.extend(filler(40));

        let tags = scan(AccessCode::ais_training(0).unwrap(), &bits);
        assert_eq!(
            tags,
            vec![FrameTag {
                bit_offset: (p + 32) as u64,
                pattern_id: TRAINING_PATTERN_ID,
                observed_bit_errors: 0,
            }]
        );
    }

    #[test]
    fn test_single_flipped_bit_is_not_a_match() {
        let p = 20;
        let mut bits = filler(p);
        bits.extend(code_bits(AIS_TRAINING));
        bits.extend(filler(40));

        for flip in 0..32 {
            let mut corrupted = bits.clone();
            corrupted[p + flip] ^= 1;
            let tags = scan(AccessCode::ais_training(0).unwrap(), &corrupted);
            assert!(
                tags.iter().all(|t| t.bit_offset != (p + 32) as u64),
                "flip at {} still matched",
                flip
            );
        }
    }

    #[test]
    fn test_tolerance_reports_errors() {
        let p = 10;
        let mut bits = filler(p);
        bits.extend(code_bits(AIS_START_FLAG));
        bits[p + 3] ^= 1;
        bits.extend(filler(10));

        let tags = scan(AccessCode::ais_start_flag(1).unwrap(), &bits);
        let tag = tags
            .iter()
            .find(|t| t.bit_offset == (p + 24) as u64)
            .expect("tolerant match missing");
        assert_eq!(tag.observed_bit_errors, 1);
    }

    #[test]
    fn test_cascade_orders_tags() {
        let p = 33;
        let mut bits = filler(p);
        bits.extend(code_bits(AIS_TRAINING));
        bits.extend(code_bits(AIS_START_FLAG));
        bits.extend(filler(16));

        let stage1 = scan(AccessCode::ais_training(0).unwrap(), &bits);
        let stage2 = scan(AccessCode::ais_start_flag(0).unwrap(), &bits);
        assert_eq!(stage1.len(), 1);
        assert_eq!(stage2.len(), 1);
        assert_eq!(stage1[0].bit_offset, (p + 32) as u64);
        assert_eq!(stage2[0].bit_offset, (p + 32 + 24) as u64);
        assert!(stage2[0].bit_offset > stage1[0].bit_offset);
    }

    #[test]
    fn test_chunk_boundaries_do_not_matter() {
        let mut bits = filler(13);
        bits.extend(code_bits(AIS_TRAINING));
        bits.extend(filler(9));
        bits.extend(code_bits(AIS_TRAINING));

        let expected = scan(AccessCode::ais_training(0).unwrap(), &bits);
        assert_eq!(expected.len(), 2);

        let mut corr = AccessCodeCorrelator::new(AccessCode::ais_training(0).unwrap());
        let mut tags = Vec::new();
        for chunk in bits.chunks(5) {
            corr.process(chunk, &mut tags);
        }
        assert_eq!(tags, expected);
        assert_eq!(corr.bits_processed(), bits.len() as u64);
    }

    #[test]
    fn test_no_match_before_window_fills() {
        // Register starts as zeros; an all-zero pattern must still wait
        let tags = scan(AccessCode::parse("0000", 0, 9).unwrap(), &[0, 0, 0]);
        assert!(tags.is_empty());
        let tags = scan(AccessCode::parse("0000", 0, 9).unwrap(), &[0, 0, 0, 0]);
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_full_width_pattern() {
        let pattern: alloc::string::String =
            (0..64).map(|n| if n % 7 == 0 { '1' } else { '0' }).collect();
        let mut bits = filler(5);
        bits.extend(code_bits(&pattern));
        let tags = scan(AccessCode::parse(&pattern, 0, 3).unwrap(), &bits);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].bit_offset, 69);
    }
}
