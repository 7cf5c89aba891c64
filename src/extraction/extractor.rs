//! Von Neumann pair extraction.

use super::Accumulator;

/// Outcome of the four pair decisions made for one input byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairTally {
    /// Unequal pairs, each contributing one output bit.
    pub kept: u8,
    /// Equal pairs, each contributing one discard bit.
    pub discarded: u8,
}

impl PairTally {
    /// Total decisions; always 4 for a single byte.
    #[inline]
    pub fn total(&self) -> u8 {
        self.kept + self.discarded
    }
}

/// Applies the Von Neumann rule to a byte stream.
///
/// Each byte is split into four 2-bit windows, most significant first:
///
/// - `01` emits output bit `0`
/// - `10` emits output bit `1`
/// - `00` / `11` emit the pair's leading bit to the discard accumulator
///
/// Completed bytes are appended to caller-owned buffers, so the same
/// extractor serves both the plain and the Kaminsky stage.
#[derive(Debug, Default)]
pub struct BitExtractor {
    output: Accumulator,
    discard: Accumulator,
    output_bits: u64,
    discard_bits: u64,
}

impl BitExtractor {
    /// Creates an extractor with empty accumulators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes one input byte.
    ///
    /// Discard bits are always accumulated; completed discard bytes are
    /// only stored when a `discard` buffer is supplied.
    pub fn push(
        &mut self,
        byte: u8,
        output: &mut Vec<u8>,
        mut discard: Option<&mut Vec<u8>>,
    ) -> PairTally {
        let mut tally = PairTally::default();

        for shift in [6u8, 4, 2, 0] {
            let first = (byte >> (shift + 1)) & 1 == 1;
            let second = (byte >> shift) & 1 == 1;

            if first != second {
                tally.kept += 1;
                if let Some(full) = self.output.push(first) {
                    output.push(full);
                }
            } else {
                tally.discarded += 1;
                if let Some(full) = self.discard.push(first) {
                    if let Some(buf) = discard.as_deref_mut() {
                        buf.push(full);
                    }
                }
            }
        }

        self.output_bits += u64::from(tally.kept);
        self.discard_bits += u64::from(tally.discarded);
        tally
    }

    /// Flushes both partial accumulators at end of stream.
    ///
    /// Exactly one byte is appended to `output` (and to `discard`, if
    /// given), zero-padded in the low-order bits.
    pub fn finish(&mut self, output: &mut Vec<u8>, discard: Option<&mut Vec<u8>>) {
        output.push(self.output.flush());
        let trailing = self.discard.flush();
        if let Some(buf) = discard {
            buf.push(trailing);
        }
    }

    /// Total output bits produced so far.
    pub fn output_bits(&self) -> u64 {
        self.output_bits
    }

    /// Total discard bits produced so far.
    pub fn discard_bits(&self) -> u64 {
        self.discard_bits
    }

    /// Bits currently held in the output accumulator.
    pub fn pending_output_bits(&self) -> u8 {
        self.output.bit_count()
    }

    /// Bits currently held in the discard accumulator.
    pub fn pending_discard_bits(&self) -> u8 {
        self.discard.bit_count()
    }
}

/// Debiases an in-memory sample in one call.
///
/// The result always ends with the zero-padded trailing byte.
pub fn von_neumann(data: &[u8]) -> Vec<u8> {
    let mut extractor = BitExtractor::new();
    let mut output = Vec::with_capacity(data.len() / 2 + 1);

    for &byte in data {
        extractor.push(byte, &mut output, None);
    }
    extractor.finish(&mut output, None);

    output
}
