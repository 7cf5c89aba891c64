//! MSB-first bit packing.

/// Packs single bits into bytes, most significant bit first.
///
/// The bit counter always stays in `[0, 8)`: the eighth bit completes a
/// byte, which is handed back to the caller and the accumulator resets.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Accumulator {
    /// Partially filled byte.
    value: u8,
    /// Number of bits already placed in `value`.
    bits: u8,
}

impl Accumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `bit` at the next free position.
    ///
    /// Returns the completed byte when this was the eighth bit.
    #[inline]
    pub fn push(&mut self, bit: bool) -> Option<u8> {
        if bit {
            self.value |= 1 << (7 - self.bits);
        }
        self.bits += 1;

        if self.bits == 8 {
            let full = self.value;
            *self = Self::default();
            Some(full)
        } else {
            None
        }
    }

    /// Returns the partial byte, zero-padded in the low-order bits, and resets.
    ///
    /// An empty accumulator still yields a zero byte: the number of valid
    /// bits in the final byte is not recoverable from the output stream.
    #[inline]
    pub fn flush(&mut self) -> u8 {
        let partial = self.value;
        *self = Self::default();
        partial
    }

    /// Returns the number of buffered bits.
    #[inline]
    pub fn bit_count(&self) -> u8 {
        self.bits
    }

    /// Returns true if no bits are buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl std::fmt::Debug for Accumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accumulator")
            .field("value", &format!("{:08b}", self.value))
            .field("bits", &self.bits)
            .finish()
    }
}
