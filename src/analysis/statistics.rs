//! Bit-level sanity checks for debiased output.
//!
//! These are quick diagnostics for logs and tests. Passing them is
//! necessary but not sufficient for good randomness.

use super::entropy::shannon_entropy;

/// Calculates bit bias as deviation from 0.5.
///
/// Returns a value in [-0.5, 0.5] where 0.0 is unbiased.
pub fn bit_bias(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let ones: usize = data.iter().map(|b| b.count_ones() as usize).sum();
    let total = (data.len() * 8) as f64;
    (ones as f64 / total) - 0.5
}

/// Diagnostic summary of a byte sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSummary {
    /// Number of bytes analyzed.
    pub sample_size: usize,
    /// Bit bias (deviation from 0.5).
    pub bit_bias: f64,
    /// Approximate entropy score in bits.
    pub entropy: u64,
}

impl SampleSummary {
    /// Runs all diagnostics on a sample.
    pub fn analyze(data: &[u8]) -> Self {
        Self {
            sample_size: data.len(),
            bit_bias: bit_bias(data),
            entropy: shannon_entropy(data),
        }
    }

    /// Entropy score per byte, in bits (0.0 to 8.0).
    pub fn bits_per_byte(&self) -> f64 {
        if self.sample_size == 0 {
            return 0.0;
        }
        self.entropy as f64 / self.sample_size as f64
    }
}
