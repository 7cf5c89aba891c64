//! Entropy diagnostics.
//!
//! Pure functions over byte samples, used by the CLI for reporting and by
//! tests. These are sanity checks, not certified randomness tests.

mod entropy;
mod statistics;

pub use entropy::shannon_entropy;
pub use statistics::{bit_bias, SampleSummary};
