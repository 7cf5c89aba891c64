//! Von Neumann bit extraction.
//!
//! This module turns a biased byte stream into debiased output bits by
//! examining disjoint bit pairs. Equal pairs are not thrown away: their
//! leading bit is packed into a separate discard stream that the Kaminsky
//! stage reuses as key material.

mod accumulator;
mod extractor;

pub use accumulator::Accumulator;
pub use extractor::{von_neumann, BitExtractor, PairTally};
