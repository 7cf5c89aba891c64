//! Entropy Debias Library
//!
//! Removes bias from raw physical-noise samples using the von Neumann
//! extractor, optionally whitening the result with AES-256-CBC keyed from
//! the bits the extractor throws away (Kaminsky mode).
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! input → extraction → [kaminsky] → pipeline → files
//!              ↓
//!          analysis (entropy estimate)
//! ```
//!
//! # Design Principles
//!
//! - **Streaming**: the producer never runs more than one chunk ahead of its reader
//! - **Deterministic extraction**: the debiased bits depend only on the input bytes
//! - **Uses standard primitives**: SHA-256 key derivation, AES-256-CBC, OS randomness
//! - **No cryptographic claims**: the entropy figure is an estimate, not a proof
//!
//! # Example
//!
//! ```no_run
//! use entropy_debias::{DebiasConfig, DebiasStream, shannon_entropy};
//! use std::fs::File;
//!
//! let input = File::open("noise.bin").unwrap();
//! let stream = DebiasStream::spawn(input, &DebiasConfig::kaminsky()).unwrap();
//!
//! let (output, report) = stream.collect().unwrap();
//! println!(
//!     "{} bytes in, {} bytes out, ~{} bits of entropy",
//!     report.bytes_in,
//!     output.len(),
//!     shannon_entropy(&output)
//! );
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod extraction;
pub mod files;
pub mod kaminsky;
pub mod metrics;
pub mod pipeline;

#[cfg(test)]
mod test_support;

// Re-export commonly used types at crate root
pub use analysis::{shannon_entropy, SampleSummary};
pub use config::{DebiasConfig, FileConfig, Mode, Termination};
pub use error::DebiasError;
pub use extraction::{von_neumann, BitExtractor};
pub use files::{process_directory, process_file, Stats};
pub use kaminsky::DiscardPolicy;
pub use pipeline::{CancelToken, DebiasReader, DebiasStream, StreamHandle, StreamReport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
