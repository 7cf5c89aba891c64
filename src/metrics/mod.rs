//! Prometheus metrics for debiasing sessions.
//!
//! # Metrics Exposed
//!
//! ## Volume
//! - `debias_streams_total` - Streams processed
//! - `debias_bytes_in_total` - Raw input bytes consumed
//! - `debias_bytes_out_total` - Output bytes delivered
//! - `debias_cipher_cycles_total` - Kaminsky encryption cycles
//!
//! ## Extraction
//! - `debias_output_bits_total` - Bits kept by the extractor
//! - `debias_discard_bits_total` - Bits routed to the discard stream
//!
//! ## Last Stream
//! - `debias_last_duration_seconds` - Wall-clock duration
//! - `debias_last_yield_ratio` - Output bytes per input byte
//!
//! # Example
//!
//! ```no_run
//! use entropy_debias::config::DebiasConfig;
//! use entropy_debias::files::process_file;
//! use entropy_debias::metrics::MetricsRegistry;
//! use entropy_debias::pipeline::CancelToken;
//! use std::path::Path;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! let stats = process_file(Path::new("noise.bin"), &DebiasConfig::default(), CancelToken::new())
//!     .expect("Failed to process file");
//!
//! registry.record(&stats);
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry};
