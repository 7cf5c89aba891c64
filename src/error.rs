//! Crate-level error taxonomy.

use crate::config::ConfigError;
use crate::kaminsky::CipherError;
use thiserror::Error;

/// Errors that abort a debiasing stream.
///
/// End-of-stream is not represented here: readers report it as `Ok(0)`.
#[derive(Debug, Error)]
pub enum DebiasError {
    /// The input source or output sink failed.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// The OS random source failed. There is no weaker fallback.
    #[error("secure random source failed: {0}")]
    RandomSource(String),

    /// Cipher setup failed; the derived key had the wrong length.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// The stream configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The reading half was dropped while the producer still had output.
    #[error("stream consumer closed before the producer finished")]
    ConsumerClosed,

    /// The producer thread panicked.
    #[error("producer task panicked")]
    ProducerPanicked,
}

impl DebiasError {
    /// Converts into an `io::Error` for delivery through a `Read` impl.
    pub(crate) fn to_io(&self) -> std::io::Error {
        match self {
            DebiasError::Io(e) => std::io::Error::new(e.kind(), e.to_string()),
            other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
        }
    }
}
