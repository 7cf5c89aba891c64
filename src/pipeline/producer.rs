//! Producer task: extraction, optional encryption, chunked hand-off.

use super::{CancelToken, StreamReport};
use crate::config::{DebiasConfig, Mode, Termination};
use crate::error::DebiasError;
use crate::extraction::BitExtractor;
use crate::kaminsky::{ChunkBuffer, ChunkEncryptor};
use crossbeam_channel::Sender;
use rand_core::{CryptoRng, RngCore};
use std::io::{self, BufReader, Read};

pub(crate) type ChunkSender = Sender<io::Result<Vec<u8>>>;

/// Per-mode state between the extractor and the chunk buffer.
enum Stage<G> {
    /// Completed output bytes for the current input byte.
    Plain { scratch: Vec<u8> },
    Kaminsky(ChunkEncryptor<G>),
}

/// Owns all mutable extraction state for one stream.
///
/// Runs on its own thread. Every chunk hand-off blocks until the consumer
/// takes it, so in-flight data is bounded by one chunk plus the one being
/// transferred.
pub(crate) struct Producer<R, G> {
    input: io::Bytes<BufReader<R>>,
    config: DebiasConfig,
    extractor: BitExtractor,
    stage: Stage<G>,
    chunk: ChunkBuffer,
    tx: ChunkSender,
    token: CancelToken,
    report: StreamReport,
}

/// Sends one chunk downstream, counting delivered bytes.
fn deliver(tx: &ChunkSender, bytes_out: &mut u64, chunk: Vec<u8>) -> Result<(), DebiasError> {
    let len = chunk.len() as u64;
    tx.send(Ok(chunk)).map_err(|_| DebiasError::ConsumerClosed)?;
    *bytes_out += len;
    Ok(())
}

impl<R, G> Producer<R, G>
where
    R: Read,
    G: RngCore + CryptoRng,
{
    pub(crate) fn new(
        input: R,
        config: DebiasConfig,
        rng: G,
        tx: ChunkSender,
        token: CancelToken,
    ) -> Self {
        let stage = match config.mode {
            Mode::VonNeumann => Stage::Plain {
                scratch: Vec::with_capacity(1),
            },
            Mode::Kaminsky => Stage::Kaminsky(ChunkEncryptor::new(config.discard_policy, rng)),
        };

        Self {
            input: BufReader::new(input).bytes(),
            chunk: ChunkBuffer::new(config.max_chunk_size),
            config,
            extractor: BitExtractor::new(),
            stage,
            tx,
            token,
            report: StreamReport::default(),
        }
    }

    /// Runs to completion, then closes the channel and cancels the token.
    ///
    /// A failure is forwarded to the consumer before the channel closes.
    pub(crate) fn run(mut self) -> Result<StreamReport, DebiasError> {
        let outcome = self.drive();

        let Producer {
            tx, token, report, ..
        } = self;

        if let Err(e) = &outcome {
            tracing::debug!(error = %e, "Producer failed");
            // the consumer may already be gone
            let _ = tx.send(Err(e.to_io()));
        }
        drop(tx);
        token.cancel();

        outcome.map(|()| {
            tracing::debug!(
                bytes_in = report.bytes_in,
                bytes_out = report.bytes_out,
                cycles = report.cipher_cycles,
                cancelled = report.cancelled,
                "Producer finished"
            );
            report
        })
    }

    fn drive(&mut self) -> Result<(), DebiasError> {
        loop {
            if self.token.is_cancelled() {
                self.report.cancelled = true;
                tracing::warn!(
                    bytes_in = self.report.bytes_in,
                    "Stream cancelled before end of input, flushing"
                );
                break;
            }

            match self.input.next() {
                Some(byte) => self.consume(byte?)?,
                None => {
                    if self.config.termination == Termination::HoldOpen {
                        tracing::debug!("Input exhausted, holding stream open until cancelled");
                        self.token.wait();
                    }
                    break;
                }
            }
        }

        self.finish()
    }

    fn consume(&mut self, byte: u8) -> Result<(), DebiasError> {
        let Self {
            config,
            extractor,
            stage,
            chunk,
            tx,
            report,
            ..
        } = self;

        report.bytes_in += 1;

        match stage {
            Stage::Plain { scratch } => {
                extractor.push(byte, scratch, None);
                if !scratch.is_empty() {
                    chunk.write(&scratch[..], |c| deliver(tx, &mut report.bytes_out, c))?;
                    scratch.clear();
                }
            }
            Stage::Kaminsky(encryptor) => {
                let (plaintext, key_material) = encryptor.buffers_mut();
                extractor.push(byte, plaintext, Some(key_material));

                if report.bytes_in % config.block_size == 0 {
                    let ciphertext = encryptor.cycle()?;
                    report.cipher_cycles += 1;
                    chunk.write(&ciphertext, |c| deliver(tx, &mut report.bytes_out, c))?;
                }
            }
        }

        Ok(())
    }

    /// Flushes the accumulators, runs the final cipher cycle and empties the chunk buffer.
    fn finish(&mut self) -> Result<(), DebiasError> {
        let Self {
            extractor,
            stage,
            chunk,
            tx,
            report,
            ..
        } = self;

        match stage {
            Stage::Plain { scratch } => {
                extractor.finish(scratch, None);
                chunk.write(&scratch[..], |c| deliver(tx, &mut report.bytes_out, c))?;
                scratch.clear();
            }
            Stage::Kaminsky(encryptor) => {
                let (plaintext, key_material) = encryptor.buffers_mut();
                extractor.finish(plaintext, Some(key_material));

                let ciphertext = encryptor.cycle()?;
                report.cipher_cycles += 1;
                chunk.write(&ciphertext, |c| deliver(tx, &mut report.bytes_out, c))?;
            }
        }

        chunk.flush(|c| deliver(tx, &mut report.bytes_out, c))?;

        report.output_bits = extractor.output_bits();
        report.discard_bits = extractor.discard_bits();
        Ok(())
    }
}
