//! Streaming debiasing pipeline.
//!
//! A producer thread owns the extractor (and, in Kaminsky mode, the
//! encryptor) and hands bounded chunks to the consumer through a
//! zero-capacity channel: each hand-off is a rendezvous, so the producer
//! can never run more than one chunk ahead of the reader.
//!
//! ```text
//! input ─▶ BitExtractor ─▶ [ChunkEncryptor] ─▶ ChunkBuffer ═▶ DebiasReader
//!                                       (rendezvous channel)
//! ```
//!
//! Cancellation is cooperative and polled once per input byte. Every exit
//! path except an I/O or random-source failure flushes the partial
//! accumulators (and runs a final cipher cycle) before the channel closes.

mod cancel;
mod producer;
mod reader;

pub use cancel::CancelToken;
pub use reader::DebiasReader;

use crate::config::DebiasConfig;
use crate::error::DebiasError;
use producer::Producer;
use rand_core::{CryptoRng, OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::thread::JoinHandle;

/// Counters collected by the producer for one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamReport {
    /// Input bytes consumed.
    pub bytes_in: u64,
    /// Bits taken from unequal pairs.
    pub output_bits: u64,
    /// Bits taken from equal pairs.
    pub discard_bits: u64,
    /// Bytes handed to the consumer.
    pub bytes_out: u64,
    /// Cipher cycles run (Kaminsky only).
    pub cipher_cycles: u64,
    /// True if cancellation stopped the stream before the input ran out.
    pub cancelled: bool,
}

/// Producer side of a running stream.
#[derive(Debug)]
pub struct StreamHandle {
    token: CancelToken,
    handle: JoinHandle<Result<StreamReport, DebiasError>>,
}

impl StreamHandle {
    /// Returns the stream's cancellation token.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Requests cancellation. Buffered output is still flushed.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the producer thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the producer and returns its report.
    ///
    /// The reader must be drained or dropped first; a producer blocked on
    /// a hand-off to a live but idle reader never finishes.
    pub fn join(self) -> Result<StreamReport, DebiasError> {
        self.handle
            .join()
            .map_err(|_| DebiasError::ProducerPanicked)?
    }
}

/// A debiasing stream: a running producer plus the reader it feeds.
#[derive(Debug)]
pub struct DebiasStream {
    reader: DebiasReader,
    handle: StreamHandle,
}

impl DebiasStream {
    /// Starts a stream over `input`, drawing randomness from the OS.
    pub fn spawn<R>(input: R, config: &DebiasConfig) -> Result<Self, DebiasError>
    where
        R: Read + Send + 'static,
    {
        Self::spawn_with(input, config, CancelToken::new(), OsRng)
    }

    /// Starts a stream with an explicit token and random source.
    pub fn spawn_with<R, G>(
        input: R,
        config: &DebiasConfig,
        token: CancelToken,
        rng: G,
    ) -> Result<Self, DebiasError>
    where
        R: Read + Send + 'static,
        G: RngCore + CryptoRng + Send + 'static,
    {
        config.validate()?;

        let (tx, rx) = crossbeam_channel::bounded(0);
        let producer = Producer::new(input, config.clone(), rng, tx, token.clone());

        tracing::debug!(
            mode = ?config.mode,
            termination = ?config.termination,
            block_size = config.block_size,
            max_chunk_size = config.max_chunk_size,
            "Starting debias stream"
        );

        let handle = std::thread::Builder::new()
            .name("debias-producer".to_string())
            .spawn(move || producer.run())?;

        Ok(Self {
            reader: DebiasReader::new(rx),
            handle: StreamHandle { token, handle },
        })
    }

    /// Returns the stream's cancellation token.
    pub fn cancel_token(&self) -> &CancelToken {
        self.handle.token()
    }

    /// Returns the consumer half.
    pub fn reader(&mut self) -> &mut DebiasReader {
        &mut self.reader
    }

    /// Splits into reader and producer handle.
    pub fn into_parts(self) -> (DebiasReader, StreamHandle) {
        (self.reader, self.handle)
    }

    /// Drains the stream and waits for the producer.
    pub fn collect(self) -> Result<(Vec<u8>, StreamReport), DebiasError> {
        let (mut reader, handle) = self.into_parts();

        let mut output = Vec::new();
        let read = reader.read_to_end(&mut output);
        drop(reader);

        // the producer's own error is more precise than the relayed one
        let report = handle.join()?;
        read?;

        Ok((output, report))
    }
}

impl Read for DebiasStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, Termination};
    use crate::extraction::von_neumann;
    use crate::kaminsky::DiscardPolicy;
    use crate::test_support::FailingRng;
    use proptest::prelude::*;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Yields `data`, then cancels `token` and keeps producing `filler`.
    struct CancelAfter {
        data: Vec<u8>,
        pos: usize,
        token: CancelToken,
        filler: u8,
    }

    impl Read for CancelAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos < self.data.len() {
                let n = buf.len().min(self.data.len() - self.pos);
                buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            self.token.cancel();
            buf.fill(self.filler);
            Ok(buf.len())
        }
    }

    /// Yields `remaining` bytes of 0xAA, then fails.
    struct FailAfter {
        remaining: usize,
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "sensor unplugged"));
            }
            let n = buf.len().min(self.remaining);
            buf[..n].fill(0xAA);
            self.remaining -= n;
            Ok(n)
        }
    }

    fn plain(input: Vec<u8>) -> (Vec<u8>, StreamReport) {
        DebiasStream::spawn(Cursor::new(input), &DebiasConfig::default())
            .unwrap()
            .collect()
            .unwrap()
    }

    fn kaminsky(input: Vec<u8>, config: DebiasConfig, seed: u64) -> (Vec<u8>, StreamReport) {
        DebiasStream::spawn_with(
            Cursor::new(input),
            &config,
            CancelToken::new(),
            ChaCha20Rng::seed_from_u64(seed),
        )
        .unwrap()
        .collect()
        .unwrap()
    }

    #[test]
    fn test_01_pairs_stream_to_zero_byte() {
        // 0101010101010101: one byte of zeros plus the empty trailing flush
        let (output, report) = plain(vec![0x55, 0x55]);
        assert_eq!(output, vec![0x00, 0x00]);
        assert_eq!(report.output_bits, 8);
        assert_eq!(report.discard_bits, 0);
    }

    #[test]
    fn test_10_pairs_stream_to_one_byte() {
        let (output, _) = plain(vec![0xAA, 0xAA]);
        assert_eq!(output, vec![0xFF, 0x00]);
    }

    #[test]
    fn test_all_ones_yield_no_output_bits() {
        let input = io::repeat(0xFF).take(1_000_000);
        let (output, report) = DebiasStream::spawn(input, &DebiasConfig::default())
            .unwrap()
            .collect()
            .unwrap();

        assert_eq!(report.bytes_in, 1_000_000);
        assert_eq!(report.output_bits, 0);
        assert_eq!(report.discard_bits, 4_000_000);
        // only the zero-padded trailing byte
        assert_eq!(output, vec![0x00]);
    }

    #[test]
    fn test_reads_bounded_by_chunk_size() {
        let config = DebiasConfig {
            max_chunk_size: 4,
            ..Default::default()
        };
        // 20 bytes of 0xAA: ten 0xFF bytes plus the trailing 0x00
        let mut stream = DebiasStream::spawn(Cursor::new(vec![0xAA; 20]), &config).unwrap();

        let mut buf = [0u8; 100];
        let mut sizes = Vec::new();
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            sizes.push(n);
        }

        assert_eq!(sizes, vec![4, 4, 3]);
        let (_, handle) = stream.into_parts();
        assert_eq!(handle.join().unwrap().bytes_out, 11);
    }

    #[test]
    fn test_exhaustion_cancels_token() {
        let stream = DebiasStream::spawn(Cursor::new(vec![1, 2, 3]), &DebiasConfig::default())
            .unwrap();
        let token = stream.cancel_token().clone();

        let (_, report) = stream.collect().unwrap();
        assert!(token.is_cancelled());
        assert!(!report.cancelled);
    }

    #[test]
    fn test_cancel_mid_stream_flushes_partial_byte() {
        let token = CancelToken::new();
        let input = CancelAfter {
            // 10 00 00 00: one output bit pending
            data: vec![0x80],
            pos: 0,
            token: token.clone(),
            filler: 0xAA,
        };

        let (output, report) =
            DebiasStream::spawn_with(input, &DebiasConfig::default(), token, OsRng)
                .unwrap()
                .collect()
                .unwrap();

        // the filler byte read as the token flips is extracted, then the loop stops
        assert!(report.cancelled);
        assert_eq!(report.bytes_in, 2);
        assert_eq!(report.output_bits, 5);
        assert_eq!(output, vec![0xF8]);
    }

    /// Cursor that counts the bytes handed to the producer.
    struct Counted {
        inner: Cursor<Vec<u8>>,
        taken: Arc<AtomicUsize>,
    }

    impl Read for Counted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.taken.fetch_add(n, Ordering::SeqCst);
            Ok(n)
        }
    }

    #[test]
    fn test_idle_reader_stalls_producer() {
        const LEN: usize = 1_000_000;
        let taken = Arc::new(AtomicUsize::new(0));
        let input = Counted {
            inner: Cursor::new(vec![0xAA; LEN]),
            taken: taken.clone(),
        };
        let config = DebiasConfig {
            max_chunk_size: 4,
            ..Default::default()
        };

        let stream = DebiasStream::spawn(input, &config).unwrap();
        let (mut reader, handle) = stream.into_parts();

        std::thread::sleep(Duration::from_millis(200));
        assert!(!handle.is_finished());
        // one read-ahead buffer at most, nowhere near the whole input
        assert!(taken.load(Ordering::SeqCst) <= 16 * 1024);

        // each read hands over exactly one chunk and the producer waits again
        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], &[0xFF; 4]);
        std::thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished());
        assert!(taken.load(Ordering::SeqCst) <= 16 * 1024);

        drop(reader);
        assert!(matches!(handle.join(), Err(DebiasError::ConsumerClosed)));
        assert!(taken.load(Ordering::SeqCst) < LEN);
    }

    #[test]
    fn test_hold_open_waits_for_cancel() {
        let config = DebiasConfig {
            termination: Termination::HoldOpen,
            ..Default::default()
        };
        let stream = DebiasStream::spawn(Cursor::new(vec![0xAA, 0xAA]), &config).unwrap();
        let (mut reader, handle) = stream.into_parts();

        assert!(!handle.token().wait_timeout(Duration::from_millis(50)));
        assert!(!handle.is_finished());

        handle.cancel();
        let mut output = Vec::new();
        reader.read_to_end(&mut output).unwrap();
        let report = handle.join().unwrap();

        assert_eq!(output, vec![0xFF, 0x00]);
        assert!(!report.cancelled);
    }

    #[test]
    fn test_kaminsky_cycle_count_and_length() {
        let config = DebiasConfig {
            block_size: 10,
            ..DebiasConfig::kaminsky()
        };
        let input: Vec<u8> = (0..100u32).map(|i| (i * 37 + 11) as u8).collect();

        let (output, report) = kaminsky(input, config, 21);

        // ten mid-stream cycles plus the final one; each plaintext is under 16 bytes
        assert_eq!(report.cipher_cycles, 11);
        assert_eq!(output.len(), 11 * 16);
        assert_eq!(report.bytes_out, 176);
    }

    #[test]
    fn test_kaminsky_chunks_split_at_capacity() {
        let config = DebiasConfig {
            block_size: 10,
            max_chunk_size: 64,
            ..DebiasConfig::kaminsky()
        };
        let stream = DebiasStream::spawn_with(
            Cursor::new(vec![0x5A; 100]),
            &config,
            CancelToken::new(),
            ChaCha20Rng::seed_from_u64(22),
        )
        .unwrap();
        let (mut reader, handle) = stream.into_parts();

        let mut buf = [0u8; 1024];
        let mut sizes = Vec::new();
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            sizes.push(n);
        }

        assert_eq!(sizes, vec![64, 64, 48]);
        assert_eq!(handle.join().unwrap().bytes_out, 176);
    }

    #[test]
    fn test_kaminsky_output_decrypts_with_discard_key() {
        use crate::kaminsky::{pkcs7_pad, BLOCK_SIZE};
        use crate::test_support::decrypt_cbc;
        use sha2::{Digest, Sha256};

        // all "01" pairs: 16 zero bytes plus trailing byte, no discard bits
        let (output, report) = kaminsky(vec![0x55; 32], DebiasConfig::kaminsky(), 23);
        assert_eq!(report.cipher_cycles, 1);
        assert_eq!(output.len(), 32);

        // key material is only the trailing discard byte
        let key = Sha256::digest([0x00]);
        let mut iv = [0u8; BLOCK_SIZE];
        ChaCha20Rng::seed_from_u64(23).fill_bytes(&mut iv);

        assert_eq!(decrypt_cbc(&key, &iv, &output), pkcs7_pad(&[0u8; 17], BLOCK_SIZE));
    }

    #[test]
    fn test_kaminsky_policies_both_run() {
        let input: Vec<u8> = (0..=255).collect();
        for policy in [DiscardPolicy::ResetPerCycle, DiscardPolicy::Cumulative] {
            let config = DebiasConfig {
                block_size: 32,
                discard_policy: policy,
                ..DebiasConfig::kaminsky()
            };
            let (output, report) = kaminsky(input.clone(), config, 24);
            assert_eq!(report.cipher_cycles, 9);
            assert_eq!(output.len() % 16, 0);
        }
    }

    #[test]
    fn test_kaminsky_cancel_runs_final_cycle() {
        let token = CancelToken::new();
        let input = CancelAfter {
            data: vec![0xAA; 8],
            pos: 0,
            token: token.clone(),
            filler: 0x00,
        };
        let config = DebiasConfig {
            block_size: 4,
            ..DebiasConfig::kaminsky()
        };

        let (output, report) =
            DebiasStream::spawn_with(input, &config, token, ChaCha20Rng::seed_from_u64(25))
                .unwrap()
                .collect()
                .unwrap();

        // cycles after bytes 4 and 8, then the final one after the filler byte
        assert!(report.cancelled);
        assert_eq!(report.bytes_in, 9);
        assert_eq!(report.cipher_cycles, 3);
        assert_eq!(output.len(), 48);
    }

    #[test]
    fn test_random_source_failure_aborts_stream() {
        let stream = DebiasStream::spawn_with(
            Cursor::new(vec![0xAA; 64]),
            &DebiasConfig::kaminsky(),
            CancelToken::new(),
            FailingRng,
        )
        .unwrap();

        assert!(matches!(
            stream.collect(),
            Err(DebiasError::RandomSource(_))
        ));
    }

    #[test]
    fn test_io_failure_reaches_reader_and_join() {
        let stream =
            DebiasStream::spawn(FailAfter { remaining: 10 }, &DebiasConfig::default()).unwrap();
        let (mut reader, handle) = stream.into_parts();

        let mut output = Vec::new();
        let err = reader.read_to_end(&mut output).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);

        assert!(matches!(handle.join(), Err(DebiasError::Io(_))));
    }

    #[test]
    fn test_dropped_reader_stops_producer() {
        let config = DebiasConfig {
            max_chunk_size: 16,
            ..Default::default()
        };
        let stream = DebiasStream::spawn(Cursor::new(vec![0xAA; 10_000]), &config).unwrap();
        let (reader, handle) = stream.into_parts();
        drop(reader);

        assert!(matches!(handle.join(), Err(DebiasError::ConsumerClosed)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DebiasConfig {
            block_size: 0,
            ..DebiasConfig::kaminsky()
        };
        assert!(matches!(
            DebiasStream::spawn(Cursor::new(Vec::new()), &config),
            Err(DebiasError::Config(_))
        ));
    }

    #[test]
    fn test_independent_streams_in_parallel() {
        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                std::thread::spawn(move || {
                    let input = vec![0xAA ^ i; 4096];
                    let expected = von_neumann(&input);
                    let (output, _) = plain(input);
                    assert_eq!(output, expected);
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_stream_matches_one_shot(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            max_chunk_size in 1usize..256,
        ) {
            let config = DebiasConfig {
                mode: Mode::VonNeumann,
                max_chunk_size,
                ..Default::default()
            };
            let (output, report) = DebiasStream::spawn(Cursor::new(data.clone()), &config)
                .unwrap()
                .collect()
                .unwrap();

            prop_assert_eq!(&output, &von_neumann(&data));
            prop_assert_eq!(report.bytes_out, output.len() as u64);
            prop_assert_eq!(report.output_bits + report.discard_bits, data.len() as u64 * 4);
        }
    }
}
