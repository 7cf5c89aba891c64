//! Consumer half of a debiasing stream.

use crossbeam_channel::Receiver;
use std::io::{self, Read};

/// Pull-based reader over the chunks a producer hands off.
///
/// Each `read` returns at most what remains of the current chunk, fewer
/// bytes than requested near the end, and `Ok(0)` once the producer has
/// closed the channel and every chunk has been consumed. A producer
/// failure surfaces once as an `io::Error`.
pub struct DebiasReader {
    rx: Receiver<io::Result<Vec<u8>>>,
    current: Vec<u8>,
    pos: usize,
    done: bool,
    delivered: u64,
}

impl DebiasReader {
    pub(crate) fn new(rx: Receiver<io::Result<Vec<u8>>>) -> Self {
        Self {
            rx,
            current: Vec::new(),
            pos: 0,
            done: false,
            delivered: 0,
        }
    }

    /// Total bytes returned to the caller so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Returns true once end-of-stream (or a failure) has been reported.
    pub fn is_done(&self) -> bool {
        self.done && self.pos == self.current.len()
    }
}

impl Read for DebiasReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pos == self.current.len() {
            if self.done {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.current = chunk;
                    self.pos = 0;
                }
                Ok(Err(e)) => {
                    self.done = true;
                    return Err(e);
                }
                Err(_) => {
                    // channel closed: producer finished its final flush
                    self.done = true;
                    return Ok(0);
                }
            }
        }

        let n = buf.len().min(self.current.len() - self.pos);
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        self.delivered += n as u64;

        Ok(n)
    }
}

impl std::fmt::Debug for DebiasReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebiasReader")
            .field("buffered", &(self.current.len() - self.pos))
            .field("delivered", &self.delivered)
            .field("done", &self.done)
            .finish()
    }
}
