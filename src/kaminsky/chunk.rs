//! Bounded output chunking.

/// Collects output into chunks of at most `max_size` bytes.
///
/// A write that would overflow the current chunk fills it exactly to
/// capacity, hands it to the caller's sink and continues into a fresh
/// chunk. No byte is dropped or duplicated at a split.
#[derive(Debug)]
pub struct ChunkBuffer {
    buf: Vec<u8>,
    max_size: usize,
}

impl ChunkBuffer {
    /// Creates an empty buffer. `max_size` is clamped to at least 1.
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            buf: Vec::with_capacity(max_size),
            max_size,
        }
    }

    /// Appends `data`, emitting every chunk that reaches capacity.
    pub fn write<F, E>(&mut self, mut data: &[u8], mut emit: F) -> Result<(), E>
    where
        F: FnMut(Vec<u8>) -> Result<(), E>,
    {
        while self.buf.len() + data.len() > self.max_size {
            let available = self.max_size - self.buf.len();
            let (head, rest) = data.split_at(available);
            self.buf.extend_from_slice(head);
            data = rest;

            let full = std::mem::replace(&mut self.buf, Vec::with_capacity(self.max_size));
            tracing::trace!(bytes = full.len(), "Flushing full chunk");
            emit(full)?;
        }

        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Emits whatever is buffered. Does nothing when empty.
    pub fn flush<F, E>(&mut self, mut emit: F) -> Result<(), E>
    where
        F: FnMut(Vec<u8>) -> Result<(), E>,
    {
        if self.buf.is_empty() {
            return Ok(());
        }
        let rest = std::mem::take(&mut self.buf);
        tracing::trace!(bytes = rest.len(), "Flushing final chunk");
        emit(rest)
    }

    /// Returns the buffered length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the chunk capacity.
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
