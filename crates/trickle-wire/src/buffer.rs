use crate::source::ByteSource;

/// A reusable byte buffer that is written to between decode calls and read
/// from during them.
///
/// The buffer keeps a read cursor and a write cursor over one fixed backing
/// array. Everything between the two is unread data:
///
/// ```text
///   0        read         write        capacity
///   ├─ spent ─┼── unread ───┼── spare ────┤
/// ```
///
/// Reading advances `read`; once it catches up with `write` both cursors
/// snap back to 0, which is the cheap and common case. When the spare tail
/// is too small for incoming bytes, the unread window is first moved to the
/// front (compaction) so the memory footprint stays constant. Only
/// [`grow`](Self::grow) reallocates.
#[derive(Debug, Clone)]
pub struct FeedBuffer {
    data: Box<[u8]>,
    read: usize,
    write: usize,
}

impl FeedBuffer {
    /// Create an empty buffer with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity].into_boxed_slice(),
            read: 0,
            write: 0,
        }
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.write - self.read
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of bytes that can still be written, after compaction.
    #[must_use]
    pub fn available(&self) -> usize {
        self.capacity() - self.len()
    }

    /// The unread bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.read..self.write]
    }

    /// Copy as much of `bytes` as fits. Returns the number of bytes taken.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        if self.capacity() - self.write < bytes.len() {
            self.compact();
        }
        let len = bytes.len().min(self.capacity() - self.write);
        self.data[self.write..self.write + len].copy_from_slice(&bytes[..len]);
        self.write += len;
        len
    }

    /// The writable tail, compacted first so it is as large as possible.
    /// Write into it, then call [`commit`](Self::commit).
    pub fn spare_mut(&mut self) -> &mut [u8] {
        self.compact();
        &mut self.data[self.write..]
    }

    /// Mark `len` bytes of the spare tail as written.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the spare tail.
    pub fn commit(&mut self, len: usize) {
        assert!(
            self.write + len <= self.capacity(),
            "commit of {len} bytes overflows the spare tail of {} bytes",
            self.capacity() - self.write
        );
        self.write += len;
    }

    /// Move the unread window to the front of the backing array.
    pub fn compact(&mut self) {
        if self.read == 0 {
            return;
        }
        self.data.copy_within(self.read..self.write, 0);
        self.write -= self.read;
        self.read = 0;
    }

    /// Enlarge the backing array by `additional` bytes.
    pub fn grow(&mut self, additional: usize) {
        let mut data = vec![0; self.capacity() + additional];
        let len = self.len();
        data[..len].copy_from_slice(self.as_slice());
        self.data = data.into_boxed_slice();
        self.read = 0;
        self.write = len;
    }

    /// Drop all unread bytes.
    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
    }

    fn consume(&mut self, len: usize) {
        self.read += len;
        if self.read == self.write {
            self.clear();
        }
    }
}

impl ByteSource for FeedBuffer {
    fn next_byte(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.data[self.read];
        self.consume(1);
        Some(byte)
    }

    fn next_bytes(&mut self, buf: &mut [u8]) -> usize {
        let len = self.len().min(buf.len());
        buf[..len].copy_from_slice(&self.data[self.read..self.read + len]);
        self.consume(len);
        len
    }

    fn skip_bytes(&mut self, count: u64) -> u64 {
        let len = usize::try_from(count).unwrap_or(usize::MAX).min(self.len());
        self.consume(len);
        len as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_then_drain_resets_cursors() {
        let mut buffer = FeedBuffer::new(4);
        assert_eq!(buffer.feed(&[1, 2, 3]), 3);
        let mut out = [0_u8; 3];
        assert_eq!(buffer.next_bytes(&mut out), 3);
        assert!(buffer.is_empty());
        // Cursors snapped back, so the full capacity is usable again.
        assert_eq!(buffer.feed(&[4, 5, 6, 7]), 4);
    }

    #[test]
    fn feed_compacts_before_refusing_bytes() {
        let mut buffer = FeedBuffer::new(4);
        buffer.feed(&[1, 2, 3, 4]);
        assert_eq!(buffer.next_byte(), Some(1));
        assert_eq!(buffer.next_byte(), Some(2));
        assert_eq!(buffer.feed(&[5, 6, 7]), 2);
        assert_eq!(buffer.as_slice(), &[3, 4, 5, 6]);
    }

    #[test]
    fn spare_and_commit() {
        let mut buffer = FeedBuffer::new(3);
        buffer.feed(&[9, 8]);
        assert_eq!(buffer.next_byte(), Some(9));
        let spare = buffer.spare_mut();
        assert_eq!(spare.len(), 2);
        spare[0] = 7;
        buffer.commit(1);
        assert_eq!(buffer.as_slice(), &[8, 7]);
    }

    #[test]
    #[should_panic(expected = "overflows the spare tail")]
    fn commit_past_capacity_panics() {
        let mut buffer = FeedBuffer::new(2);
        buffer.commit(3);
    }

    #[test]
    fn grow_keeps_unread_bytes() {
        let mut buffer = FeedBuffer::new(2);
        buffer.feed(&[1, 2]);
        assert_eq!(buffer.next_byte(), Some(1));
        buffer.grow(2);
        assert_eq!(buffer.capacity(), 4);
        assert_eq!(buffer.feed(&[3, 4, 5]), 3);
        assert_eq!(buffer.as_slice(), &[2, 3, 4, 5]);
    }

    #[test]
    fn skip_is_bounded_by_unread_bytes() {
        let mut buffer = FeedBuffer::new(4);
        buffer.feed(&[1, 2, 3]);
        assert_eq!(buffer.skip_bytes(10), 3);
        assert_eq!(buffer.available(), 4);
    }
}
