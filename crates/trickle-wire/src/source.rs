use std::io::{ErrorKind, Read};

/// A raw supplier of bytes behind a [`BitInput`](crate::BitInput).
///
/// [`next_byte`](Self::next_byte) is the only required primitive: bit
/// windows, unaligned reads and range reads are all built on top of it.
/// Sources that can do better override the batch operations.
pub trait ByteSource {
    /// The next byte, or `None` if nothing is available right now.
    fn next_byte(&mut self) -> Option<u8>;

    /// Fill `buf` from the front. Returns the number of bytes written.
    fn next_bytes(&mut self, buf: &mut [u8]) -> usize {
        let mut read = 0;
        for slot in buf.iter_mut() {
            match self.next_byte() {
                Some(byte) => *slot = byte,
                None => break,
            }
            read += 1;
        }
        read
    }

    /// Discard up to `count` bytes. Returns the number discarded.
    fn skip_bytes(&mut self, count: u64) -> u64 {
        let mut skipped = 0;
        while skipped < count && self.next_byte().is_some() {
            skipped += 1;
        }
        skipped
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn next_byte(&mut self) -> Option<u8> {
        (**self).next_byte()
    }

    fn next_bytes(&mut self, buf: &mut [u8]) -> usize {
        (**self).next_bytes(buf)
    }

    fn skip_bytes(&mut self, count: u64) -> u64 {
        (**self).skip_bytes(count)
    }
}

/// A fixed array with a read cursor.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The unread bytes.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

impl ByteSource for SliceSource<'_> {
    fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn next_bytes(&mut self, buf: &mut [u8]) -> usize {
        let remaining = self.remaining();
        let len = remaining.len().min(buf.len());
        buf[..len].copy_from_slice(&remaining[..len]);
        self.pos += len;
        len
    }

    fn skip_bytes(&mut self, count: u64) -> u64 {
        let len = usize::try_from(count)
            .unwrap_or(usize::MAX)
            .min(self.remaining().len());
        self.pos += len;
        len as u64
    }
}

/// A push-style stream.
///
/// A read that would block, hits end of file, or fails is reported as
/// "nothing available right now": a decoder fed from this source returns
/// `Processing` and can be called again once the stream has more data.
#[derive(Debug)]
pub struct ReadSource<R> {
    reader: R,
}

impl<R: Read> ReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn next_byte(&mut self) -> Option<u8> {
        let mut byte = [0_u8; 1];
        (self.next_bytes(&mut byte) == 1).then_some(byte[0])
    }

    fn next_bytes(&mut self, buf: &mut [u8]) -> usize {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(_) => break,
            }
        }
        filled
    }
}

/// A raw per-byte callback.
pub struct FnSource<F> {
    next: F,
}

impl<F: FnMut() -> Option<u8>> FnSource<F> {
    pub fn new(next: F) -> Self {
        Self { next }
    }
}

impl<F: FnMut() -> Option<u8>> ByteSource for FnSource<F> {
    fn next_byte(&mut self) -> Option<u8> {
        (self.next)()
    }
}

/// Any [`bytes::Buf`]: `Bytes`, `&[u8]`, a `Chain` of chunks, or a
/// `&mut BytesMut` that is refilled between decode calls.
#[derive(Debug)]
pub struct BufSource<B> {
    buf: B,
}

impl<B: bytes::Buf> BufSource<B> {
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    pub fn into_inner(self) -> B {
        self.buf
    }
}

impl<B: bytes::Buf> ByteSource for BufSource<B> {
    fn next_byte(&mut self) -> Option<u8> {
        self.buf.has_remaining().then(|| self.buf.get_u8())
    }

    fn next_bytes(&mut self, buf: &mut [u8]) -> usize {
        let len = self.buf.remaining().min(buf.len());
        self.buf.copy_to_slice(&mut buf[..len]);
        len
    }

    fn skip_bytes(&mut self, count: u64) -> u64 {
        let len = usize::try_from(count).unwrap_or(usize::MAX).min(self.buf.remaining());
        self.buf.advance(len);
        len as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    /// A reader that hands out one byte per call and then pretends the
    /// socket would block.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos == self.data.len() {
                return Err(ErrorKind::WouldBlock.into());
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn slice_source_batches() {
        let mut source = SliceSource::new(&[1, 2, 3, 4]);
        let mut buf = [0_u8; 3];
        assert_eq!(source.next_bytes(&mut buf), 3);
        assert_eq!(source.skip_bytes(10), 1);
        assert_eq!(source.position(), 4);
        assert!(source.remaining().is_empty());
    }

    #[test]
    fn read_source_treats_would_block_as_empty() {
        let mut source = ReadSource::new(Trickle {
            data: vec![7, 8],
            pos: 0,
        });
        let mut buf = [0_u8; 4];
        assert_eq!(source.next_bytes(&mut buf), 2);
        assert_eq!(&buf[..2], &[7, 8]);
        assert_eq!(source.next_byte(), None);
    }

    #[test]
    fn buf_source_over_refilled_bytes_mut() {
        let mut pending = BytesMut::new();
        pending.put_slice(&[1, 2]);
        {
            let mut source = BufSource::new(&mut pending);
            assert_eq!(source.next_byte(), Some(1));
        }
        pending.put_u8(3);
        let mut source = BufSource::new(&mut pending);
        let mut buf = [0_u8; 4];
        assert_eq!(source.next_bytes(&mut buf), 2);
        assert_eq!(&buf[..2], &[2, 3]);
    }

    #[test]
    fn fn_source_uses_the_callback() {
        let mut count = 0_u8;
        let mut source = FnSource::new(|| {
            count += 1;
            (count <= 2).then_some(count)
        });
        assert_eq!(source.skip_bytes(5), 2);
    }
}
