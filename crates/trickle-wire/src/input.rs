use crate::source::{BufSource, ByteSource, FnSource, ReadSource, SliceSource};

/// A readable, append-only byte stream with bit granularity.
///
/// The read cursor has two levels: a byte cursor, and a bit cursor nested
/// inside the current unread byte. Bits are always delivered most
/// significant first. Reading a whole byte after a few single bits
/// continues from the unaligned bit offset, so the byte returned straddles
/// two source bytes.
///
/// Only [`read_bit`](Self::read_bit) and [`read`](Self::read) are required.
/// The bulk readers are derived from them and return the count actually
/// read: a short count means the source ran dry, and `0` on a non-empty
/// request means the source is exhausted. Running out is never an error.
pub trait DecoderInput {
    /// Read the next bit (`0` or `1`), or `None` at end of data.
    fn read_bit(&mut self) -> Option<u8>;

    /// Read the next 8 bits as a byte, or `None` if fewer than 8 remain.
    fn read(&mut self) -> Option<u8>;

    /// Fill `buf` from the front. Returns the number of bytes written.
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        read_bytes_one_by_one(self, buf)
    }

    /// Read `length` bits into `buf`, starting at bit `start` (bit 0 is the
    /// most significant bit of `buf[0]`). Bits of `buf` outside the range
    /// are left untouched. Returns the number of bits written.
    ///
    /// The range is filled in three phases: an unaligned prefix finishing
    /// the first destination byte, a run of whole bytes handed to
    /// [`read_bytes`](Self::read_bytes), and an unaligned suffix. Each phase
    /// stops early when the source runs out.
    ///
    /// # Panics
    ///
    /// Panics if `start + length` exceeds `buf.len() * 8`.
    fn read_bits(&mut self, buf: &mut [u8], start: usize, length: usize) -> usize {
        let in_bounds = start
            .checked_add(length)
            .is_some_and(|end| end <= buf.len() * 8);
        assert!(
            in_bounds,
            "bit range {start}+{length} is out of bounds for {} bits",
            buf.len() * 8
        );
        if length == 0 {
            return 0;
        }

        let first = start / 8;
        let offset = start % 8;
        let mut total = 0;

        let prefix = if offset > 0 { (8 - offset).min(length) } else { 0 };
        if prefix > 0 {
            let read = read_bits_into(self, &mut buf[first], offset, prefix);
            total += read;
            if read < prefix {
                return total;
            }
        }

        let aligned = if offset > 0 { first + 1 } else { first };
        let full = (length - prefix) / 8;
        let read = self.read_bytes(&mut buf[aligned..aligned + full]);
        total += read * 8;
        if read < full {
            // Fewer than 8 bits are left; hand over whatever the window holds.
            total += read_bits_into(self, &mut buf[aligned + read], 0, 7);
            return total;
        }

        let suffix = length - prefix - full * 8;
        if suffix > 0 {
            total += read_bits_into(self, &mut buf[aligned + full], 0, suffix);
        }
        total
    }

    /// Append up to `max` bytes to `out`. Returns the number appended.
    fn read_into_vec(&mut self, out: &mut Vec<u8>, max: usize) -> usize {
        let mut read = 0;
        while read < max {
            match self.read() {
                Some(byte) => out.push(byte),
                None => break,
            }
            read += 1;
        }
        read
    }

    /// Discard up to `count` bytes. Returns the number discarded.
    fn skip(&mut self, count: u64) -> u64 {
        let mut skipped = 0;
        while skipped < count && self.read().is_some() {
            skipped += 1;
        }
        skipped
    }
}

fn read_bytes_one_by_one<I: DecoderInput + ?Sized>(input: &mut I, buf: &mut [u8]) -> usize {
    let mut read = 0;
    for slot in buf.iter_mut() {
        match input.read() {
            Some(byte) => *slot = byte,
            None => break,
        }
        read += 1;
    }
    read
}

/// Read up to `length` single bits into `byte`, starting at `bit_index`
/// (0 = most significant). Only the bits actually read are overwritten.
fn read_bits_into<I: DecoderInput + ?Sized>(
    input: &mut I,
    byte: &mut u8,
    bit_index: usize,
    length: usize,
) -> usize {
    let mut value = 0_u8;
    let mut read = 0;
    while read < length {
        let Some(bit) = input.read_bit() else { break };
        value |= bit << (7 - bit_index - read);
        read += 1;
    }
    if read == 0 {
        return 0;
    }

    #[allow(clippy::cast_possible_truncation)]
    let keep = ((0xFF_u16 << (8 - bit_index)) as u8) | ((0xFF_u16 >> (bit_index + read)) as u8);
    *byte = (*byte & keep) | value;
    read
}

impl<I: DecoderInput + ?Sized> DecoderInput for &mut I {
    fn read_bit(&mut self) -> Option<u8> {
        (**self).read_bit()
    }

    fn read(&mut self) -> Option<u8> {
        (**self).read()
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        (**self).read_bytes(buf)
    }

    fn skip(&mut self, count: u64) -> u64 {
        (**self).skip(count)
    }
}

/// Turns any [`ByteSource`] into a [`DecoderInput`].
///
/// Single-bit reads go through a two-byte sliding window: bits are shifted
/// out of the top of the window, and a new source byte is slotted in right
/// below the bits still pending. A byte read while the window is partly
/// consumed therefore takes its high bits from the pending byte and its low
/// bits from the next one.
///
/// ```text
///   window (16 bits)     bits_left
///   ┌────────┬────────┐
///   │ pending│ next   │  0..=15
///   └────────┴────────┘
///    ^ bit 15 is read first
/// ```
///
/// While the window is empty the cursor is byte-aligned and bulk reads go
/// straight to [`ByteSource::next_bytes`].
#[derive(Debug, Clone)]
pub struct BitInput<S> {
    source: S,
    window: u16,
    bits_left: u8,
}

impl<S: ByteSource> BitInput<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            window: 0,
            bits_left: 0,
        }
    }

    /// `true` when no partial byte is pending in the window.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.bits_left == 0
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Access the source, e.g. to append freshly received bytes. A pending
    /// partial byte stays in the window.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    #[must_use]
    pub fn into_inner(self) -> S {
        self.source
    }

    fn refill(&mut self) -> bool {
        let Some(next) = self.source.next_byte() else {
            return false;
        };
        self.window |= u16::from(next) << (8 - self.bits_left);
        self.bits_left += 8;
        true
    }
}

impl<S: ByteSource> DecoderInput for BitInput<S> {
    fn read_bit(&mut self) -> Option<u8> {
        if self.bits_left == 0 && !self.refill() {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        let bit = (self.window >> 15) as u8;
        self.window <<= 1;
        self.bits_left -= 1;
        Some(bit)
    }

    fn read(&mut self) -> Option<u8> {
        if self.bits_left == 0 {
            return self.source.next_byte();
        }
        if !self.refill() {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        let byte = (self.window >> 8) as u8;
        self.window <<= 8;
        self.bits_left -= 8;
        Some(byte)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        if self.bits_left == 0 {
            self.source.next_bytes(buf)
        } else {
            read_bytes_one_by_one(self, buf)
        }
    }

    fn skip(&mut self, count: u64) -> u64 {
        if self.bits_left == 0 {
            return self.source.skip_bytes(count);
        }
        let mut skipped = 0;
        while skipped < count && self.read().is_some() {
            skipped += 1;
        }
        skipped
    }
}

/// An input that is always exhausted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullInput;

impl DecoderInput for NullInput {
    fn read_bit(&mut self) -> Option<u8> {
        None
    }

    fn read(&mut self) -> Option<u8> {
        None
    }
}

/// Input over a fixed byte slice.
#[must_use]
pub fn from_slice(bytes: &[u8]) -> BitInput<SliceSource<'_>> {
    BitInput::new(SliceSource::new(bytes))
}

/// Input over a push-style [`std::io::Read`] stream.
pub fn from_reader<R: std::io::Read>(reader: R) -> BitInput<ReadSource<R>> {
    BitInput::new(ReadSource::new(reader))
}

/// Input over a raw per-byte callback returning `None` when nothing is
/// available.
pub fn from_fn<F: FnMut() -> Option<u8>>(next: F) -> BitInput<FnSource<F>> {
    BitInput::new(FnSource::new(next))
}

/// Input over any [`bytes::Buf`], such as `Bytes` or `&mut BytesMut`.
pub fn from_buf<B: bytes::Buf>(buf: B) -> BitInput<BufSource<B>> {
    BitInput::new(BufSource::new(buf))
}
