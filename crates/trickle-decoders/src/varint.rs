use trickle_wire::{DecodeError, Decoder, DecoderInput, State};

/// Maximum number of bytes a u64 varint can occupy.
/// ceil(64 / 7) = 10 bytes.
const MAX_VARINT_BYTES: usize = 10;

/// Incremental unsigned LEB128 decoder.
///
/// Each byte carries 7 data bits, least significant group first; a set MSB
/// means another byte follows. Bytes are consumed one at a time, so the
/// value may be split anywhere across calls.
///
/// | Value   | Encoded bytes        |
/// |---------|----------------------|
/// | 0       | `[0x00]`             |
/// | 127     | `[0x7F]`             |
/// | 128     | `[0x80, 0x01]`       |
/// | 300     | `[0xAC, 0x02]`       |
/// | 16384   | `[0x80, 0x80, 0x01]` |
///
/// The output is a `u64`, so this decoder works as the size decoder of any
/// length-prefixed decoder.
#[derive(Debug, Clone, Default)]
pub struct VarIntDecoder {
    value: u64,
    shift: u32,
    consumed: usize,
}

impl VarIntDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for VarIntDecoder {
    type Output = u64;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<u64> {
        loop {
            if self.consumed >= MAX_VARINT_BYTES {
                self.reset();
                return State::Error(DecodeError::VarintTooLong);
            }
            let Some(byte) = input.read() else {
                return State::Processing;
            };
            self.consumed += 1;
            // The tenth byte holds bit 63 only.
            if self.consumed == MAX_VARINT_BYTES && byte > 1 {
                self.reset();
                return State::Error(DecodeError::VarintTooLong);
            }

            // Extract the 7 data bits and shift them into position
            self.value |= u64::from(byte & 0x7F) << self.shift;
            self.shift += 7;

            // If MSB is clear, this is the last byte
            if byte & 0x80 == 0 {
                let value = self.value;
                self.reset();
                return State::Done(value);
            }
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_encodings() {
        let cases: &[(&[u8], u64)] = &[
            (&[0x00], 0),
            (&[0x01], 1),
            (&[0x7F], 127),
            (&[0x80, 0x01], 128),
            (&[0xAC, 0x02], 300),
            (&[0xFF, 0x7F], 16383),
            (&[0x80, 0x80, 0x01], 16384),
        ];
        let mut decoder = VarIntDecoder::new();
        for &(bytes, value) in cases {
            assert_eq!(decoder.decode_slice(bytes), State::Done(value), "{bytes:02X?}");
        }
    }

    #[test]
    fn u64_max_spans_ten_bytes() {
        let mut bytes = vec![0xFF; 9];
        bytes.push(0x01);
        assert_eq!(VarIntDecoder::new().decode_slice(&bytes), State::Done(u64::MAX));
    }

    #[test]
    fn tenth_byte_above_bit_63_is_an_error() {
        let mut decoder = VarIntDecoder::new();
        let mut bytes = vec![0xFF; 9];
        bytes.push(0x7F);
        let state = decoder.decode_slice(&bytes);
        assert!(matches!(state, State::Error(DecodeError::VarintTooLong)));

        bytes[9] = 0x02;
        assert!(decoder.decode_slice(&bytes).is_error());
        assert_eq!(decoder.decode_slice(&[0x2A]), State::Done(42));
    }

    #[test]
    fn split_between_calls() {
        let mut decoder = VarIntDecoder::new();
        assert_eq!(decoder.decode_slice(&[0xAC]), State::Processing);
        assert_eq!(decoder.decode_slice(&[0x02]), State::Done(300));
    }

    #[test]
    fn eleventh_byte_is_an_error() {
        let mut decoder = VarIntDecoder::new();
        let state = decoder.decode_slice(&[0x80; 11]);
        assert!(matches!(state, State::Error(DecodeError::VarintTooLong)));
        assert_eq!(decoder.decode_slice(&[0x05]), State::Done(5));
    }
}
