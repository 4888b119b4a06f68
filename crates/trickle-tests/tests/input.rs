//! Bit-level reads and reusable buffers driving real decoders.

use bytes::{BufMut, BytesMut};
use trickle_decoders::common::{Endianness, NUL, int_decoder, utf8_string_decoder_em};
use trickle_wire::{BitInput, Decoder, DecoderInput, FeedBuffer, State, input};

#[test]
fn decoder_after_single_bits_reads_unaligned() {
    // 3 flag bits, then a big-endian int starting mid-byte.
    let value = 0x1234_5678_u32;
    let shifted = (u64::from(0b101_u8) << 61) | (u64::from(value) << 29);
    let bytes = shifted.to_be_bytes();

    let mut input = input::from_slice(&bytes);
    let flags: Vec<u8> = (0..3).filter_map(|_| input.read_bit()).collect();
    assert_eq!(flags, vec![1, 0, 1]);
    assert_eq!(
        int_decoder(Endianness::Big).decode(&mut input),
        State::Done(0x1234_5678)
    );
    assert!(!input.is_aligned());
}

#[test]
fn feed_buffer_reused_between_calls() {
    let mut input = BitInput::new(FeedBuffer::new(4));
    let mut decoder = utf8_string_decoder_em(NUL).unwrap();
    let mut states = Vec::new();
    for piece in [&b"abc"[..], &b"def"[..], &b"g\0"[..]] {
        assert_eq!(input.source_mut().feed(piece), piece.len());
        states.push(decoder.decode(&mut input));
        assert!(input.source().is_empty());
    }
    assert_eq!(
        states,
        vec![State::Processing, State::Processing, State::Done("abcdefg".to_owned())]
    );
    assert_eq!(input.source().capacity(), 4);
}

#[test]
fn bytes_mut_refilled_between_calls() {
    let mut pending = BytesMut::new();
    let mut decoder = int_decoder(Endianness::Little);

    pending.put_slice(&[0x10, 0x20]);
    assert_eq!(decoder.decode(&mut input::from_buf(&mut pending)), State::Processing);
    pending.put_slice(&[0x30, 0x40, 0xFF]);
    assert_eq!(
        decoder.decode(&mut input::from_buf(&mut pending)),
        State::Done(0x4030_2010)
    );
    assert_eq!(&pending[..], &[0xFF]);
}

#[test]
fn read_bits_reports_partial_counts() {
    let mut input = input::from_slice(&[0xFF, 0x00, 0xAB]);
    let mut buf = [0_u8; 4];
    assert_eq!(input.read_bits(&mut buf, 4, 16), 16);
    assert_eq!(buf[..3], [0x0F, 0xF0, 0x00]);
    // 8 bits remain, 20 are requested.
    assert_eq!(input.read_bits(&mut buf, 0, 20), 8);
    assert_eq!(buf[0], 0xAB);
}
