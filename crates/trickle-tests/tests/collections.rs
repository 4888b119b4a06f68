//! Length-prefixed and marker-terminated payloads and collections.
//!
//! Covers the framing rules shared by strings and collections:
//!
//! - A negative size prefix is a data error reported as `Error`, and the
//!   decoder is usable again after `reset()`.
//! - A marker-terminated value split anywhere, including inside the
//!   marker, decodes to the same value.
//! - Nested collections keep each level's partial accumulator across
//!   suspensions.

use std::collections::BTreeMap;

use trickle_decoders::common::{
    Endianness, NUL, byte_decoder, int_decoder, short_decoder, utf8_string_decoder,
    utf8_string_decoder_em,
};
use trickle_decoders::fold::{Collect, fold_with};
use trickle_decoders::{DecoderExt, MarkerEndedItemDecoder, VarIntDecoder};
use trickle_tests::decode_chunked;
use trickle_wire::{DecodeError, Decoder, State};

#[test]
fn negative_collection_size_then_reset() {
    let mut decoder = short_decoder(Endianness::Big).to_vec(int_decoder(Endianness::Big));
    let state = decoder.decode_slice(&(-1_i32).to_be_bytes());
    assert!(matches!(state, State::Error(DecodeError::NegativeLength { length: -1 })));

    decoder.reset();
    assert_eq!(decoder.decode_slice(&[0, 0, 0, 1, 0, 5]), State::Done(vec![5]));
}

#[test]
fn negative_string_size_then_reset() {
    let mut decoder = utf8_string_decoder(int_decoder(Endianness::Little));
    assert!(decoder.decode_slice(&[0xFF, 0xFF, 0xFF, 0xFF]).is_error());
    decoder.reset();
    assert_eq!(decoder.decode_slice(&[1, 0, 0, 0, b'x']), State::Done("x".to_owned()));
}

#[test]
fn marker_string_split_everywhere() {
    let bytes = b"Hello\0";
    for split in 1..bytes.len() {
        let mut decoder = utf8_string_decoder_em(NUL).unwrap();
        assert_eq!(decoder.decode_slice(&bytes[..split]), State::Processing);
        assert_eq!(decoder.decode_slice(&bytes[split..]), State::Done("Hello".to_owned()));
    }
}

#[test]
fn multi_byte_marker_split_inside_the_marker() {
    let marker = b"\r\n\r\n";
    let mut decoder = MarkerEndedItemDecoder::new(marker, |b| Ok(b.to_vec())).unwrap();
    let states = decode_chunked(&mut decoder, b"GET / HTTP/1.1\r\n\r\n", 3);
    let (last, rest) = states.split_last().unwrap();
    assert!(rest.iter().all(State::is_processing));
    assert_eq!(*last, State::Done(b"GET / HTTP/1.1".to_vec()));
}

#[test]
fn string_list_fed_byte_by_byte() {
    let mut bytes = vec![0, 0, 0, 3];
    for word in ["one", "two", "three"] {
        bytes.push(u8::try_from(word.len()).unwrap());
        bytes.extend_from_slice(word.as_bytes());
    }
    let mut decoder = utf8_string_decoder(byte_decoder()).to_vec(int_decoder(Endianness::Big));
    let states = decode_chunked(&mut decoder, &bytes, 1);
    assert_eq!(
        states.last(),
        Some(&State::Done(vec!["one".to_owned(), "two".to_owned(), "three".to_owned()]))
    );
    assert_eq!(states.iter().filter(|s| s.is_done()).count(), 1);
}

#[test]
fn nested_collections_across_chunks() {
    // [[1, 2], [], [3]] with varint counts.
    let bytes = [3, 2, 1, 2, 0, 1, 3];
    let expected = vec![vec![1_u8, 2], vec![], vec![3]];
    for chunk in 1..=bytes.len() {
        let mut decoder = byte_decoder()
            .to_vec(VarIntDecoder::new())
            .to_vec(VarIntDecoder::new());
        let states = decode_chunked(&mut decoder, &bytes, chunk);
        assert_eq!(states.last(), Some(&State::Done(expected.clone())), "chunk {chunk}");
    }
}

#[test]
fn map_from_pairs() {
    let pair = utf8_string_decoder_em(NUL).unwrap().zip(byte_decoder());
    let mut decoder = pair.collect_exact(Collect::<BTreeMap<String, u8>>::new(), 2);
    let state = decoder.decode_slice(b"a\0\x01b\0\x02");
    let map = state.get().unwrap();
    assert_eq!(map.get("a"), Some(&1));
    assert_eq!(map.get("b"), Some(&2));
}

#[test]
fn terminated_sequence_with_custom_fold() {
    let sum = fold_with(|| 0_u32, |acc, b: u8| *acc += u32::from(b), |acc| acc);
    let mut decoder = byte_decoder().collect_until(sum, false, |b| *b == 0);
    assert_eq!(decoder.decode_slice(&[10, 20]), State::Processing);
    assert_eq!(decoder.decode_slice(&[30, 0, 99]), State::Done(60));
}
