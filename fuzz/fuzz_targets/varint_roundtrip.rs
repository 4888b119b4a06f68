#![no_main]

use libfuzzer_sys::fuzz_target;
use trickle_decoders::VarIntDecoder;
use trickle_wire::{Decoder, State};

// Fuzz target: varint encode->decode roundtrip.
//
// Encodes an arbitrary u64 as LEB128 and decodes it back, whole and with
// the encoding split at the fuzzer-chosen position.
fuzz_target!(|input: (u64, u8)| {
    let (value, split) = input;
    let mut encoded = Vec::with_capacity(10);
    let mut rest = value;
    loop {
        let byte = (rest & 0x7F) as u8;
        rest >>= 7;
        if rest == 0 {
            encoded.push(byte);
            break;
        }
        encoded.push(byte | 0x80);
    }

    assert_eq!(VarIntDecoder::new().decode_slice(&encoded), State::Done(value));

    let split = usize::from(split) % encoded.len();
    let mut decoder = VarIntDecoder::new();
    if split > 0 {
        assert_eq!(decoder.decode_slice(&encoded[..split]), State::Processing);
    }
    assert_eq!(decoder.decode_slice(&encoded[split..]), State::Done(value));
});
