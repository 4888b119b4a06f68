#![no_main]

use libfuzzer_sys::fuzz_target;
use trickle_decoders::VarIntDecoder;
use trickle_wire::{DecodeError, Decoder, State};

// Fuzz target: incremental LEB128 decoding.
//
// A varint decoded from the whole input and the same bytes fed one at a
// time must agree, and an accepted varint never exceeds 10 bytes.
fuzz_target!(|data: &[u8]| {
    let whole = VarIntDecoder::new().decode_slice(data);

    let mut decoder = VarIntDecoder::new();
    let mut stepped = State::Processing;
    for (i, byte) in data.iter().enumerate() {
        stepped = decoder.decode_slice(std::slice::from_ref(byte));
        if !stepped.is_processing() {
            assert!(i < 10 || matches!(stepped, State::Error(DecodeError::VarintTooLong)));
            break;
        }
    }
    assert_eq!(whole, stepped);
});
