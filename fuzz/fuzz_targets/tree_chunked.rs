#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use trickle_tests::{decode_chunked, tree_decoder};
use trickle_wire::Decoder;

#[derive(Arbitrary, Debug)]
struct Input {
    chunk: u8,
    bytes: Vec<u8>,
}

// Fuzz target: chunking never changes the decoded tree.
//
// Decodes the bytes whole and in fuzzer-sized chunks. The first settled
// state of the chunked run must equal the whole-input result.
fuzz_target!(|input: Input| {
    let whole = tree_decoder().decode_slice(&input.bytes);
    if whole.is_processing() {
        return;
    }

    let mut decoder = tree_decoder();
    let chunk = usize::from(input.chunk.max(1));
    let settled = decode_chunked(&mut decoder, &input.bytes, chunk)
        .into_iter()
        .find(|state| !state.is_processing());
    assert_eq!(settled, Some(whole));
});
