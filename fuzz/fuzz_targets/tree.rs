#![no_main]

use libfuzzer_sys::fuzz_target;
use trickle_tests::tree_decoder;
use trickle_wire::Decoder;

// Fuzz target: the composed tree decoder on arbitrary bytes.
//
// Catches bugs in:
// - Recursion bookkeeping across nested layers
// - Negative and oversized child counts
// - Invalid UTF-8 labels
// - Reuse of the decoder after an error
fuzz_target!(|data: &[u8]| {
    let mut decoder = tree_decoder();
    if decoder.decode_slice(data).is_error() {
        decoder.reset();
        let _ = decoder.decode_slice(data);
    }
});
