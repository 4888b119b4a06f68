#![no_main]

use libfuzzer_sys::fuzz_target;
use trickle_decoders::common::utf8_string_decoder_em;
use trickle_wire::{Decoder, State};

// Fuzz target: marker-terminated strings over arbitrary bytes.
//
// The first byte picks a marker length of 1 to 4; the marker bytes follow,
// then the payload. A decoded string never contains the marker and the
// result does not depend on where the payload is split.
fuzz_target!(|data: &[u8]| {
    let Some((&len, rest)) = data.split_first() else {
        return;
    };
    let len = usize::from(len % 4) + 1;
    if rest.len() < len {
        return;
    }
    let (marker, payload) = rest.split_at(len);

    let Ok(mut decoder) = utf8_string_decoder_em(marker) else {
        return;
    };
    let whole = decoder.decode_slice(payload);
    if let State::Done(text) = &whole {
        assert!(!text.as_bytes().windows(len).any(|w| w == marker));
    }

    decoder.reset();
    let split = payload.len() / 2;
    let first = decoder.decode_slice(&payload[..split]);
    let split_state = if first.is_processing() {
        decoder.decode_slice(&payload[split..])
    } else {
        first
    };
    assert_eq!(whole, split_state);
});
