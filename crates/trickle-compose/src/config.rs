use trickle_decoders::Endianness;
use trickle_decoders::common::{int_decoder, utf8_string_decoder};
use trickle_wire::Decoder;

/// Configuration of a composed decoder.
///
/// ```text
/// ┌────────────────┬─────────────────────────────────────────────────────┐
/// │ Field          │ Purpose                                             │
/// ├────────────────┼─────────────────────────────────────────────────────┤
/// │ endianness     │ Byte order of the short/int/long/float/double       │
/// │                │ shorthands                                          │
/// │ string_decoder │ Framing of every `string()` call                    │
/// └────────────────┴─────────────────────────────────────────────────────┘
/// ```
///
/// When `string_decoder` is `None`, strings are UTF-8 prefixed by a 4-byte
/// length in the configured byte order.
#[derive(Default)]
pub struct ComposerConfig {
    pub endianness: Endianness,
    pub string_decoder: Option<Box<dyn Decoder<Output = String>>>,
}

impl ComposerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    #[must_use]
    pub fn with_string_decoder(mut self, decoder: impl Decoder<Output = String> + 'static) -> Self {
        self.string_decoder = Some(Box::new(decoder));
        self
    }

    pub(crate) fn into_parts(self) -> (Endianness, Box<dyn Decoder<Output = String>>) {
        let endianness = self.endianness;
        let string: Box<dyn Decoder<Output = String>> = match self.string_decoder {
            Some(decoder) => decoder,
            None => Box::new(utf8_string_decoder(int_decoder(endianness))),
        };
        (endianness, string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trickle_decoders::common::{NUL, utf8_string_decoder_em};
    use trickle_wire::State;

    #[test]
    fn default_strings_follow_the_configured_byte_order() {
        let (endianness, mut string) = ComposerConfig::new()
            .with_endianness(Endianness::Little)
            .into_parts();
        assert_eq!(endianness, Endianness::Little);
        assert_eq!(string.decode_slice(&[2, 0, 0, 0, b'o', b'k']), State::Done("ok".to_owned()));
    }

    #[test]
    fn explicit_string_decoder_wins() {
        let (_, mut string) = ComposerConfig::new()
            .with_string_decoder(utf8_string_decoder_em(NUL).unwrap())
            .into_parts();
        assert_eq!(string.decode_slice(b"hi\0"), State::Done("hi".to_owned()));
    }
}
