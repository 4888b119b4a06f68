use std::collections::HashMap;

use trickle_wire::{DecodeError, Decoder, State};

use crate::ext::DecoderExt;
use crate::item::{
    ConstantDecoder, ConstantSizedItemDecoder, MarkerEndedItemDecoder, PrefixedSizeItemDecoder,
};

/// Byte order of fixed-width scalars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

/// Converter from raw bytes to a decoded value, as stored in the decoders
/// built here.
pub type Convert<T> = fn(&[u8]) -> T;
pub type TryConvert<T> = fn(&[u8]) -> Result<T, DecodeError>;

pub type FixedDecoder<T> = ConstantSizedItemDecoder<T, Convert<T>>;
pub type ByteDecoder = FixedDecoder<u8>;
pub type ShortDecoder = FixedDecoder<i16>;
pub type IntDecoder = FixedDecoder<i32>;
pub type LongDecoder = FixedDecoder<i64>;
pub type FloatDecoder = FixedDecoder<f32>;
pub type DoubleDecoder = FixedDecoder<f64>;
pub type BooleanDecoder = FixedDecoder<bool>;

/// Length-prefixed string decoder over the size decoder `S`.
pub type StringDecoder<S> = PrefixedSizeItemDecoder<S, String, TryConvert<String>>;
/// Marker-terminated string decoder.
pub type MarkerStringDecoder = MarkerEndedItemDecoder<String, TryConvert<String>>;

/// Default end marker of UTF-8 and ASCII strings.
pub const NUL: &[u8] = &[0];
/// Default end marker of UTF-16 strings: one NUL code unit.
pub const NUL_UTF16: &[u8] = &[0, 0];

fn fixed<T>(size: usize, convert: Convert<T>) -> FixedDecoder<T> {
    ConstantSizedItemDecoder::new(size, convert)
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0; N];
    out.copy_from_slice(bytes);
    out
}

#[must_use]
pub fn byte_decoder() -> ByteDecoder {
    fixed(1, |b| b[0])
}

/// One byte, `0` is `false` and anything else `true`.
#[must_use]
pub fn boolean_decoder() -> BooleanDecoder {
    fixed(1, |b| b[0] != 0)
}

macro_rules! endian_decoders {
    ($($name:ident => $ty:ty;)*) => {$(
        #[must_use]
        pub fn $name(endianness: Endianness) -> FixedDecoder<$ty> {
            const SIZE: usize = std::mem::size_of::<$ty>();
            match endianness {
                Endianness::Big => fixed(SIZE, |b| <$ty>::from_be_bytes(array(b))),
                Endianness::Little => fixed(SIZE, |b| <$ty>::from_le_bytes(array(b))),
            }
        }
    )*};
}

endian_decoders! {
    short_decoder => i16;
    int_decoder => i32;
    long_decoder => i64;
    float_decoder => f32;
    double_decoder => f64;
    u16_decoder => u16;
    u32_decoder => u32;
    u64_decoder => u64;
}

fn utf8(bytes: &[u8]) -> Result<String, DecodeError> {
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn ascii(bytes: &[u8]) -> Result<String, DecodeError> {
    if let Some(offset) = bytes.iter().position(|b| !b.is_ascii()) {
        return Err(DecodeError::InvalidAscii {
            byte: bytes[offset],
            offset,
        });
    }
    Ok(bytes.iter().map(|&b| char::from(b)).collect())
}

/// UTF-16 honouring a leading byte order mark; big-endian without one.
fn utf16(bytes: &[u8]) -> Result<String, DecodeError> {
    let (little, body) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (true, rest),
        [0xFE, 0xFF, rest @ ..] => (false, rest),
        _ => (false, bytes),
    };
    if body.len() % 2 != 0 {
        return Err(DecodeError::InvalidUtf16);
    }
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            let pair = [pair[0], pair[1]];
            if little {
                u16::from_le_bytes(pair)
            } else {
                u16::from_be_bytes(pair)
            }
        })
        .collect();
    String::from_utf16(&units).map_err(|_| DecodeError::InvalidUtf16)
}

/// UTF-8 string prefixed by its byte length.
pub fn utf8_string_decoder<S>(size: S) -> StringDecoder<S>
where
    S: Decoder,
    S::Output: Into<i128>,
{
    PrefixedSizeItemDecoder::new(size, utf8)
}

/// UTF-8 string followed by `marker` (usually [`NUL`]).
///
/// # Errors
///
/// Returns [`DecodeError::EmptyMarker`] if `marker` is empty.
pub fn utf8_string_decoder_em(marker: &[u8]) -> Result<MarkerStringDecoder, DecodeError> {
    MarkerEndedItemDecoder::new(marker, utf8)
}

/// ASCII string prefixed by its byte length.
pub fn ascii_string_decoder<S>(size: S) -> StringDecoder<S>
where
    S: Decoder,
    S::Output: Into<i128>,
{
    PrefixedSizeItemDecoder::new(size, ascii)
}

/// ASCII string followed by `marker` (usually [`NUL`]).
///
/// # Errors
///
/// Returns [`DecodeError::EmptyMarker`] if `marker` is empty.
pub fn ascii_string_decoder_em(marker: &[u8]) -> Result<MarkerStringDecoder, DecodeError> {
    MarkerEndedItemDecoder::new(marker, ascii)
}

/// UTF-16 string prefixed by its byte length.
pub fn utf16_string_decoder<S>(size: S) -> StringDecoder<S>
where
    S: Decoder,
    S::Output: Into<i128>,
{
    PrefixedSizeItemDecoder::new(size, utf16)
}

/// UTF-16 string followed by `marker` (usually [`NUL_UTF16`]).
///
/// The marker is matched bytewise, not per code unit.
///
/// # Errors
///
/// Returns [`DecodeError::MarkerTooShort`] if `marker` is shorter than one
/// code unit.
pub fn utf16_string_decoder_em(marker: &[u8]) -> Result<MarkerStringDecoder, DecodeError> {
    if marker.len() < 2 {
        return Err(DecodeError::MarkerTooShort {
            min: 2,
            actual: marker.len(),
        });
    }
    MarkerEndedItemDecoder::new(marker, utf16)
}

/// Enum variant designated by its position in `variants`.
pub fn ordinal_decoder<T, D>(variants: Vec<T>, ordinal: D) -> impl Decoder<Output = T>
where
    T: Clone,
    D: Decoder,
    D::Output: Into<i64>,
{
    ordinal.map_state(move |raw| {
        let ordinal: i64 = raw.into();
        usize::try_from(ordinal)
            .ok()
            .and_then(|index| variants.get(index))
            .cloned()
            .map_or_else(
                || {
                    State::Error(DecodeError::InvalidOrdinal {
                        ordinal,
                        count: variants.len(),
                    })
                },
                State::Done,
            )
    })
}

/// Enum variant designated by name.
pub fn named_decoder<T, N, D>(
    variants: impl IntoIterator<Item = (N, T)>,
    name: D,
) -> impl Decoder<Output = T>
where
    T: Clone,
    N: Into<String>,
    D: Decoder<Output = String>,
{
    let table: HashMap<String, T> = variants
        .into_iter()
        .map(|(name, value)| (name.into(), value))
        .collect();
    name.map_state(move |name| match table.get(&name) {
        Some(value) => State::Done(value.clone()),
        None => State::Error(DecodeError::UnknownName { name }),
    })
}

/// Always `Done(value)`, reading nothing.
pub fn constant<T: Clone>(value: T) -> impl Decoder<Output = T> {
    ConstantDecoder::new(move || value.clone())
}

/// Always `Done(())`, reading nothing.
#[must_use]
pub fn no_op() -> impl Decoder<Output = ()> {
    ConstantSizedItemDecoder::new(0, |_| ())
}

/// Always `Done(None)`, reading nothing.
#[must_use]
pub fn none<T>() -> impl Decoder<Output = Option<T>> {
    ConstantSizedItemDecoder::new(0, |_| None)
}
