use crate::input::{self, DecoderInput};
use crate::state::State;

/// A stateful, resumable decoder of values of type [`Output`](Self::Output).
///
/// A decoder is created once and fed many times. Each call to
/// [`decode`](Self::decode) consumes as many bytes as the input can give
/// right now and returns:
///
///   - `Done(value)` once a value is complete. The decoder has already
///     reset itself and the next call starts a new value.
///   - `Processing` when the input ran dry first. Whatever was read so far
///     stays inside the decoder for the next call.
///   - `Error(cause)` on malformed data. The internal state is then
///     unspecified and [`reset`](Self::reset) must be called before reuse.
///
/// Decoders are not meant to be shared between concurrent callers: keep
/// one instance per connection or per stream.
pub trait Decoder {
    type Output;

    /// Continue decoding from `input`.
    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<Self::Output>;

    /// Discard any in-flight progress unconditionally.
    fn reset(&mut self);

    /// Decode from a byte slice.
    ///
    /// Bytes left over after a `Done` are dropped with the temporary input,
    /// so this is meant for slices holding exactly one encoded value or for
    /// feeding successive chunks of a single value.
    fn decode_slice(&mut self, bytes: &[u8]) -> State<Self::Output> {
        self.decode(&mut input::from_slice(bytes))
    }
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    type Output = D::Output;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<Self::Output> {
        (**self).decode(input)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

impl<D: Decoder + ?Sized> Decoder for &mut D {
    type Output = D::Output;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<Self::Output> {
        (**self).decode(input)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}
