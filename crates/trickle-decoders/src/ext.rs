use trickle_wire::{Decoder, DecoderInput, State};

use crate::fold::{Collect, Fold};
use crate::reduction::{
    ConstantArityReductionDecoder, MarkerEndedReductionDecoder, PrefixedArityReductionDecoder,
};

/// Combinators available on every [`Decoder`].
pub trait DecoderExt: Decoder + Sized {
    /// Transform the decoded value.
    fn map<R, F: FnMut(Self::Output) -> R>(self, f: F) -> Map<Self, F> {
        Map { inner: self, f }
    }

    /// Transform the decoded value into a new state, e.g. to reject it.
    fn map_state<R, F: FnMut(Self::Output) -> State<R>>(self, f: F) -> MapState<Self, F> {
        MapState { inner: self, f }
    }

    /// Decode a value, then decode with the decoder derived from it.
    ///
    /// The derived decoder is built once per value and dropped when it
    /// completes.
    fn and_then<N: Decoder, F: FnMut(Self::Output) -> N>(self, f: F) -> AndThen<Self, F, N> {
        AndThen {
            first: self,
            f,
            next: None,
        }
    }

    /// Decode a presence flag with `nullability`, then the value if present.
    fn optional<B: Decoder<Output = bool>>(self, nullability: B) -> Optional<B, Self> {
        Optional {
            flag: nullability,
            value: self,
            present: None,
        }
    }

    /// Decode `self` then `other` and yield both values.
    fn zip<O: Decoder>(self, other: O) -> Zip<Self, O> {
        Zip {
            first: self,
            second: other,
            pending: None,
        }
    }

    /// A collection of elements decoded by `self`, counted by `size`.
    fn collect_prefixed<F, S>(self, fold: F, size: S) -> PrefixedArityReductionDecoder<S, Self, F>
    where
        F: Fold<Self::Output>,
        S: Decoder,
        S::Output: Into<i128>,
    {
        PrefixedArityReductionDecoder::new(size, self, fold)
    }

    /// Exactly `arity` elements decoded by `self`.
    fn collect_exact<F: Fold<Self::Output>>(
        self,
        fold: F,
        arity: usize,
    ) -> ConstantArityReductionDecoder<Self, F> {
        ConstantArityReductionDecoder::new(self, fold, arity)
    }

    /// Elements decoded by `self` until one satisfies `is_last`.
    fn collect_until<F, P>(
        self,
        fold: F,
        keep_last: bool,
        is_last: P,
    ) -> MarkerEndedReductionDecoder<Self, F, P>
    where
        F: Fold<Self::Output>,
        P: FnMut(&Self::Output) -> bool,
    {
        MarkerEndedReductionDecoder::new(self, fold, keep_last, is_last)
    }

    fn to_vec<S>(self, size: S) -> PrefixedArityReductionDecoder<S, Self, Collect<Vec<Self::Output>>>
    where
        S: Decoder,
        S::Output: Into<i128>,
    {
        self.collect_prefixed(Collect::new(), size)
    }

    fn to_vec_exact(
        self,
        arity: usize,
    ) -> ConstantArityReductionDecoder<Self, Collect<Vec<Self::Output>>> {
        self.collect_exact(Collect::new(), arity)
    }

    fn to_vec_until<P: FnMut(&Self::Output) -> bool>(
        self,
        keep_last: bool,
        is_last: P,
    ) -> MarkerEndedReductionDecoder<Self, Collect<Vec<Self::Output>>, P> {
        self.collect_until(Collect::new(), keep_last, is_last)
    }

    fn boxed<'a>(self) -> Box<dyn Decoder<Output = Self::Output> + 'a>
    where
        Self: 'a,
    {
        Box::new(self)
    }
}

impl<D: Decoder> DecoderExt for D {}

pub struct Map<D, F> {
    inner: D,
    f: F,
}

impl<D: Decoder, R, F: FnMut(D::Output) -> R> Decoder for Map<D, F> {
    type Output = R;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<R> {
        self.inner.decode(input).map(&mut self.f)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

pub struct MapState<D, F> {
    inner: D,
    f: F,
}

impl<D: Decoder, R, F: FnMut(D::Output) -> State<R>> Decoder for MapState<D, F> {
    type Output = R;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<R> {
        self.inner.decode(input).and_then(&mut self.f)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

pub struct AndThen<D, F, N> {
    first: D,
    f: F,
    next: Option<N>,
}

impl<D, F, N> Decoder for AndThen<D, F, N>
where
    D: Decoder,
    N: Decoder,
    F: FnMut(D::Output) -> N,
{
    type Output = N::Output;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<N::Output> {
        let next = match &mut self.next {
            Some(next) => next,
            slot @ None => match self.first.decode(input) {
                State::Done(value) => slot.insert((self.f)(value)),
                other => return other.cast(),
            },
        };
        let state = next.decode(input);
        if state.is_done() {
            self.next = None;
        }
        state
    }

    fn reset(&mut self) {
        self.next = None;
        self.first.reset();
    }
}

pub struct Optional<B, D> {
    flag: B,
    value: D,
    present: Option<bool>,
}

impl<B: Decoder<Output = bool>, D: Decoder> Decoder for Optional<B, D> {
    type Output = Option<D::Output>;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<Option<D::Output>> {
        let present = match self.present {
            Some(present) => present,
            None => match self.flag.decode(input) {
                State::Done(present) => *self.present.insert(present),
                other => return other.cast(),
            },
        };
        if !present {
            self.present = None;
            return State::Done(None);
        }
        let state = self.value.decode(input);
        if state.is_done() {
            self.present = None;
        }
        state.map(Some)
    }

    fn reset(&mut self) {
        self.present = None;
        self.flag.reset();
        self.value.reset();
    }
}

pub struct Zip<A: Decoder, B> {
    first: A,
    second: B,
    pending: Option<A::Output>,
}

impl<A: Decoder, B: Decoder> Decoder for Zip<A, B> {
    type Output = (A::Output, B::Output);

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<Self::Output> {
        let first = match self.pending.take() {
            Some(first) => first,
            None => match self.first.decode(input) {
                State::Done(first) => first,
                other => return other.cast(),
            },
        };
        match self.second.decode(input) {
            State::Done(second) => State::Done((first, second)),
            other => {
                self.pending = Some(first);
                other.cast()
            }
        }
    }

    fn reset(&mut self) {
        self.pending = None;
        self.first.reset();
        self.second.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Endianness, boolean_decoder, byte_decoder, int_decoder, short_decoder};
    use trickle_wire::DecodeError;

    #[test]
    fn map_and_map_state() {
        let mut doubled = byte_decoder().map(|b| u16::from(b) * 2);
        assert_eq!(doubled.decode_slice(&[200]), State::Done(400));

        let mut even = byte_decoder().map_state(|b| {
            if b % 2 == 0 {
                State::Done(b)
            } else {
                State::error("odd")
            }
        });
        assert_eq!(even.decode_slice(&[4]), State::Done(4));
        assert_eq!(even.decode_slice(&[5]), State::error("odd"));
    }

    #[test]
    fn processing_passes_through_map() {
        let mut decoder = short_decoder(Endianness::Big).map(|v| v + 1);
        assert_eq!(decoder.decode_slice(&[0]), State::Processing);
        assert_eq!(decoder.decode_slice(&[1]), State::Done(2));
    }

    #[test]
    fn and_then_derives_the_next_decoder() {
        // A tag byte selects the width of the value that follows.
        let mut decoder = byte_decoder().and_then(|tag| {
            let width = if tag == 0 { 1 } else { 2 };
            byte_decoder().to_vec_exact(width)
        });
        assert_eq!(decoder.decode_slice(&[1, 7]), State::Processing);
        assert_eq!(decoder.decode_slice(&[8]), State::Done(vec![7, 8]));
        assert_eq!(decoder.decode_slice(&[0, 9]), State::Done(vec![9]));
    }

    #[test]
    fn optional_reads_flag_then_value() {
        let mut decoder = int_decoder(Endianness::Big).optional(boolean_decoder());
        assert_eq!(decoder.decode_slice(&[0]), State::Done(None));
        assert_eq!(decoder.decode_slice(&[1, 0, 0]), State::Processing);
        assert_eq!(decoder.decode_slice(&[0, 5]), State::Done(Some(5)));
    }

    #[test]
    fn zip_keeps_the_first_value_across_calls() {
        let mut decoder = byte_decoder().zip(short_decoder(Endianness::Little));
        assert_eq!(decoder.decode_slice(&[1, 2]), State::Processing);
        assert_eq!(decoder.decode_slice(&[1]), State::Done((1, 0x0102)));
    }

    #[test]
    fn vec_shorthands() {
        let mut prefixed = byte_decoder().to_vec(int_decoder(Endianness::Big));
        assert_eq!(prefixed.decode_slice(&[0, 0, 0, 2, 4, 5]), State::Done(vec![4, 5]));

        let mut until = byte_decoder().to_vec_until(false, |b| *b == 0xFF);
        assert_eq!(until.decode_slice(&[1, 2, 0xFF]), State::Done(vec![1, 2]));
    }

    #[test]
    fn errors_are_not_rewrapped() {
        let mut decoder = byte_decoder()
            .to_vec(int_decoder(Endianness::Big))
            .map(|v| v.len());
        assert!(matches!(
            decoder.decode_slice(&[0x80, 0, 0, 0]),
            State::Error(DecodeError::NegativeLength { .. })
        ));
    }

    #[test]
    fn boxed_is_object_safe() {
        let mut decoders: Vec<Box<dyn Decoder<Output = i32>>> = vec![
            byte_decoder().map(i32::from).boxed(),
            int_decoder(Endianness::Little).boxed(),
        ];
        assert_eq!(decoders[0].decode_slice(&[3]), State::Done(3));
        assert_eq!(decoders[1].decode_slice(&[3, 0, 0, 0]), State::Done(3));
    }
}
