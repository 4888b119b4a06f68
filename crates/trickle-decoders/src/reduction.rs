//! Decoders folding a sequence of sub-decoded elements into one value.
//!
//! All three share the same shape: decode elements one by one with a single
//! element decoder, feed each to a [`Fold`], and call the finisher once the
//! terminal condition is reached. The partially filled accumulator and the
//! element count survive `Processing` returns; completing a collection
//! resets the decoder for the next one.

use log::{debug, trace};
use trickle_wire::{DecodeError, Decoder, DecoderInput, State};

use crate::fold::Fold;

/// Convert a decoded size prefix into an element or byte count.
pub(crate) fn to_length(raw: impl Into<i128>) -> Result<usize, DecodeError> {
    let length: i128 = raw.into();
    if length < 0 {
        debug!("rejecting negative size prefix {length}");
        return Err(DecodeError::NegativeLength { length });
    }
    usize::try_from(length).map_err(|_| DecodeError::LengthOverflow { length })
}

/// Decodes exactly `arity` elements.
pub struct ConstantArityReductionDecoder<D: Decoder, F: Fold<D::Output>> {
    element: D,
    fold: F,
    arity: usize,
    acc: Option<F::Acc>,
    index: usize,
}

impl<D: Decoder, F: Fold<D::Output>> ConstantArityReductionDecoder<D, F> {
    pub fn new(element: D, fold: F, arity: usize) -> Self {
        Self {
            element,
            fold,
            arity,
            acc: None,
            index: 0,
        }
    }
}

impl<D: Decoder, F: Fold<D::Output>> Decoder for ConstantArityReductionDecoder<D, F> {
    type Output = F::Output;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<F::Output> {
        let mut acc = match self.acc.take() {
            Some(acc) => acc,
            None => self.fold.supply(),
        };
        while self.index < self.arity {
            match self.element.decode(input) {
                State::Done(element) => {
                    self.fold.accumulate(&mut acc, element);
                    self.index += 1;
                }
                other => {
                    self.acc = Some(acc);
                    return other.cast();
                }
            }
        }
        self.index = 0;
        State::Done(self.fold.finish(acc))
    }

    fn reset(&mut self) {
        self.acc = None;
        self.index = 0;
        self.element.reset();
    }
}

/// Decodes a count with an injected size decoder, then that many elements.
///
/// The size decoder may produce any integer type widening into `i128`. A
/// negative count is reported as [`DecodeError::NegativeLength`] and the
/// decoder resets itself.
pub struct PrefixedArityReductionDecoder<S, D: Decoder, F: Fold<D::Output>> {
    size_decoder: S,
    element: D,
    fold: F,
    arity: Option<usize>,
    acc: Option<F::Acc>,
    index: usize,
}

impl<S, D, F> PrefixedArityReductionDecoder<S, D, F>
where
    S: Decoder,
    S::Output: Into<i128>,
    D: Decoder,
    F: Fold<D::Output>,
{
    pub fn new(size_decoder: S, element: D, fold: F) -> Self {
        Self {
            size_decoder,
            element,
            fold,
            arity: None,
            acc: None,
            index: 0,
        }
    }
}

impl<S, D, F> Decoder for PrefixedArityReductionDecoder<S, D, F>
where
    S: Decoder,
    S::Output: Into<i128>,
    D: Decoder,
    F: Fold<D::Output>,
{
    type Output = F::Output;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<F::Output> {
        let arity = match self.arity {
            Some(arity) => arity,
            None => match self.size_decoder.decode(input) {
                State::Done(raw) => match to_length(raw) {
                    Ok(arity) => {
                        trace!("collection of {arity} elements");
                        *self.arity.insert(arity)
                    }
                    Err(error) => {
                        self.reset();
                        return State::Error(error);
                    }
                },
                other => return other.cast(),
            },
        };

        let mut acc = match self.acc.take() {
            Some(acc) => acc,
            None => self.fold.supply(),
        };
        while self.index < arity {
            match self.element.decode(input) {
                State::Done(element) => {
                    self.fold.accumulate(&mut acc, element);
                    self.index += 1;
                }
                other => {
                    self.acc = Some(acc);
                    return other.cast();
                }
            }
        }
        self.arity = None;
        self.index = 0;
        State::Done(self.fold.finish(acc))
    }

    fn reset(&mut self) {
        self.arity = None;
        self.acc = None;
        self.index = 0;
        self.size_decoder.reset();
        self.element.reset();
    }
}

/// Decodes elements until one satisfies `is_last`.
///
/// With `keep_last` the terminal element is folded like the others;
/// otherwise it is dropped.
pub struct MarkerEndedReductionDecoder<D: Decoder, F: Fold<D::Output>, P> {
    element: D,
    fold: F,
    is_last: P,
    keep_last: bool,
    acc: Option<F::Acc>,
}

impl<D, F, P> MarkerEndedReductionDecoder<D, F, P>
where
    D: Decoder,
    F: Fold<D::Output>,
    P: FnMut(&D::Output) -> bool,
{
    pub fn new(element: D, fold: F, keep_last: bool, is_last: P) -> Self {
        Self {
            element,
            fold,
            is_last,
            keep_last,
            acc: None,
        }
    }
}

impl<D, F, P> Decoder for MarkerEndedReductionDecoder<D, F, P>
where
    D: Decoder,
    F: Fold<D::Output>,
    P: FnMut(&D::Output) -> bool,
{
    type Output = F::Output;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<F::Output> {
        let mut acc = match self.acc.take() {
            Some(acc) => acc,
            None => self.fold.supply(),
        };
        loop {
            match self.element.decode(input) {
                State::Done(element) => {
                    let last = (self.is_last)(&element);
                    if !last || self.keep_last {
                        self.fold.accumulate(&mut acc, element);
                    }
                    if last {
                        return State::Done(self.fold.finish(acc));
                    }
                }
                other => {
                    self.acc = Some(acc);
                    return other.cast();
                }
            }
        }
    }

    fn reset(&mut self) {
        self.acc = None;
        self.element.reset();
    }
}
