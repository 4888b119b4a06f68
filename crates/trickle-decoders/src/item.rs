use std::collections::VecDeque;
use std::marker::PhantomData;

use trickle_wire::{DecodeError, Decoder, DecoderInput, State};

use crate::reduction::to_length;

/// Upper bound on how much a length-prefixed payload grows per read, so a
/// hostile size prefix cannot make us allocate gigabytes up front.
const GROWTH_STEP: usize = 4096;

/// Decodes values occupying exactly `N` bytes.
///
/// Each call reads as many bytes as are available into an internal buffer
/// at the current offset. Once the buffer is full it is handed to the
/// converter, the offset goes back to 0 and the value is returned.
///
/// A zero-length decoder never touches the input and is `Done` on every
/// call, which makes it the building block for constant values.
pub struct ConstantSizedItemDecoder<T, F> {
    buf: Box<[u8]>,
    index: usize,
    convert: F,
    _output: PhantomData<fn() -> T>,
}

impl<T, F: FnMut(&[u8]) -> T> ConstantSizedItemDecoder<T, F> {
    pub fn new(size: usize, convert: F) -> Self {
        Self {
            buf: vec![0; size].into_boxed_slice(),
            index: 0,
            convert,
            _output: PhantomData,
        }
    }
}

impl<T, F: FnMut(&[u8]) -> T> Decoder for ConstantSizedItemDecoder<T, F> {
    type Output = T;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<T> {
        if self.buf.is_empty() {
            return State::Done((self.convert)(&self.buf));
        }

        self.index += input.read_bytes(&mut self.buf[self.index..]);
        if self.index == self.buf.len() {
            self.index = 0;
            State::Done((self.convert)(&self.buf))
        } else {
            State::Processing
        }
    }

    fn reset(&mut self) {
        self.index = 0;
    }
}

/// Decodes a variable-length payload terminated by a fixed marker.
///
/// The last `marker.len()` bytes read are kept in a lookahead window. Each
/// new byte pushes the oldest windowed byte into the payload; when the
/// window equals the marker, the payload collected so far (without the
/// marker) goes to the converter.
///
/// Without a [`limit`](Self::with_limit) the decoder keeps waiting for the
/// marker indefinitely, holding every byte seen in memory.
pub struct MarkerEndedItemDecoder<T, F> {
    marker: Box<[u8]>,
    window: VecDeque<u8>,
    content: Vec<u8>,
    limit: Option<usize>,
    convert: F,
    _output: PhantomData<fn() -> T>,
}

impl<T, F: FnMut(&[u8]) -> Result<T, DecodeError>> MarkerEndedItemDecoder<T, F> {
    /// # Errors
    ///
    /// Returns [`DecodeError::EmptyMarker`] if `marker` is empty.
    pub fn new(marker: &[u8], convert: F) -> Result<Self, DecodeError> {
        if marker.is_empty() {
            return Err(DecodeError::EmptyMarker);
        }
        Ok(Self {
            marker: marker.into(),
            window: VecDeque::with_capacity(marker.len()),
            content: Vec::new(),
            limit: None,
            convert,
            _output: PhantomData,
        })
    }

    /// Fail with [`DecodeError::MarkerTooLong`] once the payload exceeds
    /// `limit` bytes without the marker showing up.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn marker(&self) -> &[u8] {
        &self.marker
    }
}

impl<T, F: FnMut(&[u8]) -> Result<T, DecodeError>> Decoder for MarkerEndedItemDecoder<T, F> {
    type Output = T;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<T> {
        while self.window.len() < self.marker.len() {
            let Some(byte) = input.read() else {
                return State::Processing;
            };
            self.window.push_back(byte);
        }

        while !self.window.iter().eq(self.marker.iter()) {
            let Some(byte) = input.read() else {
                return State::Processing;
            };
            if let Some(oldest) = self.window.pop_front() {
                self.content.push(oldest);
            }
            self.window.push_back(byte);

            if let Some(limit) = self.limit {
                if self.content.len() > limit {
                    self.reset();
                    return State::Error(DecodeError::MarkerTooLong { limit });
                }
            }
        }

        let state = (self.convert)(&self.content).into();
        self.reset();
        state
    }

    fn reset(&mut self) {
        self.window.clear();
        self.content.clear();
    }
}

/// Decodes a size with an injected decoder, then that many raw bytes.
///
/// A negative size is reported as [`DecodeError::NegativeLength`] and the
/// decoder resets itself, so the next call starts on a fresh size prefix.
pub struct PrefixedSizeItemDecoder<S, T, F> {
    size_decoder: S,
    size: Option<usize>,
    content: Vec<u8>,
    convert: F,
    _output: PhantomData<fn() -> T>,
}

impl<S, T, F> PrefixedSizeItemDecoder<S, T, F>
where
    S: Decoder,
    S::Output: Into<i128>,
    F: FnMut(&[u8]) -> Result<T, DecodeError>,
{
    pub fn new(size_decoder: S, convert: F) -> Self {
        Self {
            size_decoder,
            size: None,
            content: Vec::new(),
            convert,
            _output: PhantomData,
        }
    }
}

impl<S, T, F> Decoder for PrefixedSizeItemDecoder<S, T, F>
where
    S: Decoder,
    S::Output: Into<i128>,
    F: FnMut(&[u8]) -> Result<T, DecodeError>,
{
    type Output = T;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<T> {
        let size = match self.size {
            Some(size) => size,
            None => match self.size_decoder.decode(input) {
                State::Done(raw) => match to_length(raw) {
                    Ok(size) => *self.size.insert(size),
                    Err(error) => {
                        self.reset();
                        return State::Error(error);
                    }
                },
                other => return other.cast(),
            },
        };

        while self.content.len() < size {
            let start = self.content.len();
            let step = (size - start).min(GROWTH_STEP);
            self.content.resize(start + step, 0);
            let read = input.read_bytes(&mut self.content[start..]);
            self.content.truncate(start + read);
            if read < step {
                return State::Processing;
            }
        }

        let state = (self.convert)(&self.content).into();
        self.size = None;
        self.content.clear();
        state
    }

    fn reset(&mut self) {
        self.size = None;
        self.content.clear();
        self.size_decoder.reset();
    }
}

/// A decoder that always fails with the error produced by its factory.
pub struct NothingDecoder<T, F> {
    error: F,
    _output: PhantomData<fn() -> T>,
}

impl<T, F: FnMut() -> DecodeError> NothingDecoder<T, F> {
    pub fn new(error: F) -> Self {
        Self {
            error,
            _output: PhantomData,
        }
    }
}

impl<T, F: FnMut() -> DecodeError> Decoder for NothingDecoder<T, F> {
    type Output = T;

    fn decode(&mut self, _input: &mut dyn DecoderInput) -> State<T> {
        State::Error((self.error)())
    }

    fn reset(&mut self) {}
}

/// A zero-length decoder yielding whatever its producer returns, without
/// reading the input.
pub struct ConstantDecoder<T, F> {
    produce: F,
    _output: PhantomData<fn() -> T>,
}

impl<T, F: FnMut() -> T> ConstantDecoder<T, F> {
    pub fn new(produce: F) -> Self {
        Self {
            produce,
            _output: PhantomData,
        }
    }
}

impl<T, F: FnMut() -> T> Decoder for ConstantDecoder<T, F> {
    type Output = T;

    fn decode(&mut self, _input: &mut dyn DecoderInput) -> State<T> {
        State::Done((self.produce)())
    }

    fn reset(&mut self) {}
}

/// A decoder that always fails with `message`.
pub fn nothing<T>(message: impl Into<String>) -> impl Decoder<Output = T> {
    let message = message.into();
    NothingDecoder::new(move || DecodeError::Message(message.clone()))
}
