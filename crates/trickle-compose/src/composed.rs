use std::marker::PhantomData;
use std::rc::Rc;

use log::{debug, trace};
use trickle_wire::{Decoder, DecoderInput, State};

use crate::config::ComposerConfig;
use crate::scope::{Descent, DecodingScope, Interrupt, Shared, ShorthandCache};

/// A decoder assembled from a builder over a [`DecodingScope`].
///
/// Every decode call replays the builder against the current accumulator
/// layer until it either returns the outermost value or is interrupted:
///
/// ```text
///   ┌──────────► Replaying ──── Ok, base layer ────► Done (accumulator cleared)
///   │              │  │  │
///   │ close layer, │  │  └─ Failed ──────────► Error
///   │  push value  │  └──── Suspended ───────► Processing (progress kept)
///   │              │
///   ├── Ok, nested ┘
///   └── Recursion: push a fresh layer, or reopen a closed one
/// ```
///
/// Nested values of the composed type are decoded by running the builder
/// in a layer of their own, so the depth of a recursive structure is
/// bounded by memory rather than by the call stack. A closed layer stays
/// at the position of its value in the parent; when a later run of the
/// parent needs the value again, the layer is reopened and replayed, so a
/// nested value is never copied.
pub struct ComposedDecoder<E, B> {
    builder: B,
    shared: Rc<Shared>,
    cache: ShorthandCache,
    _output: PhantomData<fn() -> E>,
}

/// Build a composed decoder with the default configuration: big-endian
/// scalars and UTF-8 strings prefixed by a 4-byte length.
pub fn composed_decoder<E, B>(builder: B) -> ComposedDecoder<E, B>
where
    E: 'static,
    B: FnMut(&mut DecodingScope<'_, E>) -> Result<E, Interrupt>,
{
    composed_decoder_with(ComposerConfig::default(), builder)
}

pub fn composed_decoder_with<E, B>(config: ComposerConfig, builder: B) -> ComposedDecoder<E, B>
where
    E: 'static,
    B: FnMut(&mut DecodingScope<'_, E>) -> Result<E, Interrupt>,
{
    let (endianness, string) = config.into_parts();
    ComposedDecoder {
        builder,
        shared: Rc::default(),
        cache: ShorthandCache::new(endianness, string),
        _output: PhantomData,
    }
}

impl<E, B> Decoder for ComposedDecoder<E, B>
where
    E: 'static,
    B: FnMut(&mut DecodingScope<'_, E>) -> Result<E, Interrupt>,
{
    type Output = E;

    fn decode(&mut self, input: &mut dyn DecoderInput) -> State<E> {
        loop {
            let mut scope = DecodingScope::new(&mut *input, &self.shared, &mut self.cache);
            let outcome = (self.builder)(&mut scope);
            let mut accumulator = self.shared.accumulator.borrow_mut();
            match outcome {
                Ok(value) if accumulator.is_last_layer() => {
                    debug!("composed value complete after {} elements", accumulator.len());
                    accumulator.reset();
                    return State::Done(value);
                }
                Ok(value) => {
                    let layer = accumulator.close_layer();
                    accumulator.push_nested(value, layer);
                }
                Err(Interrupt::Suspended) => {
                    trace!("suspended at depth {}", accumulator.depth());
                    return State::Processing;
                }
                Err(Interrupt::Recursion) => match self.shared.take_descent() {
                    Some(Descent::Fresh) => accumulator.recurse(),
                    Some(Descent::Rebuild(layer)) => accumulator.restore(layer),
                    None => panic!(
                        "builder returned Interrupt::Recursion without a pending nested decode"
                    ),
                },
                Err(Interrupt::Failed(error)) => {
                    debug!("composed decode aborted: {error}");
                    return State::Error(error);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.shared.accumulator.borrow_mut().reset();
        self.shared.take_descent();
        self.cache.reset();
    }
}
