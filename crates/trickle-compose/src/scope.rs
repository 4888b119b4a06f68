use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use log::trace;
use trickle_decoders::common::{
    BooleanDecoder, ByteDecoder, DoubleDecoder, FloatDecoder, IntDecoder, LongDecoder,
    ShortDecoder, boolean_decoder, byte_decoder, double_decoder, float_decoder, int_decoder,
    long_decoder, short_decoder,
};
use trickle_decoders::Endianness;
use trickle_decoders::fold::{Collect, Fold};
use trickle_wire::{DecodeError, Decoder, DecoderInput, State};

use crate::accumulator::{ElementsAccumulator, Layer, Reserved};

/// Why a builder stopped before returning its value.
///
/// Every scope operation returns `Result<_, Interrupt>`, so a builder
/// propagates these with `?` and never handles them itself. `Recursion` in
/// particular is only meaningful when a scope operation raised it; the
/// composed decoder panics on a `Recursion` no nested decode asked for.
#[derive(Debug)]
pub enum Interrupt {
    /// The input ran out; the composed decoder returns `Processing`.
    Suspended,
    /// A nested value of the composed type is needed; the engine opens a
    /// layer and runs the builder for it.
    Recursion,
    /// Decoding failed; the composed decoder returns `Error`.
    Failed(DecodeError),
}

impl From<DecodeError> for Interrupt {
    fn from(error: DecodeError) -> Self {
        Self::Failed(error)
    }
}

/// The layer the engine opens for the next [`Interrupt::Recursion`].
pub(crate) enum Descent {
    /// An empty layer for a value decoded from the input.
    Fresh,
    /// A closed layer replayed to produce its value again.
    Rebuild(Layer),
}

/// State shared between the engine, its scopes and the self decoders they
/// hand out.
#[derive(Default)]
pub(crate) struct Shared {
    pub(crate) accumulator: RefCell<ElementsAccumulator>,
    descent: RefCell<Option<Descent>>,
}

impl Shared {
    fn request(&self, descent: Descent) {
        *self.descent.borrow_mut() = Some(descent);
    }

    fn descent_requested(&self) -> bool {
        self.descent.borrow().is_some()
    }

    /// Consume the pending request; it stays set until the engine takes it.
    pub(crate) fn take_descent(&self) -> Option<Descent> {
        self.descent.borrow_mut().take()
    }
}

/// Decodes one nested instance of the composed type `E`.
///
/// The value comes from the nested stack once the engine has decoded it in
/// a layer of its own. If none is waiting yet, the decoder requests a layer
/// and reports `Processing`; the scope step that drove it turns that into
/// [`Interrupt::Recursion`]. It can therefore sit inside any reduction or
/// wrapper decoder, which keeps its progress across the nested decode like
/// across any other suspension.
pub struct SelfDecoder<E> {
    shared: Rc<Shared>,
    _output: PhantomData<fn() -> E>,
}

impl<E: 'static> Decoder for SelfDecoder<E> {
    type Output = E;

    fn decode(&mut self, _input: &mut dyn DecoderInput) -> State<E> {
        let finished = self.shared.accumulator.borrow_mut().pop_nested::<E>();
        match finished {
            Some((value, _layer)) => State::Done(value),
            None => {
                self.shared.request(Descent::Fresh);
                State::Processing
            }
        }
    }

    fn reset(&mut self) {}
}

/// A size-prefixed collection of nested values.
///
/// The elements are folded as their layers close. Once finished, the
/// layers are handed to the accumulator, and [`rebuild_from`] replays them
/// when a later run needs the collection again.
///
/// [`rebuild_from`]: Self::rebuild_from
struct NestedCollection<E, S, F: Fold<E>> {
    size: S,
    fold: F,
    arity: Option<usize>,
    acc: Option<F::Acc>,
    layers: Vec<Layer>,
    /// Layers still to replay, last element first.
    rebuild: Vec<Layer>,
    _element: PhantomData<fn() -> E>,
}

impl<E, S, F> NestedCollection<E, S, F>
where
    E: 'static,
    S: Decoder,
    S::Output: Into<i128>,
    F: Fold<E>,
{
    fn new(size: S, fold: F) -> Self {
        Self {
            size,
            fold,
            arity: None,
            acc: None,
            layers: Vec::new(),
            rebuild: Vec::new(),
            _element: PhantomData,
        }
    }

    fn rebuild_from(&mut self, mut layers: Vec<Layer>) {
        self.arity = Some(layers.len());
        self.acc = None;
        self.layers.clear();
        layers.reverse();
        self.rebuild = layers;
    }

    fn clear(&mut self) {
        self.arity = None;
        self.acc = None;
        self.layers.clear();
        self.rebuild.clear();
        self.size.reset();
    }

    fn advance(
        &mut self,
        input: &mut dyn DecoderInput,
        shared: &Shared,
    ) -> Result<F::Output, Interrupt> {
        let arity = match self.arity {
            Some(arity) => arity,
            None => match self.size.decode(input) {
                State::Done(raw) => {
                    let length: i128 = raw.into();
                    match usize::try_from(length) {
                        Ok(arity) => *self.arity.insert(arity),
                        Err(_) => {
                            self.clear();
                            let error = if length < 0 {
                                DecodeError::NegativeLength { length }
                            } else {
                                DecodeError::LengthOverflow { length }
                            };
                            return Err(error.into());
                        }
                    }
                }
                State::Processing => return Err(Interrupt::Suspended),
                State::Error(error) => {
                    self.clear();
                    return Err(error.into());
                }
            },
        };

        let mut acc = match self.acc.take() {
            Some(acc) => acc,
            None => self.fold.supply(),
        };
        while self.layers.len() < arity {
            let finished = shared.accumulator.borrow_mut().pop_nested::<E>();
            let Some((element, layer)) = finished else {
                self.acc = Some(acc);
                let descent = match self.rebuild.pop() {
                    Some(layer) => Descent::Rebuild(layer),
                    None => Descent::Fresh,
                };
                shared.request(descent);
                return Err(Interrupt::Recursion);
            };
            self.fold.accumulate(&mut acc, element);
            self.layers.push(layer);
        }
        self.arity = None;
        Ok(self.fold.finish(acc))
    }
}

/// Skip progress: bytes still owed.
struct Skip(u64);

/// Shorthand decoders, one per kind, shared by every layer of a composed
/// decoder.
pub(crate) struct ShorthandCache {
    pub(crate) endianness: Endianness,
    byte: Option<ByteDecoder>,
    short: Option<ShortDecoder>,
    int: Option<IntDecoder>,
    long: Option<LongDecoder>,
    float: Option<FloatDecoder>,
    double: Option<DoubleDecoder>,
    boolean: Option<BooleanDecoder>,
    pub(crate) string: Box<dyn Decoder<Output = String>>,
}

impl ShorthandCache {
    pub(crate) fn new(endianness: Endianness, string: Box<dyn Decoder<Output = String>>) -> Self {
        Self {
            endianness,
            byte: None,
            short: None,
            int: None,
            long: None,
            float: None,
            double: None,
            boolean: None,
            string,
        }
    }

    pub(crate) fn reset(&mut self) {
        // Dropping the lazily built decoders resets them.
        self.byte = None;
        self.short = None;
        self.int = None;
        self.long = None;
        self.float = None;
        self.double = None;
        self.boolean = None;
        self.string.reset();
    }
}

/// The positional replay cursor of one builder run.
struct Replay<'a> {
    input: &'a mut dyn DecoderInput,
    shared: &'a Rc<Shared>,
    index: usize,
}

impl Replay<'_> {
    fn next_index(&mut self) -> usize {
        let index = self.index;
        self.index += 1;
        index
    }

    /// Claim the next position. Returns the cached value if the position was
    /// filled by an earlier run.
    fn claim<T: Clone + 'static>(&mut self) -> (usize, Option<T>) {
        let index = self.next_index();
        let accumulator = self.shared.accumulator.borrow();
        let cached = (index < accumulator.len()).then(|| accumulator.get::<T>(index).clone());
        (index, cached)
    }

    fn step<D>(&mut self, decoder: &mut D) -> Result<D::Output, Interrupt>
    where
        D: Decoder + ?Sized,
        D::Output: Clone + 'static,
    {
        let (index, cached) = self.claim::<D::Output>();
        if let Some(value) = cached {
            trace!("element {index} replayed from cache");
            return Ok(value);
        }

        // A request left by a decoder that completed anyway is stale.
        self.shared.take_descent();
        match decoder.decode(self.input) {
            State::Done(value) => {
                self.shared.accumulator.borrow_mut().add(value.clone());
                Ok(value)
            }
            State::Processing if self.shared.descent_requested() => Err(Interrupt::Recursion),
            State::Processing => Err(Interrupt::Suspended),
            State::Error(error) => Err(Interrupt::Failed(error)),
        }
    }

    /// A nested value of the composed type. Its position keeps the layer it
    /// was decoded in, and a later run rebuilds the value from that layer.
    fn nested<E: 'static>(&mut self) -> Result<E, Interrupt> {
        let index = self.next_index();
        let mut accumulator = self.shared.accumulator.borrow_mut();
        let rebuilding = match accumulator.take_nested(index) {
            Reserved::Finished(layer) => {
                trace!("rebuilding nested element {index}");
                self.shared.request(Descent::Rebuild(layer));
                return Err(Interrupt::Recursion);
            }
            Reserved::Rebuilding => true,
            Reserved::Vacant => false,
        };
        match accumulator.pop_nested::<E>() {
            Some((value, layer)) => {
                accumulator.finish_nested(index, layer);
                Ok(value)
            }
            None if rebuilding => {
                panic!("builder replayed inconsistently: nested element {index} was not rebuilt")
            }
            None => {
                self.shared.request(Descent::Fresh);
                Err(Interrupt::Recursion)
            }
        }
    }

    fn collection<E, S, F>(
        &mut self,
        collection: &mut NestedCollection<E, S, F>,
    ) -> Result<F::Output, Interrupt>
    where
        E: 'static,
        S: Decoder,
        S::Output: Into<i128>,
        F: Fold<E>,
    {
        let index = self.next_index();
        let reserved = self.shared.accumulator.borrow_mut().take_collected(index);
        if let Reserved::Finished(layers) = reserved {
            trace!("rebuilding nested collection {index} of {} elements", layers.len());
            collection.rebuild_from(layers);
        }
        let output = collection.advance(self.input, self.shared)?;
        let layers = std::mem::take(&mut collection.layers);
        self.shared.accumulator.borrow_mut().finish_collected(index, layers);
        Ok(output)
    }
}

/// The operations a composed decoder's builder is written in.
///
/// The builder runs again from its first statement on every decode call,
/// so each operation is addressed by its position in the run. Positions
/// filled by an earlier run return the cached value without touching the
/// input. A builder must therefore perform the same operations in the same
/// order on every run of the same object; replaying one kind of operation
/// where another was recorded panics.
///
/// ```
/// use trickle_compose::{composed_decoder, DecodingScope, Interrupt};
/// use trickle_wire::{Decoder, State};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Point { x: i32, y: i32 }
///
/// let mut decoder = composed_decoder(|scope: &mut DecodingScope<'_, Point>| {
///     Ok(Point { x: scope.int()?, y: scope.int()? })
/// });
/// assert_eq!(decoder.decode_slice(&[0, 0, 0, 1, 0, 0]), State::Processing);
/// assert_eq!(decoder.decode_slice(&[0, 2]), State::Done(Point { x: 1, y: 2 }));
/// ```
pub struct DecodingScope<'a, E> {
    replay: Replay<'a>,
    cache: &'a mut ShorthandCache,
    _composed: PhantomData<fn() -> E>,
}

impl<'a, E: 'static> DecodingScope<'a, E> {
    pub(crate) fn new(
        input: &'a mut dyn DecoderInput,
        shared: &'a Rc<Shared>,
        cache: &'a mut ShorthandCache,
    ) -> Self {
        Self {
            replay: Replay {
                input,
                shared,
                index: 0,
            },
            cache,
            _composed: PhantomData,
        }
    }

    /// Decode a value with `decoder`.
    ///
    /// The decoder must outlive the builder run (captured by the builder,
    /// or created with [`once_per_object`](Self::once_per_object)) so that
    /// its progress survives a suspension.
    pub fn decode<D>(&mut self, decoder: &mut D) -> Result<D::Output, Interrupt>
    where
        D: Decoder + ?Sized,
        D::Output: Clone + 'static,
    {
        self.replay.step(decoder)
    }

    /// Evaluate `create` once for the object being decoded and return the
    /// stored value on every later run.
    pub fn once_per_object<T, F>(&mut self, create: F) -> T
    where
        T: Clone + 'static,
        F: FnOnce(&Self) -> T,
    {
        let (_, cached) = self.replay.claim::<T>();
        if let Some(value) = cached {
            return value;
        }
        let value = create(self);
        self.replay.shared.accumulator.borrow_mut().add(value.clone());
        value
    }

    /// Decode with a decoder created once for the object being decoded.
    pub fn decode_once_per_object<D, F>(&mut self, create: F) -> Result<D::Output, Interrupt>
    where
        D: Decoder + 'static,
        D::Output: Clone + 'static,
        F: FnOnce(&Self) -> D,
    {
        let decoder = self.once_per_object(|scope| Rc::new(RefCell::new(create(scope))));
        let mut decoder = decoder.borrow_mut();
        self.replay.step(&mut *decoder)
    }

    /// Discard `count` bytes. A skip interrupted by the end of the input
    /// resumes with the bytes still owed.
    pub fn skip(&mut self, count: u64) -> Result<(), Interrupt> {
        let index = self.replay.index;
        self.replay.index += 1;
        let mut accumulator = self.replay.shared.accumulator.borrow_mut();
        if index == accumulator.len() {
            accumulator.add(Skip(count));
        }
        let owed = &mut accumulator.get_mut::<Skip>(index).0;
        if *owed > 0 {
            let skipped = self.replay.input.skip(*owed);
            *owed -= skipped;
            if *owed > 0 {
                return Err(Interrupt::Suspended);
            }
        }
        Ok(())
    }

    /// Abort the composed decode with `error`.
    pub fn error_state<T>(&self, error: DecodeError) -> Result<T, Interrupt> {
        Err(Interrupt::Failed(error))
    }

    pub fn byte(&mut self) -> Result<u8, Interrupt> {
        let decoder = self.cache.byte.get_or_insert_with(byte_decoder);
        self.replay.step(decoder)
    }

    pub fn short(&mut self) -> Result<i16, Interrupt> {
        let endianness = self.cache.endianness;
        let decoder = self.cache.short.get_or_insert_with(|| short_decoder(endianness));
        self.replay.step(decoder)
    }

    pub fn int(&mut self) -> Result<i32, Interrupt> {
        let endianness = self.cache.endianness;
        let decoder = self.cache.int.get_or_insert_with(|| int_decoder(endianness));
        self.replay.step(decoder)
    }

    pub fn long(&mut self) -> Result<i64, Interrupt> {
        let endianness = self.cache.endianness;
        let decoder = self.cache.long.get_or_insert_with(|| long_decoder(endianness));
        self.replay.step(decoder)
    }

    pub fn float(&mut self) -> Result<f32, Interrupt> {
        let endianness = self.cache.endianness;
        let decoder = self.cache.float.get_or_insert_with(|| float_decoder(endianness));
        self.replay.step(decoder)
    }

    pub fn double(&mut self) -> Result<f64, Interrupt> {
        let endianness = self.cache.endianness;
        let decoder = self.cache.double.get_or_insert_with(|| double_decoder(endianness));
        self.replay.step(decoder)
    }

    pub fn boolean(&mut self) -> Result<bool, Interrupt> {
        let decoder = self.cache.boolean.get_or_insert_with(boolean_decoder);
        self.replay.step(decoder)
    }

    /// Decode a string with the decoder configured for the composed
    /// decoder.
    pub fn string(&mut self) -> Result<String, Interrupt> {
        self.replay.step(&mut *self.cache.string)
    }

    /// A decoder for nested instances of `E`, for use inside other
    /// decoders. Store it with [`once_per_object`](Self::once_per_object)
    /// when the enclosing decoder is stateful.
    #[must_use]
    pub fn self_decoder(&self) -> SelfDecoder<E> {
        SelfDecoder {
            shared: Rc::clone(self.replay.shared),
            _output: PhantomData,
        }
    }

    /// Decode a nested instance of `E`.
    pub fn decode_self(&mut self) -> Result<E, Interrupt> {
        self.replay.nested()
    }

    /// A presence flag, then a nested `E` if present.
    pub fn self_or_none(&mut self) -> Result<Option<E>, Interrupt> {
        if self.boolean()? {
            self.decode_self().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Like [`self_or_none`](Self::self_or_none) with a custom presence
    /// flag decoder.
    pub fn self_or_none_with<B>(&mut self, nullability: &mut B) -> Result<Option<E>, Interrupt>
    where
        B: Decoder<Output = bool> + ?Sized,
    {
        if self.decode(nullability)? {
            self.decode_self().map(Some)
        } else {
            Ok(None)
        }
    }

    /// A collection of nested `E`, prefixed by a 4-byte big-endian count.
    pub fn self_collection<F>(&mut self, fold: F) -> Result<F::Output, Interrupt>
    where
        F: Fold<E> + 'static,
        F::Acc: 'static,
    {
        self.self_collection_with(fold, int_decoder(Endianness::Big))
    }

    /// A collection of nested `E`, counted by `size`.
    pub fn self_collection_with<F, S>(&mut self, fold: F, size: S) -> Result<F::Output, Interrupt>
    where
        F: Fold<E> + 'static,
        F::Acc: 'static,
        S: Decoder + 'static,
        S::Output: Into<i128>,
    {
        let collection =
            self.once_per_object(|_| Rc::new(RefCell::new(NestedCollection::new(size, fold))));
        let mut collection = collection.borrow_mut();
        self.replay.collection(&mut *collection)
    }

    /// A presence flag, then a collection of nested `E` if present.
    pub fn self_collection_or_none<F>(&mut self, fold: F) -> Result<Option<F::Output>, Interrupt>
    where
        F: Fold<E> + 'static,
        F::Acc: 'static,
    {
        if self.boolean()? {
            self.self_collection(fold).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn self_vec(&mut self) -> Result<Vec<E>, Interrupt> {
        self.self_collection(Collect::new())
    }

    pub fn self_vec_or_none(&mut self) -> Result<Option<Vec<E>>, Interrupt> {
        self.self_collection_or_none(Collect::new())
    }
}
