use std::any::{Any, type_name};

use log::trace;

/// One position of a layer.
enum Element {
    /// A type-erased value, tagged with its type name for diagnostics.
    Value {
        value: Box<dyn Any>,
        type_name: &'static str,
    },
    /// A finished nested value, kept as the layer that decoded it.
    Nested(Layer),
    /// A finished collection of nested values, kept as their layers.
    Collected(Vec<Layer>),
    /// A nested value or collection currently rebuilt from its layers.
    Rebuilding,
}

impl Element {
    fn value<T: Any>(value: T) -> Self {
        Self::Value {
            value: Box::new(value),
            type_name: type_name::<T>(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Value { type_name, .. } => *type_name,
            Self::Nested(_) => "nested value",
            Self::Collected(_) => "nested collection",
            Self::Rebuilding => "nested value being rebuilt",
        }
    }
}

/// The elements of a closed layer.
///
/// A finished nested value keeps the layer it was decoded in rather than a
/// copy of the value. Replaying that layer yields the value again without
/// touching the input.
#[derive(Default)]
pub struct Layer(Vec<Element>);

impl Layer {
    /// Number of positions in the layer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for Layer {
    fn drop(&mut self) {
        // Flattened, so a deep chain of layers drops without recursion.
        let mut pending = std::mem::take(&mut self.0);
        while let Some(element) = pending.pop() {
            match element {
                Element::Nested(mut layer) => pending.append(&mut layer.0),
                Element::Collected(layers) => {
                    for mut layer in layers {
                        pending.append(&mut layer.0);
                    }
                }
                Element::Value { .. } | Element::Rebuilding => {}
            }
        }
    }
}

/// What a replay finds at a position that holds nested values.
pub(crate) enum Reserved<T> {
    /// Never filled; the nested value is being decoded for the first time.
    Vacant,
    /// Finished earlier. The position is now marked as rebuilding.
    Finished(T),
    Rebuilding,
}

/// A value handed from a closed layer to its parent.
struct Finished {
    value: Box<dyn Any>,
    type_name: &'static str,
    layer: Layer,
}

/// Replay cache of a composed decoder.
///
/// Values are appended in the order a builder produces them and are
/// addressed by position relative to the current layer. A new layer is
/// pushed for every nested decode of the composed type itself:
///
/// ```text
///   elements: [ a0 a1 a2 | b0 b1 | c0 ]
///               ^ base     ^ layer 1 ^ layer 2 (current, len 1)
///   layers:   [ 3, 5 ]
/// ```
///
/// Closing a layer splits its elements off into a [`Layer`]. The finished
/// nested value travels to the parent on the nested stack together with
/// that layer; the parent stores the layer at the position of the value.
///
/// The typed accessors perform the only downcasts. A type mismatch means
/// the builder did not replay the same sequence of operations, and is
/// reported with a panic naming both types.
#[derive(Default)]
pub struct ElementsAccumulator {
    elements: Vec<Element>,
    layers: Vec<usize>,
    nested: Vec<Finished>,
}

impl ElementsAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn start(&self) -> usize {
        self.layers.last().copied().unwrap_or(0)
    }

    /// Number of values in the current layer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len() - self.start()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add<T: Any>(&mut self, value: T) {
        self.elements.push(Element::value(value));
    }

    fn slot_mut(&mut self, index: usize) -> &mut Element {
        let len = self.len();
        assert!(index < len, "index {index} is out of bounds for a layer of {len} elements");
        let start = self.start();
        &mut self.elements[start + index]
    }

    fn fill(&mut self, index: usize, element: Element) {
        if index == self.len() {
            self.elements.push(element);
        } else {
            *self.slot_mut(index) = element;
        }
    }

    /// The value at `index` of the current layer.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the current layer or the value there is
    /// not a `T`.
    #[must_use]
    pub fn get<T: Any>(&self, index: usize) -> &T {
        let len = self.len();
        assert!(index < len, "index {index} is out of bounds for a layer of {len} elements");
        match &self.elements[self.start() + index] {
            Element::Value {
                value,
                type_name: stored,
            } => value
                .downcast_ref()
                .unwrap_or_else(|| mismatch(index, stored, type_name::<T>())),
            other => mismatch(index, other.describe(), type_name::<T>()),
        }
    }

    /// # Panics
    ///
    /// Same conditions as [`get`](Self::get).
    pub fn get_mut<T: Any>(&mut self, index: usize) -> &mut T {
        let slot = self.slot_mut(index);
        let stored = slot.describe();
        match slot {
            Element::Value { value, .. } => value
                .downcast_mut()
                .unwrap_or_else(|| mismatch(index, stored, type_name::<T>())),
            _ => mismatch(index, stored, type_name::<T>()),
        }
    }

    /// Replace the value at `index` of the current layer.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the current layer.
    pub fn set<T: Any>(&mut self, index: usize, value: T) {
        *self.slot_mut(index) = Element::value(value);
    }

    /// Open a layer starting at the end of the element list.
    pub fn recurse(&mut self) {
        self.layers.push(self.elements.len());
        trace!("opened recursion layer {}", self.layers.len());
    }

    /// Reopen a closed layer with all of its positions filled.
    pub fn restore(&mut self, mut layer: Layer) {
        self.layers.push(self.elements.len());
        self.elements.append(&mut layer.0);
        trace!("reopened recursion layer {} with {} elements", self.layers.len(), self.len());
    }

    /// Close the current layer and return its elements.
    ///
    /// # Panics
    ///
    /// Panics if no layer is open.
    pub fn close_layer(&mut self) -> Layer {
        let start = self
            .layers
            .pop()
            .unwrap_or_else(|| panic!("close_layer called on the base layer"));
        trace!("closed recursion layer {}", self.layers.len() + 1);
        Layer(self.elements.split_off(start))
    }

    /// Hand a finished nested value and its layer to the parent layer.
    pub fn push_nested<T: Any>(&mut self, value: T, layer: Layer) {
        self.nested.push(Finished {
            value: Box::new(value),
            type_name: type_name::<T>(),
            layer,
        });
    }

    /// Take the most recently finished nested value, if any.
    ///
    /// # Panics
    ///
    /// Panics if that value is not a `T`.
    pub fn pop_nested<T: Any>(&mut self) -> Option<(T, Layer)> {
        let Finished {
            value,
            type_name: stored,
            layer,
        } = self.nested.pop()?;
        match value.downcast() {
            Ok(value) => Some((*value, layer)),
            Err(_) => panic!(
                "nested stack holds a `{stored}` but a `{}` was requested",
                type_name::<T>()
            ),
        }
    }

    /// Inspect the position of a nested value.
    pub(crate) fn take_nested(&mut self, index: usize) -> Reserved<Layer> {
        match self.take_reserved(index) {
            None => Reserved::Vacant,
            Some(Element::Nested(layer)) => Reserved::Finished(layer),
            Some(Element::Rebuilding) => Reserved::Rebuilding,
            Some(other) => mismatch(index, other.describe(), "nested value"),
        }
    }

    /// Inspect the position of a collection of nested values.
    pub(crate) fn take_collected(&mut self, index: usize) -> Reserved<Vec<Layer>> {
        match self.take_reserved(index) {
            None => Reserved::Vacant,
            Some(Element::Collected(layers)) => Reserved::Finished(layers),
            Some(Element::Rebuilding) => Reserved::Rebuilding,
            Some(other) => mismatch(index, other.describe(), "nested collection"),
        }
    }

    /// Take the element at a filled position, leaving it marked as
    /// rebuilding. `None` for the next free position.
    fn take_reserved(&mut self, index: usize) -> Option<Element> {
        if index == self.len() {
            return None;
        }
        Some(std::mem::replace(self.slot_mut(index), Element::Rebuilding))
    }

    pub(crate) fn finish_nested(&mut self, index: usize, layer: Layer) {
        self.fill(index, Element::Nested(layer));
    }

    pub(crate) fn finish_collected(&mut self, index: usize, layers: Vec<Layer>) {
        self.fill(index, Element::Collected(layers));
    }

    /// `true` while no layer is open, i.e. the builder currently runs for
    /// the outermost value.
    #[must_use]
    pub fn is_last_layer(&self) -> bool {
        self.layers.is_empty()
    }

    /// Number of open layers.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Drop everything, back to a single empty base layer.
    pub fn reset(&mut self) {
        self.elements.clear();
        self.layers.clear();
        self.nested.clear();
    }
}

fn mismatch(index: usize, stored: &str, requested: &str) -> ! {
    panic!(
        "builder replayed inconsistently: element {index} holds a `{stored}` but a `{requested}` \
         was requested at the same position"
    )
}
