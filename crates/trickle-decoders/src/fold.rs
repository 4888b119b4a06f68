use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// How a reduction decoder turns a sequence of elements into one result.
///
/// A fresh accumulator is requested when the first element of a collection
/// is about to be decoded, every decoded element is added to it in arrival
/// order, and the finisher runs exactly once when the collection is
/// complete.
pub trait Fold<T> {
    type Acc;
    type Output;

    fn supply(&mut self) -> Self::Acc;
    fn accumulate(&mut self, acc: &mut Self::Acc, element: T);
    fn finish(&mut self, acc: Self::Acc) -> Self::Output;
}

/// Collects into any `Default + Extend` container.
pub struct Collect<C>(PhantomData<fn() -> C>);

impl<C> Collect<C> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<C> Default for Collect<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for Collect<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Collect<C> {}

impl<C> fmt::Debug for Collect<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Collect<{}>", std::any::type_name::<C>())
    }
}

impl<T, C: Default + Extend<T>> Fold<T> for Collect<C> {
    type Acc = C;
    type Output = C;

    fn supply(&mut self) -> C {
        C::default()
    }

    fn accumulate(&mut self, acc: &mut C, element: T) {
        acc.extend(std::iter::once(element));
    }

    fn finish(&mut self, acc: C) -> C {
        acc
    }
}

#[must_use]
pub fn to_vec<T>() -> Collect<Vec<T>> {
    Collect::new()
}

#[must_use]
pub fn to_set<T: Eq + Hash>() -> Collect<HashSet<T>> {
    Collect::new()
}

#[must_use]
pub fn to_sorted_set<T: Ord>() -> Collect<BTreeSet<T>> {
    Collect::new()
}

#[must_use]
pub fn to_map<K: Eq + Hash, V>() -> Collect<HashMap<K, V>> {
    Collect::new()
}

/// A fold built from three closures.
pub struct FnFold<S, A, F> {
    supply: S,
    accumulate: A,
    finish: F,
}

impl<T, Acc, R, S, A, F> Fold<T> for FnFold<S, A, F>
where
    S: FnMut() -> Acc,
    A: FnMut(&mut Acc, T),
    F: FnMut(Acc) -> R,
{
    type Acc = Acc;
    type Output = R;

    fn supply(&mut self) -> Acc {
        (self.supply)()
    }

    fn accumulate(&mut self, acc: &mut Acc, element: T) {
        (self.accumulate)(acc, element);
    }

    fn finish(&mut self, acc: Acc) -> R {
        (self.finish)(acc)
    }
}

/// Build a [`FnFold`].
///
/// ```
/// use trickle_decoders::fold::{fold_with, Fold};
///
/// let mut sum = fold_with(|| 0_i64, |acc, x: i32| *acc += i64::from(x), |acc| acc);
/// let mut acc = sum.supply();
/// sum.accumulate(&mut acc, 2);
/// sum.accumulate(&mut acc, 3);
/// assert_eq!(sum.finish(acc), 5);
/// ```
pub fn fold_with<T, Acc, R, S, A, F>(supply: S, accumulate: A, finish: F) -> FnFold<S, A, F>
where
    S: FnMut() -> Acc,
    A: FnMut(&mut Acc, T),
    F: FnMut(Acc) -> R,
{
    FnFold {
        supply,
        accumulate,
        finish,
    }
}
