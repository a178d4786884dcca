//! One-to-many values.
//!
//! Any expression may denote several values ("all players in the lava").
//! [`MultiResult`] is the lazily produced, finite, ordered sequence such an
//! evaluation returns. It is a view, not a cache: each evaluation builds a
//! fresh one and consumers pull only what they need.
//!
//! ## Quantification
//!
//! Conditions reduce a sequence to one boolean with a single rule:
//!
//! ```text
//! test(p)              = every element satisfies p   (true when empty)
//! check(p, positive)   = test(p) == positive
//! ```
//!
//! The polarity travels separately from the predicate, so one predicate
//! serves "is"/"are" and "isn't"/"aren't", singular and plural subjects.

use crate::value::Value;
use std::fmt;

pub struct MultiResult<'a, V = Value> {
    inner: Box<dyn Iterator<Item = V> + 'a>,
}

impl<'a, V: 'a> MultiResult<'a, V> {
    pub fn empty() -> Self {
        Self::lazy(std::iter::empty())
    }

    pub fn single(value: V) -> Self {
        Self::lazy(std::iter::once(value))
    }

    pub fn from_vec(values: Vec<V>) -> Self {
        Self::lazy(values)
    }

    /// Wrap an iterator without materializing it.
    pub fn lazy<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = V>,
        I::IntoIter: 'a,
    {
        MultiResult { inner: Box::new(iter.into_iter()) }
    }

    /// Lazily transform every element.
    pub fn map<U: 'a>(self, f: impl FnMut(V) -> U + 'a) -> MultiResult<'a, U> {
        MultiResult { inner: Box::new(self.inner.map(f)) }
    }

    /// Lazily transform every element, dropping the ones `f` rejects.
    pub fn filter_map<U: 'a>(self, f: impl FnMut(V) -> Option<U> + 'a) -> MultiResult<'a, U> {
        MultiResult { inner: Box::new(self.inner.filter_map(f)) }
    }

    pub fn chain(self, other: MultiResult<'a, V>) -> Self {
        MultiResult { inner: Box::new(self.inner.chain(other.inner)) }
    }

    /// True iff `predicate` holds for every element; vacuously true when empty.
    pub fn test(mut self, mut predicate: impl FnMut(&V) -> bool) -> bool {
        self.inner.all(|v| predicate(&v))
    }

    /// [`test`](Self::test) compared against the condition's polarity.
    pub fn check(self, predicate: impl FnMut(&V) -> bool, positive: bool) -> bool {
        self.test(predicate) == positive
    }

    pub fn first(mut self) -> Option<V> {
        self.inner.next()
    }

    pub fn into_vec(self) -> Vec<V> {
        self.inner.collect()
    }
}

impl<'a, V: Clone + 'a> MultiResult<'a, V> {
    /// Clone elements out of a borrowed slice on demand.
    pub fn from_slice(values: &'a [V]) -> Self {
        Self::lazy(values.iter().cloned())
    }
}

impl<V> Iterator for MultiResult<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.inner.next()
    }
}

impl<V> fmt::Debug for MultiResult<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiResult").field("inner", &"<lazy>").finish()
    }
}
