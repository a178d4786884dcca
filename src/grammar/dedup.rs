//! Deduplication and capping of match candidates.
//!
//! Different structural choices can produce the very same alignment: for
//! `[the] (a|a)` the two branches bind nothing and end at the same offset.
//! Keeping both would only make the loader try the same candidate twice, so
//! the matcher drops later duplicates and keeps the first one seen (which
//! preserves the deterministic ordering).
//!
//! ## What counts as "the same candidate"
//!
//! - End offset
//! - Parse mark
//! - Every binding's slot and byte range
//!
//! ## Cap
//!
//! At most `limit` candidates are kept per end offset. Different ends are
//! never traded against each other, so a cap can drop alternative splits of
//! the same text but never the only alignment reaching an offset.

use super::matcher::Partial;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MatchKey {
    end: usize,
    mark: u32,
    bindings: Vec<(usize, usize, usize)>,
}

impl MatchKey {
    pub(crate) fn from_partial(partial: &Partial) -> Self {
        MatchKey { end: partial.end, mark: partial.mark, bindings: partial.bindings.clone() }
    }
}

/// Partials collected for one memo cell, in insertion order.
#[derive(Debug)]
pub(crate) struct Candidates {
    limit: usize,
    seen: HashSet<MatchKey>,
    per_end: HashMap<usize, usize>,
    items: Vec<Partial>,
}

impl Candidates {
    pub(crate) fn new(limit: usize) -> Self {
        Candidates { limit, seen: HashSet::new(), per_end: HashMap::new(), items: Vec::new() }
    }

    /// Keep `partial` unless it repeats an earlier one or its end offset is full.
    pub(crate) fn push(&mut self, partial: Partial) {
        let count = self.per_end.entry(partial.end).or_insert(0);
        if *count >= self.limit {
            return;
        }
        if self.seen.insert(MatchKey::from_partial(&partial)) {
            *count += 1;
            self.items.push(partial);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn into_vec(self) -> Vec<Partial> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn partial(end: usize, mark: u32, slot: usize, start: usize) -> Partial {
        Partial { end, mark, bindings: vec![(slot, start, end)] }
    }

    #[test]
    fn duplicates_keep_the_first_occurrence() {
        let mut set = Candidates::new(8);
        set.push(partial(3, 1, 0, 0));
        set.push(partial(3, 1, 0, 0));
        set.push(partial(3, 2, 0, 0));
        let marks: Vec<u32> = set.into_vec().iter().map(|p| p.mark).collect();
        assert_eq!(marks, vec![1, 2]);
    }

    #[test]
    fn cap_applies_per_end_offset() {
        let mut set = Candidates::new(2);
        for start in 0..5 {
            set.push(partial(9, 0, 0, start));
        }
        set.push(partial(12, 0, 0, 0));
        let ends: Vec<usize> = set.into_vec().iter().map(|p| p.end).collect();
        assert_eq!(ends, vec![9, 9, 12]);
    }
}
