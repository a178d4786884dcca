//! Pattern matching.
//!
//! The matcher aligns an input string against a compiled [`Grammar`] and
//! returns *every* successful alignment, in a deterministic order, so the
//! loader can backtrack through them.
//!
//! ## Algorithm
//!
//! `expand(node, offset)` returns every way `node` can match starting at
//! `offset`, as a list of [`Partial`]s (end offset, parse mark, bindings):
//!
//! ```text
//! Literal      -> skip whitespace, compare case-insensitively, whole words
//! Sequence     -> fold children left to right over the frontier of partials
//! Optional     -> child's results, then the empty match
//! Alternation  -> each branch in order, OR-ing the branch tag into the mark
//! Placeholder  -> every balanced span starting here, shortest first
//! FreeCapture  -> every span the regex accepts, longest first
//! ```
//!
//! Results are memoized per `(node, offset)` and each memo cell keeps at most
//! `limit` entries per end offset, so patterns with many near-identical
//! branches stay polynomial while every reachable offset keeps an alignment.
//! Whether a placeholder or capture boundary is acceptable is decided by the
//! rest of the sequence: spans that leave the remainder unmatchable simply
//! produce no partials further up.
//!
//! ## Placeholder spans
//!
//! A placeholder span never ends inside a quoted string or inside unbalanced
//! `(...)`/`{...}`, so `"%text% to %player%"` cannot split
//! `"going to town" to Steve` at the first `to`. The one exception is a quote
//! left open until the end of the input: the whole remainder is offered as a
//! last span.

use super::compile::{Grammar, GrammarNode, NodeId, SlotId};
use super::dedup::Candidates;
use std::collections::HashMap;
use std::rc::Rc;

/// Bitwise OR of the tags of every alternation branch taken.
pub type ParseMark = u32;

/// A partial alignment produced while expanding one grammar node.
#[derive(Debug, Clone)]
pub(crate) struct Partial {
    pub(crate) end: usize,
    pub(crate) mark: ParseMark,
    /// `(slot, start, end)` byte ranges into the input.
    pub(crate) bindings: Vec<(SlotId, usize, usize)>,
}

impl Partial {
    fn at(end: usize) -> Self {
        Partial { end, mark: 0, bindings: Vec::new() }
    }

    fn join(&self, next: &Partial) -> Partial {
        let mut bindings = self.bindings.clone();
        bindings.extend_from_slice(&next.bindings);
        Partial { end: next.end, mark: self.mark | next.mark, bindings }
    }
}

/// Text bound to one placeholder or capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding<'i> {
    pub slot: SlotId,
    pub text: &'i str,
    pub start: usize,
    pub end: usize,
}

/// One successful alignment of a grammar against an input.
///
/// Borrows the input; it is only meaningful together with the grammar that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult<'i> {
    pub start: usize,
    pub end: usize,
    pub mark: ParseMark,
    /// Trailing input was left unconsumed.
    pub unmatched: bool,
    pub bindings: Vec<Binding<'i>>,
}

impl<'i> MatchResult<'i> {
    /// Text bound to `slot`, if that slot took part in this alignment.
    pub fn text(&self, slot: SlotId) -> Option<&'i str> {
        self.bindings.iter().find(|b| b.slot == slot).map(|b| b.text)
    }
}

/// Matches one grammar against one input. Cheap to create; holds the memo.
#[derive(Debug)]
pub struct Matcher<'g, 'i> {
    grammar: &'g Grammar,
    input: &'i str,
    limit: usize,
    memo: HashMap<(NodeId, usize), Rc<Vec<Partial>>>,
}

impl<'g, 'i> Matcher<'g, 'i> {
    /// Default cap on candidates kept per `(node, offset)` and end offset.
    pub const DEFAULT_LIMIT: usize = 256;

    pub fn new(grammar: &'g Grammar, input: &'i str) -> Self {
        Matcher { grammar, input, limit: Self::DEFAULT_LIMIT, memo: HashMap::new() }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Every alignment anchored at the start of the input, including ones
    /// flagged `unmatched`.
    pub fn matches(&mut self) -> Vec<MatchResult<'i>> {
        self.matches_from(0)
    }

    /// Alignments that consume the whole input.
    pub fn exact(&mut self) -> Vec<MatchResult<'i>> {
        self.matches().into_iter().filter(|m| !m.unmatched).collect()
    }

    /// Substring search: alignments at the earliest word start where the
    /// grammar matches at all.
    pub fn find(&mut self) -> Vec<MatchResult<'i>> {
        for start in word_starts(self.input) {
            let found = self.matches_from(start);
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    fn matches_from(&mut self, start: usize) -> Vec<MatchResult<'i>> {
        let partials = self.expand(self.grammar.root(), start);
        let input = self.input;
        let start = skip_ws(input, start);
        partials
            .iter()
            .map(|p| MatchResult {
                start,
                end: p.end,
                mark: p.mark,
                unmatched: skip_ws(input, p.end) < input.len(),
                bindings: p
                    .bindings
                    .iter()
                    .map(|&(slot, s, e)| Binding { slot, text: &input[s..e], start: s, end: e })
                    .collect(),
            })
            .collect()
    }

    fn expand(&mut self, id: NodeId, pos: usize) -> Rc<Vec<Partial>> {
        if let Some(hit) = self.memo.get(&(id, pos)) {
            return Rc::clone(hit);
        }
        let grammar = self.grammar;

        let mut out = Candidates::new(self.limit);
        match grammar.node(id) {
            GrammarNode::Literal(text) => {
                if let Some(end) = match_literal(self.input, pos, text) {
                    out.push(Partial::at(end));
                }
            }
            GrammarNode::Sequence(children) => {
                let mut frontier = vec![Partial::at(pos)];
                for &child in children {
                    let mut next = Candidates::new(self.limit);
                    for partial in &frontier {
                        for s in self.expand(child, partial.end).iter() {
                            next.push(partial.join(s));
                        }
                    }
                    if next.is_empty() {
                        frontier = Vec::new();
                        break;
                    }
                    frontier = next.into_vec();
                }
                for partial in frontier {
                    out.push(partial);
                }
            }
            GrammarNode::Optional(child) => {
                for s in self.expand(*child, pos).iter() {
                    out.push(s.clone());
                }
                out.push(Partial::at(pos));
            }
            GrammarNode::Alternation(branches) => {
                for branch in branches {
                    for s in self.expand(branch.node, pos).iter() {
                        let mut s = s.clone();
                        s.mark |= branch.tag;
                        out.push(s);
                    }
                }
            }
            GrammarNode::Placeholder(slot) => {
                for (s, e) in placeholder_spans(self.input, pos) {
                    out.push(Partial { end: e, mark: 0, bindings: vec![(*slot, s, e)] });
                }
            }
            GrammarNode::FreeCapture { slot, regex } => {
                let start = skip_ws(self.input, pos);
                let rest = &self.input[start..];
                let mut ends: Vec<usize> = rest.char_indices().map(|(i, _)| start + i).skip(1).collect();
                ends.push(self.input.len());
                ends.insert(0, start);
                ends.reverse();
                for e in ends {
                    let span = &self.input[start..e];
                    if (e == start || !span.ends_with(char::is_whitespace)) && regex.is_match(span) {
                        out.push(Partial { end: e, mark: 0, bindings: vec![(*slot, start, e)] });
                    }
                }
            }
        }

        let out = Rc::new(out.into_vec());
        self.memo.insert((id, pos), Rc::clone(&out));
        out
    }
}

impl Grammar {
    /// Convenience for `Matcher::new(self, input).exact()`.
    pub fn match_exact<'i>(&self, input: &'i str) -> Vec<MatchResult<'i>> {
        Matcher::new(self, input).exact()
    }
}

fn skip_ws(input: &str, pos: usize) -> usize {
    input[pos..].char_indices().find(|(_, c)| !c.is_whitespace()).map(|(i, _)| pos + i).unwrap_or(input.len())
}

fn chars_eq(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Match a normalized literal at `pos`; a space in the literal requires at
/// least one whitespace character in the input. Literals starting or ending
/// with a letter or digit don't match inside a word.
fn match_literal(input: &str, pos: usize, literal: &str) -> Option<usize> {
    let mut at = skip_ws(input, pos);
    if literal.starts_with(char::is_alphanumeric) && input[..at].ends_with(char::is_alphanumeric) {
        return None;
    }
    for pc in literal.chars() {
        if pc == ' ' {
            let next = skip_ws(input, at);
            if next == at {
                return None;
            }
            at = next;
            continue;
        }
        let ic = input[at..].chars().next()?;
        if !chars_eq(ic, pc) {
            return None;
        }
        at += ic.len_utf8();
    }
    if literal.ends_with(char::is_alphanumeric) && input[at..].starts_with(char::is_alphanumeric) {
        return None;
    }
    Some(at)
}

/// Balanced, non-empty spans starting at the first non-space char at or
/// after `pos`, shortest first. Spans never end on whitespace or inside a word.
fn placeholder_spans(input: &str, pos: usize) -> Vec<(usize, usize)> {
    let start = skip_ws(input, pos);
    let mut spans = Vec::new();
    let mut depth: i32 = 0;
    let mut quoted = false;
    for (i, c) in input[start..].char_indices() {
        match c {
            '"' => quoted = !quoted,
            '(' | '{' if !quoted => depth += 1,
            ')' | '}' if !quoted => {
                depth -= 1;
                if depth < 0 {
                    break;
                }
            }
            _ => {}
        }
        if !quoted && depth == 0 && !c.is_whitespace() {
            let end = start + i + c.len_utf8();
            if !(c.is_alphanumeric() && input[end..].starts_with(char::is_alphanumeric)) {
                spans.push((start, end));
            }
        }
    }
    // An unterminated quote still yields the whole rest, so a text literal
    // parser gets to report it.
    if quoted && depth == 0 {
        spans.push((start, start + input[start..].trim_end().len()));
    }
    spans
}

fn word_starts(input: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut prev_ws = true;
    for (i, c) in input.char_indices() {
        if !c.is_whitespace() && prev_ws {
            starts.push(i);
        }
        prev_ws = c.is_whitespace();
    }
    starts
}
