//! Type-directed expression loader.
//!
//! This module is the operational core of the engine: it turns one piece of
//! text plus the set of types the caller wants into exactly one [`Node`], or
//! reports that it can't.
//!
//! ## Key concepts
//!
//! - **Construct**: a registered syntax element (see `registry.rs`), tried in
//!   registration order.
//! - **Candidate**: one exact alignment of a construct's grammar with the text
//!   (see `crate::grammar::Matcher`).
//! - **Soft failure**: a candidate whose placeholders don't parse, or whose
//!   builder declines, is dropped (`Ok(None)`) and the next one is tried.
//! - **Hard failure**: a [`ParseError`] from a fallback or the recursion bound;
//!   it propagates out of every level and aborts the load.
//!
//! ## Order of attempts for `parse_expression(text, want)`
//!
//! ```text
//! (0) depth check            -> TooDeep past Options::max_depth
//! (1) "( ... )"              -> parse the inside
//! (2) "a, b and c"           -> list of items (plural placeholders only)
//! (3) constructs             -> registration order, grammar order,
//!                               candidate order; then the fallback
//! (4) literal parsers        -> each wanted type's literal parser, then
//!                               those of types convertible into `want`
//! ```
//!
//! A `(text, want, plural)` that failed once fails again for the rest of the
//! statement, so it is remembered and not re-parsed.
//!
//! Each result whose type is not already accepted is wrapped in a conversion
//! (registered converter) or, for `object`-typed results, in a coercion that
//! checks values at run time.
//!
//! ## Debugging
//!
//! `tracing` events at `trace` level show every construct attempt and
//! candidate; `debug` shows accepted parses.

use super::metrics::LoadMetrics;
use super::registry::{Bindings, Construct, ConstructKind, Registry};
use super::trigger::TriggerInfo;
use super::types::{SemanticType, TypeSet};
use crate::error::{ParseError, ParseResult};
use crate::grammar::{Matcher, Placeholder, PlaceholderFlags, Slot};
use crate::node::{Coercion, Conversion, ExpressionList, Node, Operation};
use crate::Options;
use std::collections::HashSet;

const RED_ZONE: usize = 100 * 1024; // 100KB
const STACK_PER_RECURSION: usize = 1024 * 1024; // 1MB

/// What a parsed statement line does.
#[derive(Debug)]
pub enum Statement {
    Effect(Node),
    Condition(Node),
}

impl Statement {
    pub fn node(&self) -> &Node {
        match self {
            Statement::Effect(node) | Statement::Condition(node) => node,
        }
    }

    pub fn kind(&self) -> ConstructKind {
        match self {
            Statement::Effect(_) => ConstructKind::Effect,
            Statement::Condition(_) => ConstructKind::Condition,
        }
    }
}

/// Parses text against a [`Registry`].
///
/// One loader is used per script load. It tracks the current line (for error
/// reporting), the recursion depth and the load metrics.
#[derive(Debug)]
pub struct Loader<'r> {
    registry: &'r Registry,
    options: &'r Options,
    line: usize,
    depth: usize,
    metrics: LoadMetrics,
    /// Sub-parses that came back empty on the current statement.
    failed: HashSet<(String, TypeSet, bool)>,
}

impl<'r> Loader<'r> {
    pub fn new(registry: &'r Registry, options: &'r Options) -> Self {
        Loader { registry, options, line: 1, depth: 0, metrics: LoadMetrics::default(), failed: HashSet::new() }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Set the line attached to nodes and errors from here on.
    pub fn at_line(&mut self, line: usize) {
        self.line = line;
        self.failed.clear();
    }

    pub fn metrics(&self) -> &LoadMetrics {
        &self.metrics
    }

    pub fn into_metrics(self) -> LoadMetrics {
        self.metrics
    }

    /// Wrap `op` in a node at the current line, folding unless disabled.
    pub fn node(&self, op: impl Operation + 'static) -> Node {
        Node::build(self.line, Box::new(op), self.options.fold_constants)
    }

    /// Parse `text` as one expression yielding values accepted by `want`.
    ///
    /// With `plural == false` only single-valued results are produced.
    pub fn parse_expression(&mut self, text: &str, want: &TypeSet, plural: bool) -> ParseResult<Option<Node>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if self.depth >= self.options.max_depth {
            return Err(ParseError::TooDeep { line: self.line, depth: self.options.max_depth });
        }
        let key = (text.to_string(), want.clone(), plural);
        if self.failed.contains(&key) {
            self.metrics.failures_reused += 1;
            return Ok(None);
        }
        self.depth += 1;
        self.metrics.recursions += 1;
        self.metrics.max_depth = self.metrics.max_depth.max(self.depth);
        let result = stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || self.expression(text, want, plural));
        self.depth -= 1;
        let node = match result? {
            Some(node) if plural || node.is_single() => self.adapt(node, want),
            _ => None,
        };
        if node.is_none() {
            self.failed.insert(key);
        }
        Ok(node)
    }

    /// Parse `text` as a condition.
    pub fn parse_condition(&mut self, text: &str) -> ParseResult<Option<Node>> {
        self.statement_of(ConstructKind::Condition, text.trim())
    }

    /// Parse `text` as an effect.
    pub fn parse_effect(&mut self, text: &str) -> ParseResult<Option<Node>> {
        self.statement_of(ConstructKind::Effect, text.trim())
    }

    /// Parse one statement line: effects first, then conditions.
    pub fn parse_statement(&mut self, text: &str) -> ParseResult<Statement> {
        let _span = tracing::debug_span!("statement", line = self.line).entered();
        self.metrics.lines += 1;
        self.failed.clear();
        if let Some(node) = self.parse_effect(text)? {
            return Ok(Statement::Effect(node));
        }
        if let Some(node) = self.parse_condition(text)? {
            return Ok(Statement::Condition(node));
        }
        Err(ParseError::NoMatch { line: self.line, text: text.trim().to_string() })
    }

    fn statement_of(&mut self, kind: ConstructKind, text: &str) -> ParseResult<Option<Node>> {
        if text.is_empty() {
            return Ok(None);
        }
        let registry = self.registry;
        let trigger = TriggerInfo::scan(text);
        for construct in registry.of_kind(kind) {
            if let Some(node) = self.try_construct(construct, text, &trigger)? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    fn expression(&mut self, text: &str, want: &TypeSet, plural: bool) -> ParseResult<Option<Node>> {
        if let Some(inner) = strip_parens(text) {
            return self.parse_expression(inner, want, plural);
        }

        if plural {
            if let Some(items) = split_list(text) {
                if let Some(list) = self.list(&items, want)? {
                    return Ok(Some(list));
                }
            }
        }

        let registry = self.registry;
        let types = registry.types();
        let trigger = TriggerInfo::scan(text);
        for construct in registry.of_kind(ConstructKind::Expression) {
            if !(types.reachable(construct.returns, want) || construct.returns == SemanticType::OBJECT) {
                continue;
            }
            if let Some(node) = self.try_construct(construct, text, &trigger)? {
                return Ok(Some(node));
            }
        }

        Ok(self.literal(text, want))
    }

    /// Wanted types' literal parsers first, then those of types a converter
    /// takes into `want`; the caller wraps the latter in a conversion.
    fn literal(&self, text: &str, want: &TypeSet) -> Option<Node> {
        let types = self.registry.types();
        let wanted: Vec<SemanticType> = if want.is_any() { types.types().collect() } else { want.iter().collect() };
        let convertible = types.types().filter(|&ty| !types.accepts(want, ty) && types.converter_into(ty, want).is_some());
        for ty in wanted.into_iter().chain(convertible) {
            if let Some(value) = types.parse_literal(ty, text) {
                tracing::trace!(line = self.line, text, ty = types.name(ty), "literal");
                return Some(Node::constant(self.line, ty, vec![value]));
            }
        }
        None
    }

    /// Parse every item of a list; `None` if any item fails.
    fn list(&mut self, items: &[&str], want: &TypeSet) -> ParseResult<Option<Node>> {
        let mut nodes = Vec::with_capacity(items.len());
        for item in items {
            match self.parse_expression(item, want, true)? {
                Some(node) => nodes.push(node),
                None => return Ok(None),
            }
        }
        let first = nodes.first().map(Node::result_type).unwrap_or(SemanticType::OBJECT);
        let result = if nodes.iter().all(|n| n.result_type() == first) {
            first
        } else if want.is_any() {
            SemanticType::OBJECT
        } else {
            want.iter().next().unwrap_or(SemanticType::OBJECT)
        };
        Ok(Some(self.node(ExpressionList::new(nodes, result))))
    }

    fn try_construct(&mut self, construct: &'r Construct, text: &str, trigger: &TriggerInfo) -> ParseResult<Option<Node>> {
        self.metrics.constructs_tried += 1;
        let registry = self.registry;
        let types = registry.types();

        for (index, syntax) in construct.syntaxes.iter().enumerate() {
            let grammar = &syntax.grammar;
            if !trigger.admits(grammar) {
                self.metrics.patterns_gated += 1;
                continue;
            }
            let candidates = Matcher::new(grammar, text).with_limit(self.options.max_candidates).exact();
            self.metrics.candidates += candidates.len();
            tracing::trace!(line = self.line, construct = construct.name, pattern = grammar.source(), candidates = candidates.len(), "matched");

            'candidates: for candidate in candidates {
                let mut operands: Vec<Option<Node>> = (0..grammar.placeholder_count()).map(|_| None).collect();
                let mut captures: Vec<Option<String>> = vec![None; grammar.capture_count()];
                for binding in &candidate.bindings {
                    match grammar.slot(binding.slot) {
                        Slot::Placeholder(placeholder) => match self.operand(binding.text, placeholder)? {
                            Some(node) => operands[placeholder.index] = Some(node),
                            None => continue 'candidates,
                        },
                        Slot::Capture(i) => captures[*i] = Some(binding.text.to_string()),
                    }
                }

                let bindings =
                    Bindings::new(self.line, index, candidate.mark, operands, captures, self.options.fold_constants, types);
                if let Some(node) = (syntax.build)(bindings)? {
                    tracing::debug!(line = self.line, construct = construct.name, text, constant = node.is_constant(), "parsed");
                    if node.is_constant() {
                        self.metrics.constants += 1;
                    }
                    return Ok(Some(node));
                }
            }
        }

        if let Some(fallback) = &construct.fallback {
            if let Some(node) = fallback(text, self)? {
                tracing::debug!(line = self.line, construct = construct.name, text, "parsed by fallback");
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    fn operand(&mut self, text: &str, placeholder: &Placeholder) -> ParseResult<Option<Node>> {
        let Some(node) = self.parse_expression(text, &placeholder.types, placeholder.is_plural())? else {
            return Ok(None);
        };
        if placeholder.flags.contains(PlaceholderFlags::LITERAL_ONLY) && !node.is_constant() {
            return Ok(None);
        }
        Ok(Some(node))
    }

    /// Make `node` acceptable to `want`, or give up.
    fn adapt(&self, node: Node, want: &TypeSet) -> Option<Node> {
        let types = self.registry.types();
        let from = node.result_type();
        if types.accepts(want, from) {
            return Some(node);
        }
        if let Some((to, convert)) = types.converter_into(from, want) {
            return Some(self.node(Conversion::new(node, to, convert)));
        }
        if from == SemanticType::OBJECT {
            return Some(self.node(Coercion::new(node, want.clone(), types.clone())));
        }
        None
    }
}

/// Inner text of `( ... )` when the outer parentheses enclose everything.
fn strip_parens(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    let mut quoted = false;
    for c in inner.chars() {
        match c {
            '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Top-level items of `a, b and c`; `None` unless there are at least two.
fn split_list(text: &str) -> Option<Vec<&str>> {
    let mut items = Vec::new();
    let mut depth = 0i32;
    let mut quoted = false;
    let mut start = 0;
    let mut i = 0;
    let bytes = text.as_bytes();
    while i < bytes.len() {
        match bytes[i] {
            b'"' => quoted = !quoted,
            b'(' | b'{' if !quoted => depth += 1,
            b')' | b'}' if !quoted => depth -= 1,
            b',' if !quoted && depth == 0 => {
                items.push(&text[start..i]);
                start = i + 1;
                // `a, b, and c`
                let rest = text[start..].trim_start();
                if starts_with_and(rest) {
                    start = text.len() - rest.len() + 4;
                }
                i = start;
                continue;
            }
            b if b.is_ascii_whitespace() && !quoted && depth == 0 => {
                let rest = &text[i..];
                let word = rest.trim_start();
                if starts_with_and(word) && word.len() > 4 {
                    items.push(&text[start..i]);
                    start = text.len() - word.len() + 4;
                    i = start;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
    items.push(&text[start..]);
    let items: Vec<&str> = items.into_iter().map(str::trim).collect();
    (items.len() >= 2 && items.iter().all(|s| !s.is_empty())).then_some(items)
}

fn starts_with_and(text: &str) -> bool {
    text.get(..4).is_some_and(|w| w.eq_ignore_ascii_case("and "))
}
