//! Pattern compilation.
//!
//! A pattern string is parsed once, at registration time, into an arena of
//! [`GrammarNode`]s. The arena is never mutated afterwards, so a compiled
//! [`Grammar`] can be shared by every parse on every thread.
//!
//! ## Invariants
//!
//! - `NodeId` indexes `Grammar::nodes`; children always have a smaller id than
//!   their parent, and `root` is the last node pushed.
//! - `SlotId` indexes `Grammar::slots` in order of appearance in the pattern.
//!   Placeholders and captures share that numbering; each also carries its own
//!   per-kind index used by builders.
//! - Literal text is stored lowercased, trimmed, with whitespace runs collapsed
//!   to one space.

use crate::engine::{TypeRegistry, TypeSet};
use crate::error::GrammarError;
use regex::Regex;

/// Index into a grammar's node arena.
pub type NodeId = usize;

/// Index into a grammar's slot table.
pub type SlotId = usize;

bitflags::bitflags! {
    /// Placeholder modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PlaceholderFlags: u8 {
        /// Declared with a plural type name; accepts many values.
        const PLURAL       = 1 << 0;
        /// `%*type%`: only compile-time constants are accepted.
        const LITERAL_ONLY = 1 << 1;
    }
}

/// A typed gap in a pattern.
#[derive(Debug, Clone)]
pub struct Placeholder {
    /// Position among the grammar's placeholders (0-based).
    pub index: usize,
    pub types: TypeSet,
    pub flags: PlaceholderFlags,
}

impl Placeholder {
    pub fn is_plural(&self) -> bool {
        self.flags.contains(PlaceholderFlags::PLURAL)
    }
}

/// Something a match can bind text to.
#[derive(Debug, Clone)]
pub enum Slot {
    Placeholder(Placeholder),
    /// Position among the grammar's captures (0-based).
    Capture(usize),
}

/// One alternation branch.
#[derive(Debug, Clone, Copy)]
pub struct Branch {
    pub tag: u32,
    pub node: NodeId,
}

#[derive(Debug, Clone)]
pub enum GrammarNode {
    Literal(String),
    Sequence(Vec<NodeId>),
    Optional(NodeId),
    Alternation(Vec<Branch>),
    Placeholder(SlotId),
    FreeCapture { slot: SlotId, regex: Regex },
}

/// A compiled pattern.
#[derive(Debug, Clone)]
pub struct Grammar {
    source: String,
    pub(crate) nodes: Vec<GrammarNode>,
    pub(crate) root: NodeId,
    slots: Vec<Slot>,
    fragments: Vec<String>,
}

impl Grammar {
    /// Compile `pattern`, resolving placeholder type names against `types`.
    pub fn compile(pattern: &str, types: &TypeRegistry) -> Result<Grammar, GrammarError> {
        let mut parser = PatternParser {
            pattern,
            chars: pattern.char_indices().collect(),
            pos: 0,
            nodes: Vec::new(),
            slots: Vec::new(),
            types,
            placeholders: 0,
            captures: 0,
        };
        let root = parser.parse_choice(None, 0)?;
        let fragments = required_fragments(&parser.nodes, root);
        Ok(Grammar { source: pattern.to_string(), nodes: parser.nodes, root, slots: parser.slots, fragments })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn node(&self, id: NodeId) -> &GrammarNode {
        &self.nodes[id]
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id]
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Placeholders in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.slots.iter().filter_map(|s| match s {
            Slot::Placeholder(p) => Some(p),
            Slot::Capture(_) => None,
        })
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders().count()
    }

    pub fn capture_count(&self) -> usize {
        self.slots.iter().filter(|s| matches!(s, Slot::Capture(_))).count()
    }

    /// Lowercased literal fragments present in every expansion.
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }
}

struct PatternParser<'p, 't> {
    pattern: &'p str,
    chars: Vec<(usize, char)>,
    pos: usize,
    nodes: Vec<GrammarNode>,
    slots: Vec<Slot>,
    types: &'t TypeRegistry,
    placeholders: usize,
    captures: usize,
}

impl PatternParser<'_, '_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map(|(o, _)| *o).unwrap_or(self.pattern.len())
    }

    fn push(&mut self, node: GrammarNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn unexpected(&self, found: char) -> GrammarError {
        GrammarError::Unexpected { pattern: self.pattern.to_string(), found, offset: self.offset() }
    }

    /// Parse `branch (| branch)*` up to `close` (or the end of the pattern).
    ///
    /// A single untagged branch collapses to the branch itself.
    fn parse_choice(&mut self, close: Option<char>, open_offset: usize) -> Result<NodeId, GrammarError> {
        let mut branches = Vec::new();
        loop {
            let tag = self.parse_tag();
            let node = self.parse_sequence()?;
            branches.push(Branch { tag, node });
            match self.peek() {
                Some('|') => {
                    self.pos += 1;
                }
                Some(c) if Some(c) == close => {
                    self.pos += 1;
                    break;
                }
                Some(c) => return Err(self.unexpected(c)),
                None => match close {
                    Some(open) => {
                        let open = if open == ']' { '[' } else { '(' };
                        return Err(GrammarError::Unbalanced {
                            pattern: self.pattern.to_string(),
                            open,
                            offset: open_offset,
                        });
                    }
                    None => break,
                },
            }
        }
        if branches.len() == 1 && branches[0].tag == 0 {
            return Ok(branches[0].node);
        }
        Ok(self.push(GrammarNode::Alternation(branches)))
    }

    /// `N¦` at the start of a branch.
    fn parse_tag(&mut self) -> u32 {
        let start = self.pos;
        let mut end = start;
        while self.chars.get(end).is_some_and(|(_, c)| c.is_ascii_digit()) {
            end += 1;
        }
        if end == start || self.chars.get(end).map(|(_, c)| *c) != Some('¦') {
            return 0;
        }
        let digits: String = self.chars[start..end].iter().map(|(_, c)| *c).collect();
        match digits.parse::<u32>() {
            Ok(tag) => {
                self.pos = end + 1;
                tag
            }
            Err(_) => 0,
        }
    }

    fn parse_sequence(&mut self) -> Result<NodeId, GrammarError> {
        let mut items: Vec<NodeId> = Vec::new();
        let mut text = String::new();

        while let Some(c) = self.peek() {
            match c {
                '|' | ')' | ']' => break,
                '\\' => {
                    self.pos += 1;
                    match self.peek() {
                        Some(escaped) => {
                            text.push(escaped);
                            self.pos += 1;
                        }
                        None => text.push('\\'),
                    }
                }
                '[' | '(' => {
                    self.flush_literal(&mut text, &mut items);
                    let open_offset = self.offset();
                    self.pos += 1;
                    if c == '[' {
                        let inner = self.parse_choice(Some(']'), open_offset)?;
                        items.push(self.push(GrammarNode::Optional(inner)));
                    } else {
                        items.push(self.parse_choice(Some(')'), open_offset)?);
                    }
                }
                '%' => {
                    self.flush_literal(&mut text, &mut items);
                    items.push(self.parse_placeholder()?);
                }
                '<' => {
                    self.flush_literal(&mut text, &mut items);
                    items.push(self.parse_capture()?);
                }
                '>' | '¦' => return Err(self.unexpected(c)),
                _ => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
        self.flush_literal(&mut text, &mut items);

        if items.len() == 1 {
            return Ok(items[0]);
        }
        Ok(self.push(GrammarNode::Sequence(items)))
    }

    fn flush_literal(&mut self, text: &mut String, items: &mut Vec<NodeId>) {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        text.clear();
        if !normalized.is_empty() {
            items.push(self.push(GrammarNode::Literal(normalized)));
        }
    }

    /// Read raw text up to the unescaped `close`; the opening char is consumed.
    fn read_delimited(&mut self, open: char, close: char) -> Result<String, GrammarError> {
        let open_offset = self.offset();
        self.pos += 1;
        let mut body = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(GrammarError::Unbalanced { pattern: self.pattern.to_string(), open, offset: open_offset });
                }
                Some('\\') if self.chars.get(self.pos + 1).map(|(_, c)| *c) == Some(close) => {
                    body.push(close);
                    self.pos += 2;
                }
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok(body);
                }
                Some(c) => {
                    body.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_placeholder(&mut self) -> Result<NodeId, GrammarError> {
        let body = self.read_delimited('%', '%')?;
        let mut spec = body.trim();
        let mut flags = PlaceholderFlags::empty();
        if let Some(rest) = spec.strip_prefix('*') {
            flags |= PlaceholderFlags::LITERAL_ONLY;
            spec = rest.trim();
        }
        if spec.is_empty() {
            return Err(GrammarError::EmptyPlaceholder { pattern: self.pattern.to_string() });
        }

        let mut types = Vec::new();
        for name in spec.split('/') {
            let (ty, plural) = self
                .types
                .lookup(name)
                .ok_or_else(|| GrammarError::UnknownType { pattern: self.pattern.to_string(), name: name.trim().to_string() })?;
            if plural {
                flags |= PlaceholderFlags::PLURAL;
            }
            types.push(ty);
        }

        let placeholder = Placeholder { index: self.placeholders, types: TypeSet::from_types(types), flags };
        self.placeholders += 1;
        self.slots.push(Slot::Placeholder(placeholder));
        let slot = self.slots.len() - 1;
        Ok(self.push(GrammarNode::Placeholder(slot)))
    }

    fn parse_capture(&mut self) -> Result<NodeId, GrammarError> {
        let body = self.read_delimited('<', '>')?;
        let regex = Regex::new(&format!("(?i)^(?:{})$", body)).map_err(|err| GrammarError::InvalidRegex {
            pattern: self.pattern.to_string(),
            regex: body.clone(),
            reason: err.to_string(),
        })?;
        self.slots.push(Slot::Capture(self.captures));
        self.captures += 1;
        let slot = self.slots.len() - 1;
        Ok(self.push(GrammarNode::FreeCapture { slot, regex }))
    }
}

/// Literal fragments that appear in every expansion rooted at `id`.
fn required_fragments(nodes: &[GrammarNode], id: NodeId) -> Vec<String> {
    match &nodes[id] {
        GrammarNode::Literal(text) => vec![text.clone()],
        GrammarNode::Sequence(children) => children.iter().flat_map(|c| required_fragments(nodes, *c)).collect(),
        GrammarNode::Optional(_) | GrammarNode::Placeholder(_) | GrammarNode::FreeCapture { .. } => Vec::new(),
        GrammarNode::Alternation(branches) => {
            let mut sets = branches.iter().map(|b| required_fragments(nodes, b.node));
            let Some(mut common) = sets.next() else {
                return Vec::new();
            };
            for set in sets {
                common.retain(|f| set.contains(f));
            }
            common
        }
    }
}
