//! Construct registration and indexing.
//!
//! This module holds the *static* side of the engine: every construct the
//! loader may try, with its patterns compiled once into [`Grammar`]s.
//!
//! Loading is split into two phases:
//!
//! 1. **Register** (this module): hosts describe constructs as
//!    [`ConstructSpec`]s (by hand or with `construct!`) and hand them to a
//!    [`RegistryBuilder`], which compiles every pattern against the type table
//!    and indexes constructs by kind.
//! 2. **Load** (see `loader.rs`): scripts are parsed against the frozen
//!    [`Registry`].
//!
//! ## Extension points
//!
//! - New semantic types: `RegistryBuilder::register_type` before registering
//!   constructs whose patterns name them.
//! - New converters: `RegistryBuilder::register_converter`.
//! - New events for script headers: `RegistryBuilder::register_event`.
//!
//! ## Invariants
//!
//! - `ConstructId` is an index into `Registry::constructs`; `ConstructIndex`
//!   lists ids per kind in registration order, which is also the order the
//!   loader tries them in (first registered wins).
//! - A construct's syntaxes keep their pattern order; `Bindings::pattern` is
//!   the index into that list.

use super::loader::Loader;
use super::types::{Converter, SemanticType, TypeInfo, TypeRegistry};
use crate::error::{ParseResult, RegistryError};
use crate::grammar::{Grammar, ParseMark};
use crate::node::{Node, Operation};
use std::fmt;
use std::sync::Arc;

/// Construct identifier (index into the registry's construct list).
pub type ConstructId = usize;

/// What a construct produces when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructKind {
    /// A value-producing expression.
    Expression,
    /// A boolean-producing check; a false result stops a trigger.
    Condition,
    /// A side effect; evaluates to nothing.
    Effect,
}

impl ConstructKind {
    fn slot(self) -> usize {
        match self {
            ConstructKind::Expression => 0,
            ConstructKind::Condition => 1,
            ConstructKind::Effect => 2,
        }
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConstructKind::Expression => "expression",
            ConstructKind::Condition => "condition",
            ConstructKind::Effect => "effect",
        })
    }
}

/// Everything a builder receives for one successful match.
pub struct Bindings<'l> {
    pub line: usize,
    /// Index of the pattern that matched, in registration order.
    pub pattern: usize,
    pub mark: ParseMark,
    operands: Vec<Option<Node>>,
    captures: Vec<Option<String>>,
    fold: bool,
    types: &'l Arc<TypeRegistry>,
}

impl<'l> Bindings<'l> {
    pub(crate) fn new(
        line: usize,
        pattern: usize,
        mark: ParseMark,
        operands: Vec<Option<Node>>,
        captures: Vec<Option<String>>,
        fold: bool,
        types: &'l Arc<TypeRegistry>,
    ) -> Self {
        Bindings { line, pattern, mark, operands, captures, fold, types }
    }

    /// Take the node parsed for placeholder `index`.
    ///
    /// `None` when the placeholder sat in an optional part that was absent,
    /// or when it was already taken.
    pub fn take(&mut self, index: usize) -> Option<Node> {
        self.operands.get_mut(index).and_then(Option::take)
    }

    /// Text bound to capture `index`.
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index).and_then(|c| c.as_deref())
    }

    /// True when the branch tagged `tag` took part in the match.
    pub fn has(&self, tag: ParseMark) -> bool {
        self.mark & tag == tag
    }

    pub fn types(&self) -> &Arc<TypeRegistry> {
        self.types
    }

    /// Wrap `op` in a node at this line, folding unless disabled.
    pub fn node(&self, op: impl Operation + 'static) -> Node {
        Node::build(self.line, Box::new(op), self.fold)
    }
}

impl fmt::Debug for Bindings<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("line", &self.line)
            .field("pattern", &self.pattern)
            .field("mark", &self.mark)
            .field("operands", &self.operands.len())
            .field("captures", &self.captures)
            .finish()
    }
}

/// Builds a node from a match; `Ok(None)` rejects the candidate softly.
pub type Builder = Arc<dyn for<'l> Fn(Bindings<'l>) -> ParseResult<Option<Node>> + Send + Sync>;

/// Free-form matcher tried after a construct's patterns.
///
/// Gets the raw text and the loader (for recursive parses). `Ok(None)` means
/// "not mine"; an `Err` aborts the whole load.
pub type Fallback = Arc<dyn for<'t, 'l, 'r> Fn(&'t str, &'l mut Loader<'r>) -> ParseResult<Option<Node>> + Send + Sync>;

/// Uncompiled description of a construct.
pub struct ConstructSpec {
    pub name: &'static str,
    pub kind: ConstructKind,
    /// Name of the declared result type (`"number"`, `"boolean"`, ...).
    pub returns: &'static str,
    pub syntaxes: Vec<(String, Builder)>,
    pub fallback: Option<Fallback>,
}

impl ConstructSpec {
    pub fn new(name: &'static str, kind: ConstructKind, returns: &'static str) -> Self {
        ConstructSpec { name, kind, returns, syntaxes: Vec::new(), fallback: None }
    }

    pub fn syntax(mut self, pattern: impl Into<String>, build: Builder) -> Self {
        self.syntaxes.push((pattern.into(), build));
        self
    }

    pub fn fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl fmt::Debug for ConstructSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("returns", &self.returns)
            .field("patterns", &self.syntaxes.iter().map(|(p, _)| p.as_str()).collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// One compiled pattern with its builder.
pub struct Syntax {
    pub grammar: Grammar,
    pub build: Builder,
}

/// A registered, compiled construct.
pub struct Construct {
    pub name: &'static str,
    pub kind: ConstructKind,
    pub returns: SemanticType,
    pub syntaxes: Vec<Syntax>,
    pub fallback: Option<Fallback>,
}

impl fmt::Debug for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Construct")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("returns", &self.returns)
            .field("patterns", &self.syntaxes.iter().map(|s| s.grammar.source()).collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// An event name usable in `on <event>:` headers.
#[derive(Debug)]
pub struct EventInfo {
    pub name: String,
    pub grammars: Vec<Grammar>,
}

const KIND_COUNT: usize = 3;

#[derive(Default, Debug)]
pub struct ConstructIndex {
    by_kind: [Vec<ConstructId>; KIND_COUNT],
}

/// Frozen set of constructs, types and events. `Send + Sync`, shared
/// read-only by every load.
#[derive(Debug)]
pub struct Registry {
    types: Arc<TypeRegistry>,
    constructs: Vec<Construct>,
    index: ConstructIndex,
    events: Vec<EventInfo>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry with the built-in element set.
    pub fn with_core() -> Result<Registry, RegistryError> {
        Ok(RegistryBuilder::with_core()?.build())
    }

    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    pub fn construct(&self, id: ConstructId) -> &Construct {
        &self.constructs[id]
    }

    pub fn constructs(&self) -> &[Construct] {
        &self.constructs
    }

    /// Constructs of `kind`, in registration order.
    pub fn of_kind(&self, kind: ConstructKind) -> impl Iterator<Item = &Construct> {
        self.index.by_kind[kind.slot()].iter().map(|&id| &self.constructs[id])
    }

    pub fn events(&self) -> &[EventInfo] {
        &self.events
    }

    /// Name of the first event whose grammar matches `phrase` exactly.
    pub fn resolve_event(&self, phrase: &str) -> Option<&str> {
        self.events
            .iter()
            .find(|e| e.grammars.iter().any(|g| !g.match_exact(phrase).is_empty()))
            .map(|e| e.name.as_str())
    }
}

/// Mutable registration phase. Consumed by [`build`](Self::build).
#[derive(Debug)]
pub struct RegistryBuilder {
    types: TypeRegistry,
    constructs: Vec<Construct>,
    events: Vec<EventInfo>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Built-in types only, no constructs.
    pub fn new() -> Self {
        RegistryBuilder { types: TypeRegistry::with_builtins(), constructs: Vec::new(), events: Vec::new() }
    }

    /// Built-in types plus the core element set.
    pub fn with_core() -> Result<Self, RegistryError> {
        let mut builder = Self::new();
        crate::elements::register_core(&mut builder)?;
        Ok(builder)
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn register_type(&mut self, info: TypeInfo) -> Result<SemanticType, RegistryError> {
        self.types.register(info)
    }

    /// Register a converter between two registered types, by name.
    pub fn register_converter(&mut self, from: &str, to: &str, converter: Converter) -> Result<(), RegistryError> {
        let lookup = |name: &str| self.types.lookup(name).map(|(ty, _)| ty).ok_or_else(|| RegistryError::UnknownType(name.to_string()));
        let (from, to) = (lookup(from)?, lookup(to)?);
        self.types.add_converter(from, to, converter);
        Ok(())
    }

    /// Compile and append a construct; it is tried after every construct of
    /// the same kind registered before it.
    pub fn register(&mut self, spec: ConstructSpec) -> Result<ConstructId, RegistryError> {
        if spec.syntaxes.is_empty() && spec.fallback.is_none() {
            return Err(RegistryError::EmptyConstruct(spec.name));
        }
        let returns = self.types.lookup(spec.returns).map(|(ty, _)| ty).ok_or_else(|| RegistryError::UnknownType(spec.returns.to_string()))?;
        let syntaxes = spec
            .syntaxes
            .into_iter()
            .map(|(pattern, build)| Ok(Syntax { grammar: Grammar::compile(&pattern, &self.types)?, build }))
            .collect::<Result<Vec<_>, RegistryError>>()?;

        let id = self.constructs.len();
        tracing::debug!(id, name = spec.name, kind = %spec.kind, patterns = syntaxes.len(), "registered construct");
        self.constructs.push(Construct { name: spec.name, kind: spec.kind, returns, syntaxes, fallback: spec.fallback });
        Ok(id)
    }

    /// Register an event usable as `on <pattern>:`.
    pub fn register_event(&mut self, name: &str, patterns: &[&str]) -> Result<(), RegistryError> {
        let grammars = patterns.iter().map(|p| Grammar::compile(p, &self.types)).collect::<Result<Vec<_>, _>>()?;
        self.events.push(EventInfo { name: name.to_lowercase(), grammars });
        Ok(())
    }

    pub fn build(self) -> Registry {
        let mut index = ConstructIndex::default();
        for (id, construct) in self.constructs.iter().enumerate() {
            index.by_kind[construct.kind.slot()].push(id);
        }
        Registry { types: Arc::new(self.types), constructs: self.constructs, index, events: self.events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrammarError;

    fn noop() -> Builder {
        Arc::new(|_b: Bindings<'_>| -> ParseResult<Option<Node>> { Ok(None) })
    }

    #[test]
    fn constructs_are_indexed_by_kind_in_registration_order() {
        let mut builder = RegistryBuilder::new();
        builder.register(ConstructSpec::new("a", ConstructKind::Expression, "number").syntax("a", noop())).unwrap();
        builder.register(ConstructSpec::new("b", ConstructKind::Effect, "object").syntax("b", noop())).unwrap();
        builder.register(ConstructSpec::new("c", ConstructKind::Expression, "text").syntax("c", noop())).unwrap();
        let registry = builder.build();

        let names: Vec<&str> = registry.of_kind(ConstructKind::Expression).map(|c| c.name).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(registry.of_kind(ConstructKind::Effect).count(), 1);
        assert_eq!(registry.of_kind(ConstructKind::Condition).count(), 0);
    }

    #[test]
    fn registration_errors() {
        let mut builder = RegistryBuilder::new();
        assert_eq!(
            builder.register(ConstructSpec::new("empty", ConstructKind::Expression, "number")).unwrap_err(),
            RegistryError::EmptyConstruct("empty")
        );
        assert_eq!(
            builder.register(ConstructSpec::new("x", ConstructKind::Expression, "creeper").syntax("x", noop())).unwrap_err(),
            RegistryError::UnknownType("creeper".into())
        );
        assert!(matches!(
            builder.register(ConstructSpec::new("y", ConstructKind::Expression, "number").syntax("[y", noop())),
            Err(RegistryError::Grammar(GrammarError::Unbalanced { .. }))
        ));
        assert_eq!(builder.register_converter("number", "creeper", |v| Some(v.clone())).unwrap_err(), RegistryError::UnknownType("creeper".into()));
        assert_eq!(builder.register_type(TypeInfo::new("Number", "nums")).unwrap_err(), RegistryError::DuplicateType("Number".into()));
    }

    #[test]
    fn events_resolve_by_grammar() {
        let mut builder = RegistryBuilder::new();
        builder.register_event("join", &["[player] join[ing]"]).unwrap();
        builder.register_event("break", &["[block] break[ing]", "mine"]).unwrap();
        let registry = builder.build();
        assert_eq!(registry.resolve_event("player join"), Some("join"));
        assert_eq!(registry.resolve_event("Mine"), Some("break"));
        assert_eq!(registry.resolve_event("quit"), None);
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
