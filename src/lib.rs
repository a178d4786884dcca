//! Pattern-driven interpreter core for Skript-style scripts.
//!
//! ```text
//! on join:
//!     set {greeting} to "hello %event-player%"
//!     all entities aren't in lava
//!     add 1 to {joins}
//! ```
//!
//! - [`Grammar`] / [`Matcher`]: the pattern mini-language constructs use to
//!   describe their syntax, and exhaustive matching of it against text.
//! - [`Registry`]: types, constructs and events, frozen before loading.
//! - [`Loader`] / [`Script`]: type-directed parsing into execution trees.
//! - [`Node`] / [`MultiResult`]: evaluation, constant folding and the
//!   universal quantifier conditions use.
//!
//! Hosts register their own types (`TypeInfo`), constructs (`construct!` or
//! [`ConstructSpec`]) and events on a [`RegistryBuilder`], then load and
//! dispatch scripts against an [`Environment`] and a [`Context`].

#[macro_use]
mod macros;
mod api;
mod elements;
mod engine;
mod error;
mod grammar;
mod node;
mod value;

pub use api::{
    LoadDetails, LoadVerbose, Options, StatementSummary, TriggerSummary, load, load_verbose_with, load_with,
    parse_statement,
};
pub use elements::{
    ArithOp, Arithmetic, ChangeVariable, Equality, EventValue, IsSet, Now, NumberOrder, ParseDate, PropertyCondition,
    TextTemplate, Variable, register_core, register_property_condition,
};
pub use engine::{
    Bindings, Builder, Construct, ConstructId, ConstructKind, ConstructSpec, Converter, EventInfo, Fallback,
    LiteralParser, LoadMetrics, Loader, Outcome, Registry, RegistryBuilder, Script, SemanticType, Statement, Syntax,
    Trigger, TriggerInfo, TypeInfo, TypeRegistry, TypeSet,
};
pub use error::{EvalResult, EvaluationError, GrammarError, ParseError, ParseResult, RegistryError};
pub use grammar::{
    Binding, Branch, Grammar, GrammarNode, MatchResult, Matcher, NodeId, ParseMark, Placeholder, PlaceholderFlags, Slot,
    SlotId,
};
pub use node::{
    Coercion, Context, Conversion, EmptyContext, Environment, EventContext, ExpressionList, MultiResult, Node,
    Operation, Scope,
};
pub use value::{HostObject, Value};
