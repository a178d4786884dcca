//! Execution nodes.
//!
//! Parsing produces a tree of [`Node`]s. A node is either *live* (an
//! [`Operation`] that owns its operand nodes and computes values on demand) or
//! *constant* (values computed once, at construction).
//!
//! ## Precomputation
//!
//! `Node::new` applies one rule, uniformly, to every operation:
//!
//! ```text
//! op.is_pure() && every operand is constant
//!     ├─ yes ─▶ evaluate now (detached environment, empty context)
//!     │         └─▶ Node { body: Constant(values) }   op + operands dropped
//!     └─ no  ──▶ Node { body: Live(op) }
//! ```
//!
//! Leaves with no operands fold as soon as they are pure, so literals become
//! constants and any pure expression built only from literals collapses into
//! a single constant. An operation that reads ambient state (event, player,
//! wall clock, randomness, variables, host world) must report
//! `is_pure() == false`. That flag is trusted, never verified.
//!
//! Folding happens during single-threaded construction, before a tree is
//! handed to evaluators. After that a node is immutable and evaluation only
//! touches the caller-owned [`Environment`] and [`Context`].

#[path = "node/multi.rs"]
mod multi;
#[path = "node/ops.rs"]
mod ops;

pub use multi::MultiResult;
pub use ops::{Coercion, Conversion, ExpressionList};

use crate::engine::SemanticType;
use crate::error::{EvalResult, EvaluationError};
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// What triggered an evaluation.
///
/// Implemented by the host bridge. The core only asks whether an event of a
/// given kind is active and, if so, for its payload.
pub trait Context: Send + Sync {
    fn event(&self, kind: &str) -> Option<Value>;
}

/// A context with no active event.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyContext;

impl Context for EmptyContext {
    fn event(&self, _kind: &str) -> Option<Value> {
        None
    }
}

/// Map-backed context, handy for tests and the CLI.
#[derive(Debug, Default, Clone)]
pub struct EventContext {
    payloads: HashMap<String, Value>,
}

impl EventContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: impl Into<String>, payload: Value) -> Self {
        self.payloads.insert(kind.into().to_lowercase(), payload);
        self
    }
}

impl Context for EventContext {
    fn event(&self, kind: &str) -> Option<Value> {
        self.payloads.get(&kind.to_lowercase()).cloned()
    }
}

/// Script-scoped variables.
///
/// Names are case-insensitive. The lock only guards the map; evaluation order
/// between concurrent triggers is the host's business.
#[derive(Debug, Default)]
pub struct Environment {
    variables: RwLock<HashMap<String, Vec<Value>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values of `name`; empty when unset.
    pub fn get(&self, name: &str) -> Vec<Value> {
        self.variables.read().get(&name.to_lowercase()).cloned().unwrap_or_default()
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.variables.read().get(&name.to_lowercase()).is_some_and(|v| !v.is_empty())
    }

    pub fn set(&self, name: &str, values: Vec<Value>) {
        let key = name.to_lowercase();
        let mut vars = self.variables.write();
        if values.is_empty() {
            vars.remove(&key);
        } else {
            vars.insert(key, values);
        }
    }

    pub fn add(&self, name: &str, values: Vec<Value>) {
        self.variables.write().entry(name.to_lowercase()).or_default().extend(values);
    }

    pub fn delete(&self, name: &str) {
        self.variables.write().remove(&name.to_lowercase());
    }

    /// Sorted copy of every variable.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<Value>> {
        self.variables.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Everything an operation sees while evaluating.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    /// Line of the node being evaluated, for error reporting.
    pub line: usize,
    pub env: &'a Environment,
    pub ctx: &'a dyn Context,
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("line", &self.line).finish_non_exhaustive()
    }
}

/// A live computation inside a node.
///
/// Operations implement [`evaluate_multi`](Operation::evaluate_multi);
/// singular ones return a one-element [`MultiResult`]. The provided
/// [`evaluate`](Operation::evaluate) extracts the one and only element.
pub trait Operation: fmt::Debug + Send + Sync {
    /// Short label used in diagnostics.
    fn name(&self) -> &'static str;

    fn result_type(&self) -> SemanticType;

    /// False when the operation may yield several values.
    fn is_single(&self) -> bool {
        true
    }

    /// Direct operand nodes, used by the folding rule.
    fn operands(&self) -> Vec<&Node> {
        Vec::new()
    }

    /// False for anything that depends on ambient run-time state.
    fn is_pure(&self) -> bool {
        true
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>>;

    fn evaluate(&self, scope: Scope<'_>) -> EvalResult<Value> {
        single_of(self.evaluate_multi(scope)?, scope.line)
    }
}

#[derive(Debug)]
enum Body {
    Constant(Vec<Value>),
    Live(Box<dyn Operation>),
}

/// A node of the execution tree.
#[derive(Debug)]
pub struct Node {
    line: usize,
    result: SemanticType,
    single: bool,
    body: Body,
}

impl Node {
    /// Build a node, folding it to a constant when the rule allows.
    pub fn new(line: usize, op: impl Operation + 'static) -> Node {
        Self::build(line, Box::new(op), true)
    }

    /// Build a node without folding, even when it could be folded.
    pub fn unfolded(line: usize, op: impl Operation + 'static) -> Node {
        Self::build(line, Box::new(op), false)
    }

    pub(crate) fn build(line: usize, op: Box<dyn Operation>, fold: bool) -> Node {
        let result = op.result_type();
        let single = op.is_single();
        if fold && op.is_pure() && op.operands().iter().all(|n| n.is_constant()) {
            let env = Environment::new();
            let scope = Scope { line, env: &env, ctx: &EmptyContext };
            let folded: EvalResult<Vec<Value>> = op.evaluate_multi(scope).map(|values| values.collect());
            match folded {
                Ok(values) => {
                    tracing::trace!(line, op = op.name(), count = values.len(), "folded to constant");
                    return Node { line, result, single, body: Body::Constant(values) };
                }
                Err(err) => {
                    tracing::debug!(line, op = op.name(), %err, "constant evaluation failed, keeping node live");
                }
            }
        }
        Node { line, result, single, body: Body::Live(op) }
    }

    /// A constant node holding `values`.
    pub fn constant(line: usize, result: SemanticType, values: Vec<Value>) -> Node {
        let single = values.len() == 1;
        Node { line, result, single, body: Body::Constant(values) }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn result_type(&self) -> SemanticType {
        self.result
    }

    pub fn is_single(&self) -> bool {
        self.single
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.body, Body::Constant(_))
    }

    /// Folded values, if this node is constant.
    pub fn constant_values(&self) -> Option<&[Value]> {
        match &self.body {
            Body::Constant(values) => Some(values),
            Body::Live(_) => None,
        }
    }

    /// Operand nodes still owned by this node; always empty once folded.
    pub fn operands(&self) -> Vec<&Node> {
        match &self.body {
            Body::Constant(_) => Vec::new(),
            Body::Live(op) => op.operands(),
        }
    }

    pub fn name(&self) -> &'static str {
        match &self.body {
            Body::Constant(_) => "constant",
            Body::Live(op) => op.name(),
        }
    }

    pub fn evaluate_multi<'a>(&'a self, env: &'a Environment, ctx: &'a dyn Context) -> EvalResult<MultiResult<'a>> {
        match &self.body {
            Body::Constant(values) => Ok(MultiResult::from_slice(values)),
            Body::Live(op) => op.evaluate_multi(Scope { line: self.line, env, ctx }),
        }
    }

    pub fn evaluate(&self, env: &Environment, ctx: &dyn Context) -> EvalResult<Value> {
        match &self.body {
            Body::Constant(values) => single_of(MultiResult::from_slice(values), self.line),
            Body::Live(op) => op.evaluate(Scope { line: self.line, env, ctx }),
        }
    }

    /// Indented one-line-per-node rendering for diagnostics.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        match &self.body {
            Body::Constant(values) => {
                let shown: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                out.push_str(&format!("{}constant [{}]\n", indent, shown.join(", ")));
            }
            Body::Live(op) => {
                out.push_str(&format!("{}{}{}\n", indent, op.name(), if op.is_pure() { "" } else { " (impure)" }));
                for child in op.operands() {
                    child.render_into(out, depth + 1);
                }
            }
        }
    }
}

/// The one and only element of `values`.
fn single_of(mut values: MultiResult<'_>, line: usize) -> EvalResult<Value> {
    let first = values.next().ok_or_else(|| EvaluationError::Missing { line, what: "a value".to_string() })?;
    let rest = values.count();
    if rest > 0 {
        return Err(EvaluationError::NotSingle { line, count: rest + 1 });
    }
    Ok(first)
}
