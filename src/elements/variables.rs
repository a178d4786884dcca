//! Variables and the effects that change them.
//!
//! `{name}` holds one value, `{name::*}` a list. Both live in the
//! [`Environment`](crate::Environment) under their full name, so `{x}` and
//! `{x::*}` are unrelated.

use crate::engine::{ConstructSpec, SemanticType};
use crate::error::{EvalResult, EvaluationError};
use crate::node::{MultiResult, Node, Operation, Scope};
use crate::value::Value;

const NAME: &str = r"\{<[^{}]+>\}";

fn is_list(name: &str) -> bool {
    name.ends_with("::*")
}

/// Reads a variable. Unset variables yield nothing.
#[derive(Debug)]
pub struct Variable {
    name: String,
}

impl Operation for Variable {
    fn name(&self) -> &'static str {
        "variable"
    }

    fn result_type(&self) -> SemanticType {
        SemanticType::OBJECT
    }

    fn is_single(&self) -> bool {
        !is_list(&self.name)
    }

    fn is_pure(&self) -> bool {
        false
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        Ok(MultiResult::from_vec(scope.env.get(&self.name)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Set,
    Add,
    Delete,
}

/// `set`, `add` and `delete` on one variable.
#[derive(Debug)]
pub struct ChangeVariable {
    change: Change,
    name: String,
    value: Option<Node>,
}

impl ChangeVariable {
    fn add(&self, scope: Scope<'_>, values: Vec<Value>) -> EvalResult<()> {
        if is_list(&self.name) {
            scope.env.add(&self.name, values);
            return Ok(());
        }
        // Adding to a single variable is numeric; unset counts as 0.
        let number = |v: &Value| {
            v.as_number().ok_or_else(|| EvaluationError::Coercion {
                line: scope.line,
                value: v.to_string(),
                expected: "number".to_string(),
            })
        };
        let mut total = match scope.env.get(&self.name).first() {
            Some(current) => number(current)?,
            None => 0.0,
        };
        for v in &values {
            total += number(v)?;
        }
        scope.env.set(&self.name, vec![Value::Number(total)]);
        Ok(())
    }
}

impl Operation for ChangeVariable {
    fn name(&self) -> &'static str {
        match self.change {
            Change::Set => "set",
            Change::Add => "add",
            Change::Delete => "delete",
        }
    }

    fn result_type(&self) -> SemanticType {
        SemanticType::OBJECT
    }

    fn operands(&self) -> Vec<&Node> {
        self.value.iter().collect()
    }

    fn is_pure(&self) -> bool {
        false
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        let values = match &self.value {
            Some(node) => node.evaluate_multi(scope.env, scope.ctx)?.into_vec(),
            None => Vec::new(),
        };
        tracing::trace!(line = scope.line, op = self.name(), variable = %self.name, count = values.len(), "change variable");
        match self.change {
            Change::Set if !is_list(&self.name) && values.len() > 1 => {
                return Err(EvaluationError::NotSingle { line: scope.line, count: values.len() });
            }
            Change::Set => scope.env.set(&self.name, values),
            Change::Add => self.add(scope, values)?,
            Change::Delete => scope.env.delete(&self.name),
        }
        Ok(MultiResult::empty())
    }
}

pub(super) fn variable() -> ConstructSpec {
    construct! {
        name: "variable",
        kind: Expression,
        returns: "object",
        patterns: [NAME],
        build: |b| {
            let Some(name) = b.capture(0) else {
                return Ok(None);
            };
            let name = name.trim().to_string();
            Ok(Some(b.node(Variable { name })))
        },
    }
}

pub(super) fn change_variable() -> ConstructSpec {
    construct! {
        name: "change variable",
        kind: Effect,
        returns: "object",
        patterns: [
            format!("set {} to %objects%", NAME),
            format!("add %objects% to {}", NAME),
            format!("(delete|clear|reset) {}", NAME),
        ],
        build: |b| {
            let change = match b.pattern {
                0 => Change::Set,
                1 => Change::Add,
                _ => Change::Delete,
            };
            let Some(name) = b.capture(0).map(|n| n.trim().to_string()) else {
                return Ok(None);
            };
            let value = b.take(0);
            if change != Change::Delete && value.is_none() {
                return Ok(None);
            }
            Ok(Some(b.node(ChangeVariable { change, name, value })))
        },
    }
}
