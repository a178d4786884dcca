//! Structural operations the loader inserts on its own.
//!
//! None of these correspond to a registered construct: they glue parsed
//! sub-expressions to the placeholders that asked for them.

use super::{MultiResult, Node, Operation, Scope};
use crate::engine::{Converter, SemanticType, TypeRegistry, TypeSet};
use crate::error::{EvalResult, EvaluationError};
use std::sync::Arc;

/// Applies a registered converter to every value of its operand.
///
/// Values the converter rejects are dropped.
#[derive(Debug)]
pub struct Conversion {
    inner: Node,
    to: SemanticType,
    convert: Converter,
}

impl Conversion {
    pub fn new(inner: Node, to: SemanticType, convert: Converter) -> Self {
        Conversion { inner, to, convert }
    }
}

impl Operation for Conversion {
    fn name(&self) -> &'static str {
        "conversion"
    }

    fn result_type(&self) -> SemanticType {
        self.to
    }

    fn is_single(&self) -> bool {
        self.inner.is_single()
    }

    fn operands(&self) -> Vec<&Node> {
        vec![&self.inner]
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        let convert = self.convert;
        Ok(self.inner.evaluate_multi(scope.env, scope.ctx)?.filter_map(move |v| convert(&v)))
    }
}

/// Narrows an `object`-typed operand to the types a placeholder accepts,
/// checking each value when it is produced.
///
/// A value of the wrong dynamic type is converted when a converter exists and
/// is otherwise an [`EvaluationError::Coercion`].
#[derive(Debug)]
pub struct Coercion {
    inner: Node,
    target: TypeSet,
    types: Arc<TypeRegistry>,
}

impl Coercion {
    pub fn new(inner: Node, target: TypeSet, types: Arc<TypeRegistry>) -> Self {
        Coercion { inner, target, types }
    }
}

impl Operation for Coercion {
    fn name(&self) -> &'static str {
        "coercion"
    }

    fn result_type(&self) -> SemanticType {
        self.target.iter().next().unwrap_or(SemanticType::OBJECT)
    }

    fn is_single(&self) -> bool {
        self.inner.is_single()
    }

    fn operands(&self) -> Vec<&Node> {
        vec![&self.inner]
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        // Checked eagerly: a lazy sequence has no channel to report errors.
        let mut out = Vec::new();
        for value in self.inner.evaluate_multi(scope.env, scope.ctx)? {
            let ty = self.types.type_of(&value).unwrap_or(SemanticType::OBJECT);
            if self.types.accepts(&self.target, ty) {
                out.push(value);
                continue;
            }
            let converted = self.types.converter_into(ty, &self.target).and_then(|(_, convert)| convert(&value));
            match converted {
                Some(v) => out.push(v),
                None => {
                    return Err(EvaluationError::Coercion {
                        line: scope.line,
                        value: value.to_string(),
                        expected: self.types.describe(&self.target),
                    });
                }
            }
        }
        Ok(MultiResult::from_vec(out))
    }
}

/// `a, b and c`: every item's values, in order.
#[derive(Debug)]
pub struct ExpressionList {
    items: Vec<Node>,
    result: SemanticType,
}

impl ExpressionList {
    pub fn new(items: Vec<Node>, result: SemanticType) -> Self {
        ExpressionList { items, result }
    }
}

impl Operation for ExpressionList {
    fn name(&self) -> &'static str {
        "list"
    }

    fn result_type(&self) -> SemanticType {
        self.result
    }

    fn is_single(&self) -> bool {
        false
    }

    fn operands(&self) -> Vec<&Node> {
        self.items.iter().collect()
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        let mut all = MultiResult::empty();
        for item in &self.items {
            all = all.chain(item.evaluate_multi(scope.env, scope.ctx)?);
        }
        Ok(all)
    }
}
