//! Binary arithmetic on numbers.
//!
//! `%number% (1¦+|2¦-|3¦*|4¦/) %number%`. Placeholders take their shortest
//! span first, so chains group to the right: `2 * 3 + 1` is `2 * (3 + 1)`.
//! Parenthesize to override.

use crate::engine::{ConstructSpec, SemanticType};
use crate::error::{EvalResult, EvaluationError};
use crate::node::{MultiResult, Node, Operation, Scope};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn from_mark(mark: u32) -> Option<Self> {
        match mark {
            1 => Some(ArithOp::Add),
            2 => Some(ArithOp::Sub),
            3 => Some(ArithOp::Mul),
            4 => Some(ArithOp::Div),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Arithmetic {
    op: ArithOp,
    left: Node,
    right: Node,
}

impl Operation for Arithmetic {
    fn name(&self) -> &'static str {
        match self.op {
            ArithOp::Add => "add",
            ArithOp::Sub => "subtract",
            ArithOp::Mul => "multiply",
            ArithOp::Div => "divide",
        }
    }

    fn result_type(&self) -> SemanticType {
        SemanticType::NUMBER
    }

    fn operands(&self) -> Vec<&Node> {
        vec![&self.left, &self.right]
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        let number = |node: &Node| -> EvalResult<f64> {
            let value = node.evaluate(scope.env, scope.ctx)?;
            value.as_number().ok_or_else(|| EvaluationError::Coercion {
                line: scope.line,
                value: value.to_string(),
                expected: "number".to_string(),
            })
        };
        let (a, b) = (number(&self.left)?, number(&self.right)?);
        let result = match self.op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div if b == 0.0 => {
                return Err(EvaluationError::Failed { line: scope.line, reason: "division by zero".to_string() });
            }
            ArithOp::Div => a / b,
        };
        Ok(MultiResult::single(Value::Number(result)))
    }
}

pub(super) fn arithmetic() -> ConstructSpec {
    construct! {
        name: "arithmetic",
        kind: Expression,
        returns: "number",
        patterns: ["%number% (1¦+|2¦-|3¦*|4¦/) %number%"],
        build: |b| {
            let Some(op) = ArithOp::from_mark(b.mark) else {
                return Ok(None);
            };
            let (Some(left), Some(right)) = (b.take(0), b.take(1)) else {
                return Ok(None);
            };
            Ok(Some(b.node(Arithmetic { op, left, right })))
        },
    }
}
