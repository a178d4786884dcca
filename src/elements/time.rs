//! Wall-clock time.

use crate::engine::{ConstructSpec, SemanticType};
use crate::error::{EvalResult, EvaluationError};
use crate::node::{MultiResult, Node, Operation, Scope};
use crate::value::Value;
use chrono::Local;
use chrono_english::{Dialect, parse_date_string};

#[derive(Debug)]
pub struct Now;

impl Operation for Now {
    fn name(&self) -> &'static str {
        "now"
    }

    fn result_type(&self) -> SemanticType {
        SemanticType::DATE
    }

    fn is_pure(&self) -> bool {
        false
    }

    fn evaluate_multi<'a>(&'a self, _scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        Ok(MultiResult::single(Value::Date(Local::now().naive_local())))
    }
}

/// `"next friday" parsed as a date`, resolved against the current time.
#[derive(Debug)]
pub struct ParseDate {
    text: Node,
}

impl Operation for ParseDate {
    fn name(&self) -> &'static str {
        "parse date"
    }

    fn result_type(&self) -> SemanticType {
        SemanticType::DATE
    }

    fn operands(&self) -> Vec<&Node> {
        vec![&self.text]
    }

    // Relative phrases depend on the clock.
    fn is_pure(&self) -> bool {
        false
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        let text = self.text.evaluate(scope.env, scope.ctx)?.to_string();
        let parsed = parse_date_string(&text, Local::now(), Dialect::Us)
            .map_err(|err| EvaluationError::Failed { line: scope.line, reason: format!("can't read \"{}\" as a date: {}", text, err) })?;
        Ok(MultiResult::single(Value::Date(parsed.naive_local())))
    }
}

pub(super) fn now() -> ConstructSpec {
    construct! {
        name: "now",
        kind: Expression,
        returns: "date",
        patterns: ["now"],
        build: |b| { Ok(Some(b.node(Now))) },
    }
}

pub(super) fn parse_date() -> ConstructSpec {
    construct! {
        name: "parse date",
        kind: Expression,
        returns: "date",
        patterns: ["%text% parsed as [a] date"],
        build: |b| {
            let Some(text) = b.take(0) else {
                return Ok(None);
            };
            Ok(Some(b.node(ParseDate { text })))
        },
    }
}
