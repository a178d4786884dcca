//! Event values: `[the] event-<kind>`.

use crate::engine::{ConstructSpec, SemanticType};
use crate::error::{EvalResult, EvaluationError};
use crate::node::{MultiResult, Operation, Scope};

/// Payload of the active event of one kind.
#[derive(Debug)]
pub struct EventValue {
    kind: String,
}

impl Operation for EventValue {
    fn name(&self) -> &'static str {
        "event value"
    }

    fn result_type(&self) -> SemanticType {
        SemanticType::OBJECT
    }

    fn is_pure(&self) -> bool {
        false
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        let value = scope
            .ctx
            .event(&self.kind)
            .ok_or_else(|| EvaluationError::Missing { line: scope.line, what: format!("event-{}", self.kind) })?;
        Ok(MultiResult::single(value))
    }
}

pub(super) fn event_value() -> ConstructSpec {
    construct! {
        name: "event value",
        kind: Expression,
        returns: "object",
        patterns: ["[the] event-<[a-z]+>"],
        build: |b| {
            let Some(kind) = b.capture(0) else {
                return Ok(None);
            };
            let kind = kind.to_lowercase();
            Ok(Some(b.node(EventValue { kind })))
        },
    }
}
