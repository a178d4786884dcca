//! Conditions.
//!
//! Every condition here reduces its subject with the same rule:
//! `subjects.check(predicate, positive)`, where `positive` comes from which
//! pattern matched ("is"/"are" vs "isn't"/"aren't"), never from the
//! predicate itself.

use crate::engine::{Bindings, Builder, ConstructKind, ConstructSpec, RegistryBuilder, SemanticType};
use crate::error::{EvalResult, ParseResult, RegistryError};
use crate::node::{MultiResult, Node, Operation, Scope};
use crate::value::Value;
use std::sync::Arc;

const IS: &str = "(is|are)";
const IS_NOT: &str = "(isn't|is not|aren't|are not)";

/// `%objects% is [equal to] %objects%`: every subject equals every object.
#[derive(Debug)]
pub struct Equality {
    subject: Node,
    object: Node,
    positive: bool,
}

impl Operation for Equality {
    fn name(&self) -> &'static str {
        "equality"
    }

    fn result_type(&self) -> SemanticType {
        SemanticType::BOOLEAN
    }

    fn operands(&self) -> Vec<&Node> {
        vec![&self.subject, &self.object]
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        let objects = self.object.evaluate_multi(scope.env, scope.ctx)?.into_vec();
        let subjects = self.subject.evaluate_multi(scope.env, scope.ctx)?;
        let holds = subjects.check(|s| objects.iter().all(|o| o == s), self.positive);
        Ok(MultiResult::single(Value::Boolean(holds)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ordering {
    Greater,
    Less,
}

/// `%numbers% is greater/less than %number%`.
#[derive(Debug)]
pub struct NumberOrder {
    subject: Node,
    bound: Node,
    ordering: Ordering,
    positive: bool,
}

impl Operation for NumberOrder {
    fn name(&self) -> &'static str {
        match self.ordering {
            Ordering::Greater => "greater than",
            Ordering::Less => "less than",
        }
    }

    fn result_type(&self) -> SemanticType {
        SemanticType::BOOLEAN
    }

    fn operands(&self) -> Vec<&Node> {
        vec![&self.subject, &self.bound]
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        let bound = self.bound.evaluate(scope.env, scope.ctx)?.as_number().unwrap_or(f64::NAN);
        let ordering = self.ordering;
        let subjects = self.subject.evaluate_multi(scope.env, scope.ctx)?;
        let holds = subjects.check(
            |v| match (v.as_number(), ordering) {
                (Some(n), Ordering::Greater) => n > bound,
                (Some(n), Ordering::Less) => n < bound,
                (None, _) => false,
            },
            self.positive,
        );
        Ok(MultiResult::single(Value::Boolean(holds)))
    }
}

/// `%objects% is set`: the subject yields at least one value.
#[derive(Debug)]
pub struct IsSet {
    subject: Node,
    positive: bool,
}

impl Operation for IsSet {
    fn name(&self) -> &'static str {
        "is set"
    }

    fn result_type(&self) -> SemanticType {
        SemanticType::BOOLEAN
    }

    fn operands(&self) -> Vec<&Node> {
        vec![&self.subject]
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        let set = self.subject.evaluate_multi(scope.env, scope.ctx)?.first().is_some();
        Ok(MultiResult::single(Value::Boolean(set == self.positive)))
    }
}

/// A per-value property of the host world ("in lava", "alive", ...).
#[derive(Debug)]
pub struct PropertyCondition {
    property: &'static str,
    subject: Node,
    check: fn(&Value) -> bool,
    positive: bool,
}

impl Operation for PropertyCondition {
    fn name(&self) -> &'static str {
        self.property
    }

    fn result_type(&self) -> SemanticType {
        SemanticType::BOOLEAN
    }

    fn operands(&self) -> Vec<&Node> {
        vec![&self.subject]
    }

    // Properties read host state.
    fn is_pure(&self) -> bool {
        false
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        let holds = self.subject.evaluate_multi(scope.env, scope.ctx)?.check(self.check, self.positive);
        Ok(MultiResult::single(Value::Boolean(holds)))
    }
}

/// Pattern 0 is the positive form, pattern 1 the negated one.
fn positive(b: &Bindings<'_>) -> bool {
    b.pattern == 0
}

pub(super) fn number_order() -> ConstructSpec {
    construct! {
        name: "number order",
        kind: Condition,
        returns: "boolean",
        patterns: [
            format!("%numbers% {} (1¦greater|2¦less) than %number%", IS),
            format!("%numbers% {} (1¦greater|2¦less) than %number%", IS_NOT),
        ],
        build: |b| {
            let ordering = if b.has(1) { Ordering::Greater } else { Ordering::Less };
            let (Some(subject), Some(bound)) = (b.take(0), b.take(1)) else {
                return Ok(None);
            };
            Ok(Some(b.node(NumberOrder { subject, bound, ordering, positive: positive(&b) })))
        },
    }
}

pub(super) fn is_set() -> ConstructSpec {
    construct! {
        name: "is set",
        kind: Condition,
        returns: "boolean",
        patterns: [format!("%objects% {} set", IS), format!("%objects% {} set", IS_NOT)],
        build: |b| {
            let Some(subject) = b.take(0) else {
                return Ok(None);
            };
            Ok(Some(b.node(IsSet { subject, positive: positive(&b) })))
        },
    }
}

pub(super) fn equality() -> ConstructSpec {
    construct! {
        name: "equality",
        kind: Condition,
        returns: "boolean",
        patterns: [
            format!("%objects% {} [equal to] %objects%", IS),
            format!("%objects% {} [equal to] %objects%", IS_NOT),
        ],
        build: |b| {
            let (Some(subject), Some(object)) = (b.take(0), b.take(1)) else {
                return Ok(None);
            };
            Ok(Some(b.node(Equality { subject, object, positive: positive(&b) })))
        },
    }
}

/// Register `<subjects> is/are <property>` and its negated forms.
///
/// `subject` names a registered type (singular); the generated placeholder
/// uses its plural form so lists and plural expressions are accepted.
pub fn register_property_condition(
    builder: &mut RegistryBuilder,
    name: &'static str,
    subject: &str,
    property: &'static str,
    check: fn(&Value) -> bool,
) -> Result<(), RegistryError> {
    let ty = builder.types().lookup(subject).map(|(ty, _)| ty).ok_or_else(|| RegistryError::UnknownType(subject.to_string()))?;
    let plural = builder.types().plural_name(ty).to_string();
    let build: Builder = Arc::new(move |mut b: Bindings<'_>| -> ParseResult<Option<Node>> {
        let Some(subject) = b.take(0) else {
            return Ok(None);
        };
        Ok(Some(b.node(PropertyCondition { property: name, subject, check, positive: positive(&b) })))
    });
    let spec = ConstructSpec::new(name, ConstructKind::Condition, "boolean")
        .syntax(format!("%{}% {} {}", plural, IS, property), build.clone())
        .syntax(format!("%{}% {} {}", plural, IS_NOT, property), build);
    builder.register(spec)?;
    Ok(())
}
