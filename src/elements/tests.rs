use super::*;
use crate::Options;
use crate::engine::{Loader, Outcome, Registry, Script, SemanticType, TypeInfo, TypeSet};
use crate::error::{EvalResult, EvaluationError, ParseError};
use crate::node::{EmptyContext, Environment, EventContext, MultiResult, Operation, Scope};
use crate::value::{HostObject, Value};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::any::Any;
use std::sync::Arc;

#[derive(Debug)]
struct Mob {
    name: &'static str,
    in_lava: bool,
}

impl HostObject for Mob {
    fn type_name(&self) -> &str {
        "entity"
    }

    fn display(&self) -> String {
        self.name.to_string()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `all entities`: whatever the test world holds.
#[derive(Debug)]
struct AllEntities {
    ty: SemanticType,
    mobs: Arc<Vec<Value>>,
}

impl Operation for AllEntities {
    fn name(&self) -> &'static str {
        "all entities"
    }

    fn result_type(&self) -> SemanticType {
        self.ty
    }

    fn is_single(&self) -> bool {
        false
    }

    fn is_pure(&self) -> bool {
        false
    }

    fn evaluate_multi<'a>(&'a self, _scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        Ok(MultiResult::from_slice(&self.mobs))
    }
}

fn core() -> Registry {
    Registry::with_core().unwrap()
}

/// Core elements plus an `entity` type, `all entities` and `in lava`.
fn world(mobs: Vec<Value>) -> Registry {
    let mut builder = RegistryBuilder::with_core().unwrap();
    builder.register_type(TypeInfo::new("entity", "entities")).unwrap();
    let mobs = Arc::new(mobs);
    builder
        .register(construct! {
            name: "all entities",
            kind: Expression,
            returns: "entity",
            patterns: ["all entities"],
            build: |b| {
                let ty = b.types().lookup("entity").map(|(ty, _)| ty).unwrap_or(SemanticType::OBJECT);
                Ok(Some(b.node(AllEntities { ty, mobs: mobs.clone() })))
            },
        })
        .unwrap();
    register_property_condition(&mut builder, "in lava", "entity", "in lava", |v| {
        v.downcast_ref::<Mob>().is_some_and(|m| m.in_lava)
    })
    .unwrap();
    builder.build()
}

fn mob(name: &'static str, in_lava: bool) -> Value {
    Value::object(Mob { name, in_lava })
}

fn expression(registry: &Registry, options: &Options, text: &str, want: SemanticType) -> crate::Node {
    let mut loader = Loader::new(registry, options);
    loader.parse_expression(text, &TypeSet::of(want), true).unwrap().unwrap()
}

fn condition(registry: &Registry, text: &str) -> Value {
    let options = Options::default();
    let mut loader = Loader::new(registry, &options);
    let node = loader.parse_condition(text).unwrap().unwrap();
    node.evaluate(&Environment::new(), &EmptyContext).unwrap()
}

#[test]
fn number_literal_is_constant() {
    let reg = core();
    let node = expression(&reg, &Options::default(), "5", SemanticType::NUMBER);
    assert_eq!(node.constant_values(), Some(&[Value::Number(5.0)][..]));
}

#[test]
fn arithmetic_folds_and_groups_right() {
    let reg = core();
    let opts = Options::default();
    let cases = [("1 + 2 * 3", 7.0), ("2 * 3 + 1", 8.0), ("(2 * 3) + 1", 7.0), ("10 - 4 - 3", 9.0), ("9 / 3", 3.0)];
    for (text, expected) in cases {
        let node = expression(&reg, &opts, text, SemanticType::NUMBER);
        assert_eq!(node.constant_values(), Some(&[Value::Number(expected)][..]), "{}", text);
    }
}

#[test]
fn division_by_zero_stays_live_and_fails_at_run_time() {
    let reg = core();
    let node = expression(&reg, &Options::default(), "1 / 0", SemanticType::NUMBER);
    assert!(!node.is_constant());
    let err = node.evaluate(&Environment::new(), &EmptyContext).unwrap_err();
    assert_eq!(err, EvaluationError::Failed { line: 1, reason: "division by zero".to_string() });
}

#[test]
fn folding_can_be_disabled() {
    let reg = core();
    let opts = Options { fold_constants: false, ..Options::default() };
    let node = expression(&reg, &opts, "1 + 2", SemanticType::NUMBER);
    assert!(!node.is_constant());
    assert_eq!(node.evaluate(&Environment::new(), &EmptyContext).unwrap(), Value::Number(3.0));
}

#[test]
fn numbers_convert_to_text() {
    let reg = core();
    let node = expression(&reg, &Options::default(), "2 + 2", SemanticType::TEXT);
    assert_eq!(node.result_type(), SemanticType::TEXT);
    assert_eq!(node.constant_values(), Some(&[Value::text("4")][..]));
}

#[test]
fn plural_property_condition_quantifies_over_every_element() {
    let reg = world(vec![mob("zombie", true), mob("skeleton", false), mob("spider", true)]);
    assert_eq!(condition(&reg, "all entities are in lava"), Value::Boolean(false));
    assert_eq!(condition(&reg, "all entities aren't in lava"), Value::Boolean(true));

    let reg = world(vec![mob("zombie", true), mob("spider", true)]);
    assert_eq!(condition(&reg, "all entities are in lava"), Value::Boolean(true));
    assert_eq!(condition(&reg, "all entities are not in lava"), Value::Boolean(false));
}

#[test]
fn empty_subject_is_vacuously_true() {
    let reg = world(Vec::new());
    assert_eq!(condition(&reg, "all entities are in lava"), Value::Boolean(true));
    assert_eq!(condition(&reg, "all entities aren't in lava"), Value::Boolean(false));
}

#[test]
fn property_conditions_are_never_folded() {
    let reg = world(vec![mob("zombie", true)]);
    let options = Options::default();
    let mut loader = Loader::new(&reg, &options);
    let node = loader.parse_condition("all entities are in lava").unwrap().unwrap();
    assert!(!node.is_constant());
    assert_eq!(node.render(), "in lava (impure)\n  all entities (impure)\n");
}

#[test]
fn list_equality() {
    let reg = core();
    let cases = [
        ("1 and 1 is 1", true),
        ("1 and 2 is 1", false),
        ("1 and 2 isn't 1", true),
        ("1, 1 and 1 are equal to 1", true),
        ("\"a\" is \"A\"", true),
        ("3 is greater than 2", true),
        ("1 and 5 are less than 4", false),
        ("1 and 5 are not less than 4", true),
    ];
    for (text, expected) in cases {
        assert_eq!(condition(&reg, text), Value::Boolean(expected), "{}", text);
    }
}

#[test]
fn pure_conditions_fold() {
    let reg = core();
    let options = Options::default();
    let mut loader = Loader::new(&reg, &options);
    let node = loader.parse_condition("1 + 1 is 2").unwrap().unwrap();
    assert_eq!(node.constant_values(), Some(&[Value::Boolean(true)][..]));
}

#[test]
fn unterminated_text_is_malformed() {
    let reg = core();
    let err = Script::load(&reg, "on join:\n    set {x} to 1\n    set {y} to \"abc\n", &Options::default()).unwrap_err();
    assert!(matches!(err, ParseError::Malformed { line: 3, .. }), "{:?}", err);
}

#[test]
fn unknown_interpolation_is_malformed() {
    let reg = core();
    let err = Script::load(&reg, "on join:\n    set {x} to \"hi %flying pigs%\"\n", &Options::default()).unwrap_err();
    assert!(matches!(err, ParseError::Malformed { line: 2, .. }), "{:?}", err);
}

#[test]
fn nesting_past_the_limit_is_too_deep() {
    let reg = core();
    let opts = Options { max_depth: 2, ..Options::default() };
    let mut loader = Loader::new(&reg, &opts);
    let err = loader.parse_expression("1 + 2 + 3 + 4", &TypeSet::of(SemanticType::NUMBER), false).unwrap_err();
    assert_eq!(err, ParseError::TooDeep { line: 1, depth: 2 });
}

#[test]
fn text_interpolates_event_values() {
    let reg = core();
    let source = "on join:\n    set {greeting} to \"hello %event-player%, 100%% \"\"welcome\"\"\"\n";
    let script = Script::load(&reg, source, &Options::default()).unwrap();
    let env = Environment::new();
    let ctx = EventContext::new().with("player", Value::text("Steve"));

    assert_eq!(script.dispatch("join", &env, &ctx), vec![Ok(Outcome::Completed)]);
    assert_eq!(env.get("greeting"), vec![Value::text("hello Steve, 100% \"welcome\"")]);
}

#[test]
fn missing_event_value_fails_the_trigger() {
    let reg = core();
    let script = Script::load(&reg, "on join:\n    set {who} to event-player\n", &Options::default()).unwrap();
    let env = Environment::new();
    let outcome = script.dispatch("join", &env, &EmptyContext);
    assert_eq!(outcome, vec![Err(EvaluationError::Missing { line: 2, what: "event-player".to_string() })]);
    assert!(!env.is_set("who"));
}

#[test]
fn variables_set_add_delete() {
    let reg = core();
    let source = "\
# counters
on join:
    set {count} to 1
    add 2 to {count}
    add \"a\" and \"b\" to {names::*}
    add \"c\" to {names::*}
    set {temp} to 5
    delete {temp}
    set {copy} to {count} * 2 # doubled
";
    let script = Script::load(&reg, source, &Options::default()).unwrap();
    let env = Environment::new();
    assert_eq!(script.dispatch("join", &env, &EmptyContext), vec![Ok(Outcome::Completed)]);

    assert_eq!(env.get("count"), vec![Value::Number(3.0)]);
    assert_eq!(env.get("names::*"), vec![Value::text("a"), Value::text("b"), Value::text("c")]);
    assert!(!env.is_set("temp"));
    assert_eq!(env.get("copy"), vec![Value::Number(6.0)]);

    // Running again keeps accumulating.
    script.dispatch("join", &env, &EmptyContext);
    assert_eq!(env.get("count"), vec![Value::Number(3.0)]);
    assert_eq!(env.get("names::*").len(), 6);
}

#[test]
fn setting_a_single_variable_to_a_list_fails() {
    let reg = core();
    let script = Script::load(&reg, "on load:\n    set {x} to 1 and 2\n", &Options::default()).unwrap();
    let outcome = script.dispatch("load", &Environment::new(), &EmptyContext);
    assert_eq!(outcome, vec![Err(EvaluationError::NotSingle { line: 2, count: 2 })]);
}

#[test]
fn false_condition_stops_the_trigger() {
    let reg = core();
    let source = "on join:\n    set {a} to 3\n    {a} is greater than 5\n    set {b} to 1\n";
    let script = Script::load(&reg, source, &Options::default()).unwrap();
    let env = Environment::new();
    assert_eq!(script.dispatch("join", &env, &EmptyContext), vec![Ok(Outcome::Stopped { line: 3 })]);
    assert!(!env.is_set("b"));

    env.set("a", vec![Value::Number(10.0)]);
    let script = Script::load(&reg, "on join:\n    {a} is greater than 5\n    set {b} to 1\n", &Options::default()).unwrap();
    assert_eq!(script.dispatch("join", &env, &EmptyContext), vec![Ok(Outcome::Completed)]);
    assert_eq!(env.get("b"), vec![Value::Number(1.0)]);
}

#[test]
fn is_set_checks_for_values() {
    let reg = core();
    let source = "on load:\n    {x} is not set\n    set {x} to true\n    {x} is set\n    {x} is true\n";
    let script = Script::load(&reg, source, &Options::default()).unwrap();
    assert_eq!(script.dispatch("load", &Environment::new(), &EmptyContext), vec![Ok(Outcome::Completed)]);
}

#[test]
fn coercing_a_variable_reports_the_expected_type() {
    let reg = core();
    let source = "on load:\n    set {x} to \"abc\"\n    {x} is greater than 1\n";
    let script = Script::load(&reg, source, &Options::default()).unwrap();
    let outcome = script.dispatch("load", &Environment::new(), &EmptyContext);
    assert_eq!(
        outcome,
        vec![Err(EvaluationError::Coercion { line: 3, value: "abc".to_string(), expected: "number".to_string() })]
    );
}

#[test]
fn script_structure_errors() {
    let reg = core();
    let opts = Options::default();
    let cases = [
        ("on teleport:\n    set {x} to 1\n", ParseError::UnknownEvent { line: 1, text: "teleport".to_string() }),
        (
            "set {x} to 1\n",
            ParseError::Structure {
                line: 1,
                reason: "expected a trigger header like \"on <event>:\", found \"set {x} to 1\"".to_string(),
            },
        ),
        ("\n    set {x} to 1\n", ParseError::Structure { line: 2, reason: "statement outside of a trigger".to_string() }),
        ("on join:\n    dance wildly\n", ParseError::NoMatch { line: 2, text: "dance wildly".to_string() }),
    ];
    for (source, expected) in cases {
        assert_eq!(Script::load(&reg, source, &opts).unwrap_err(), expected, "{:?}", source);
    }
}

#[test]
fn event_aliases_resolve_to_one_event() {
    let reg = core();
    let source = "on join:\n    add 1 to {n}\non player joining:\n    add 1 to {n}\non quit:\n    add 100 to {n}\n";
    let script = Script::load(&reg, source, &Options::default()).unwrap();
    let env = Environment::new();
    assert_eq!(script.dispatch("JOIN", &env, &EmptyContext).len(), 2);
    assert_eq!(env.get("n"), vec![Value::Number(2.0)]);
}

#[test]
fn dates_parse_at_run_time() {
    let reg = core();
    let options = Options::default();
    let mut loader = Loader::new(&reg, &options);
    let node = loader.parse_expression("\"2024-01-02\" parsed as a date", &TypeSet::of(SemanticType::DATE), false).unwrap().unwrap();
    assert!(!node.is_constant());
    let Value::Date(date) = node.evaluate(&Environment::new(), &EmptyContext).unwrap() else {
        panic!("expected a date");
    };
    assert_eq!(date.date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());

    let now = loader.parse_expression("now", &TypeSet::of(SemanticType::DATE), false).unwrap().unwrap();
    assert!(!now.is_constant());
    assert!(matches!(now.evaluate(&Environment::new(), &EmptyContext), Ok(Value::Date(_))));
}

#[test]
fn unreadable_dates_fail() {
    let reg = core();
    let options = Options::default();
    let mut loader = Loader::new(&reg, &options);
    let node = loader.parse_expression("\"purple\" parsed as date", &TypeSet::of(SemanticType::DATE), false).unwrap().unwrap();
    let err = node.evaluate(&Environment::new(), &EmptyContext).unwrap_err();
    assert!(matches!(err, EvaluationError::Failed { line: 1, .. }), "{:?}", err);
}

#[test]
fn a_bad_operand_at_the_end_of_a_long_chain_fails_without_reparsing() {
    let reg = core();
    let options = Options::default();
    let mut loader = Loader::new(&reg, &options);
    let text = format!("set {{x}} to {}foo", "1 + ".repeat(30));
    let err = loader.parse_statement(&text).unwrap_err();
    assert_eq!(err, ParseError::NoMatch { line: 1, text });
    assert!(loader.metrics().failures_reused > 0);
    assert!(loader.metrics().recursions < 50_000, "{:?}", loader.metrics());
}

#[test]
fn long_lists_load() {
    let reg = core();
    let items: Vec<String> = (1..=200).map(|i| i.to_string()).collect();
    let source = format!("on load:\n    set {{x::*}} to {}\n", items.join(", "));
    let script = Script::load(&reg, &source, &Options::default()).unwrap();
    let env = Environment::new();
    assert_eq!(script.dispatch("load", &env, &EmptyContext), vec![Ok(Outcome::Completed)]);

    let values = env.get("x::*");
    assert_eq!(values.len(), 200);
    assert_eq!(values[199], Value::Number(200.0));
}

#[test]
fn literals_convert_into_text_placeholders() {
    let reg = core();
    let node = expression(&reg, &Options::default(), "5", SemanticType::TEXT);
    assert_eq!(node.result_type(), SemanticType::TEXT);
    assert_eq!(node.constant_values(), Some(&[Value::text("5")][..]));

    let node = expression(&reg, &Options::default(), "true", SemanticType::TEXT);
    assert_eq!(node.constant_values(), Some(&[Value::text("true")][..]));

    let options = Options::default();
    let mut loader = Loader::new(&reg, &options);
    let node = loader.parse_expression("5 parsed as a date", &TypeSet::of(SemanticType::DATE), false).unwrap();
    assert!(node.is_some_and(|n| n.result_type() == SemanticType::DATE));
}
