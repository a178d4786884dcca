use crate::engine::{ConstructKind, LoadMetrics, Loader, Registry, Script, Statement};
use crate::error::ParseResult;
use crate::grammar::Matcher;

/// Options that affect loading.
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum nesting of sub-expressions before a load fails with
    /// [`ParseError::TooDeep`](crate::ParseError::TooDeep).
    pub max_depth: usize,
    /// Alternative alignments the matcher keeps per grammar node, start and
    /// end offset.
    pub max_candidates: usize,
    /// Precompute nodes whose operands are all constant.
    pub fold_constants: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { max_depth: 48, max_candidates: Matcher::DEFAULT_LIMIT, fold_constants: true }
    }
}

/// A compact statement summary used in verbose loads.
#[derive(Debug, Clone)]
pub struct StatementSummary {
    pub line: usize,
    pub kind: ConstructKind,
    /// Name of the top-level operation, or `"constant"`.
    pub name: &'static str,
    pub constant: bool,
    /// Indented node tree, see [`Node::render`](crate::Node::render).
    pub tree: String,
}

/// A compact trigger summary used in verbose loads.
#[derive(Debug, Clone)]
pub struct TriggerSummary {
    pub event: String,
    pub header: String,
    pub line: usize,
    pub statements: Vec<StatementSummary>,
}

/// Additional details returned by [`load_verbose_with`].
#[derive(Debug, Clone)]
pub struct LoadDetails {
    pub metrics: LoadMetrics,
    pub triggers: Vec<TriggerSummary>,
}

/// Result from [`load_verbose_with`].
#[derive(Debug)]
pub struct LoadVerbose {
    pub script: Script,
    pub details: LoadDetails,
}

/// Load `source` against `registry` with default [`Options`].
///
/// # Example
/// ```
/// use skriptum::{Environment, EmptyContext, Outcome, Registry, load};
///
/// let registry = Registry::with_core().unwrap();
/// let script = load(&registry, "on load:\n    set {x} to 1 + 2\n").unwrap();
/// let env = Environment::new();
/// assert_eq!(script.dispatch("load", &env, &EmptyContext), vec![Ok(Outcome::Completed)]);
/// assert_eq!(env.get("x"), vec![skriptum::Value::Number(3.0)]);
/// ```
pub fn load(registry: &Registry, source: &str) -> ParseResult<Script> {
    load_with(registry, source, &Options::default())
}

pub fn load_with(registry: &Registry, source: &str, options: &Options) -> ParseResult<Script> {
    Script::load(registry, source, options)
}

/// Load `source` and return what the loader did along with the script.
///
/// The default [`load_with`] path does not render node trees.
pub fn load_verbose_with(registry: &Registry, source: &str, options: &Options) -> ParseResult<LoadVerbose> {
    let (script, metrics) = Script::load_with_metrics(registry, source, options)?;
    let triggers = script
        .triggers()
        .iter()
        .map(|t| TriggerSummary {
            event: t.event.clone(),
            header: t.header.clone(),
            line: t.line,
            statements: t.statements.iter().map(statement_summary).collect(),
        })
        .collect();
    Ok(LoadVerbose { script, details: LoadDetails { metrics, triggers } })
}

/// Parse a single statement line, as if it were line 1 of a trigger body.
pub fn parse_statement(registry: &Registry, text: &str, options: &Options) -> ParseResult<Statement> {
    Loader::new(registry, options).parse_statement(text)
}

fn statement_summary(statement: &Statement) -> StatementSummary {
    let node = statement.node();
    StatementSummary {
        line: node.line(),
        kind: statement.kind(),
        name: node.name(),
        constant: node.is_constant(),
        tree: node.render(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::node::{EmptyContext, Environment};
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn registry() -> Registry {
        Registry::with_core().unwrap()
    }

    #[test]
    fn default_options() {
        let opts = Options::default();
        assert_eq!(opts.max_depth, 48);
        assert_eq!(opts.max_candidates, Matcher::DEFAULT_LIMIT);
        assert!(opts.fold_constants);
    }

    #[test]
    fn load_verbose_summarizes_triggers() {
        let source = "on join:\n    set {x} to 2 * 3\n    {x} is set\n";
        let res = load_verbose_with(&registry(), source, &Options::default()).unwrap();

        assert_eq!(res.details.triggers.len(), 1);
        let trigger = &res.details.triggers[0];
        assert_eq!((trigger.event.as_str(), trigger.header.as_str(), trigger.line), ("join", "join", 1));

        let kinds: Vec<(usize, ConstructKind)> = trigger.statements.iter().map(|s| (s.line, s.kind)).collect();
        assert_eq!(kinds, vec![(2, ConstructKind::Effect), (3, ConstructKind::Condition)]);
        assert_eq!(trigger.statements[0].name, "set");
        assert!(!trigger.statements[0].constant);
        assert!(trigger.statements[0].tree.contains("constant"));

        assert_eq!(res.details.metrics.lines, 2);
        assert!(res.details.metrics.constants >= 1);
        assert!(res.details.metrics.candidates >= 2);
    }

    #[test]
    fn load_reports_first_error() {
        let err = load(&registry(), "on join:\n    set {x} to 1\n    fly to the moon\n").unwrap_err();
        assert_eq!(err, ParseError::NoMatch { line: 3, text: "fly to the moon".to_string() });
    }

    #[test]
    fn parse_statement_runs_standalone() {
        let reg = registry();
        let statement = parse_statement(&reg, "set {answer} to 40 + 2", &Options::default()).unwrap();
        assert_eq!(statement.kind(), ConstructKind::Effect);

        let env = Environment::new();
        statement.node().evaluate_multi(&env, &EmptyContext).unwrap().for_each(drop);
        assert_eq!(env.get("answer"), vec![Value::Number(42.0)]);
    }
}
