//! Scripts and triggers.
//!
//! A script is a list of triggers. Each trigger starts with an unindented
//! `on <event>:` header and owns the indented statements below it:
//!
//! ```text
//! # comments run to the end of the line
//! on join:
//!     set {greeting} to "hello %event-player%"
//!     {count} is set
//!     add 1 to {count}
//! ```
//!
//! Loading is all-or-nothing: the first [`ParseError`] aborts it.

use super::loader::{Loader, Statement};
use super::metrics::LoadMetrics;
use super::registry::Registry;
use crate::Options;
use crate::error::{EvalResult, EvaluationError, ParseError, ParseResult};
use crate::node::{Context, Environment};
use crate::value::Value;
use std::time::Instant;

/// How a trigger execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every statement ran.
    Completed,
    /// A condition on `line` was false.
    Stopped { line: usize },
}

/// One `on <event>:` block.
#[derive(Debug)]
pub struct Trigger {
    /// Registered event name the header resolved to.
    pub event: String,
    /// Header text as written, without `on` and `:`.
    pub header: String,
    pub line: usize,
    pub statements: Vec<Statement>,
}

impl Trigger {
    /// Run every statement in order.
    pub fn execute(&self, env: &Environment, ctx: &dyn Context) -> EvalResult<Outcome> {
        for statement in &self.statements {
            match statement {
                Statement::Effect(node) => {
                    // Effects do their work while being drained.
                    node.evaluate_multi(env, ctx)?.for_each(drop);
                }
                Statement::Condition(node) => match node.evaluate(env, ctx)? {
                    Value::Boolean(true) => {}
                    Value::Boolean(false) => {
                        tracing::trace!(line = node.line(), "condition failed, stopping trigger");
                        return Ok(Outcome::Stopped { line: node.line() });
                    }
                    other => {
                        return Err(EvaluationError::Failed {
                            line: node.line(),
                            reason: format!("condition produced {} instead of a boolean", other),
                        });
                    }
                },
            }
        }
        Ok(Outcome::Completed)
    }
}

/// A loaded script.
#[derive(Debug)]
pub struct Script {
    triggers: Vec<Trigger>,
}

impl Script {
    pub fn load(registry: &Registry, source: &str, options: &Options) -> ParseResult<Script> {
        Self::load_with_metrics(registry, source, options).map(|(script, _)| script)
    }

    /// Like [`load`](Self::load), also returning what the loader did.
    pub fn load_with_metrics(registry: &Registry, source: &str, options: &Options) -> ParseResult<(Script, LoadMetrics)> {
        let _span = tracing::info_span!("load", lines = source.lines().count()).entered();
        let started = Instant::now();
        let mut loader = Loader::new(registry, options);
        let mut triggers: Vec<Trigger> = Vec::new();

        for (idx, raw) in source.lines().enumerate() {
            let line = idx + 1;
            let code = strip_comment(raw);
            if code.trim().is_empty() {
                continue;
            }
            loader.at_line(line);

            let indented = code.starts_with(char::is_whitespace);
            if !indented {
                let header = parse_header(code).ok_or_else(|| ParseError::Structure {
                    line,
                    reason: format!("expected a trigger header like \"on <event>:\", found \"{}\"", code.trim()),
                })?;
                let event = registry
                    .resolve_event(header)
                    .ok_or_else(|| ParseError::UnknownEvent { line, text: header.to_string() })?;
                tracing::debug!(line, event, "trigger");
                triggers.push(Trigger { event: event.to_string(), header: header.to_string(), line, statements: Vec::new() });
                continue;
            }

            let trigger = triggers
                .last_mut()
                .ok_or_else(|| ParseError::Structure { line, reason: "statement outside of a trigger".to_string() })?;
            let statement = loader.parse_statement(code)?;
            trigger.statements.push(statement);
        }

        let mut metrics = loader.into_metrics();
        metrics.total = started.elapsed();
        tracing::debug!(triggers = triggers.len(), elapsed = ?metrics.total, "loaded script");
        Ok((Script { triggers }, metrics))
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Execute every trigger listening for `event`, in script order.
    ///
    /// A failing trigger does not prevent the next one from running.
    pub fn dispatch(&self, event: &str, env: &Environment, ctx: &dyn Context) -> Vec<EvalResult<Outcome>> {
        let event = event.to_lowercase();
        self.triggers
            .iter()
            .filter(|t| t.event == event)
            .map(|t| {
                let outcome = t.execute(env, ctx);
                if let Err(err) = &outcome {
                    tracing::warn!(trigger = t.line, %err, "trigger failed");
                }
                outcome
            })
            .collect()
    }
}

/// Text before a `#` that is not inside a text literal.
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

/// `on <event>:` -> `<event>`.
fn parse_header(line: &str) -> Option<&str> {
    let line = line.trim_end();
    let body = line.strip_suffix(':')?;
    let head = body.get(..3)?;
    if !head.eq_ignore_ascii_case("on ") {
        return None;
    }
    let event = body[3..].trim();
    (!event.is_empty()).then_some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_stop_at_hashes_outside_quotes() {
        let cases = vec![
            ("set {x} to 1 # one", "set {x} to 1 "),
            ("set {x} to \"#1\"", "set {x} to \"#1\""),
            ("# only a comment", ""),
        ];
        for (input, expected) in cases {
            assert_eq!(strip_comment(input), expected);
        }
    }

    #[test]
    fn headers() {
        let cases = vec![
            ("on join:", Some("join")),
            ("ON  block break :", Some("block break")),
            ("on join", None),
            ("on :", None),
            ("when join:", None),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_header(input), expected, "input {:?}", input);
        }
    }
}
