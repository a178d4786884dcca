//! Text literals.
//!
//! Numbers, booleans and dates come from their types' literal parsers; text
//! needs a fallback because it can embed expressions:
//!
//! ```text
//! "plain"                 -> constant
//! "say ""hi"""            -> constant  say "hi"
//! "100%% sure"            -> constant  100% sure
//! "hello %event-player%"  -> template, live until every part is constant
//! ```

use crate::engine::{ConstructKind, ConstructSpec, Fallback, Loader, SemanticType, TypeSet};
use crate::error::{EvalResult, ParseError, ParseResult};
use crate::node::{MultiResult, Node, Operation, Scope};
use crate::value::Value;
use std::sync::Arc;

#[derive(Debug)]
enum Part {
    Text(String),
    Expr(Node),
}

/// Text with `%expression%` parts, joined at evaluation time.
#[derive(Debug)]
pub struct TextTemplate {
    parts: Vec<Part>,
}

impl Operation for TextTemplate {
    fn name(&self) -> &'static str {
        "text template"
    }

    fn result_type(&self) -> SemanticType {
        SemanticType::TEXT
    }

    fn operands(&self) -> Vec<&Node> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Expr(node) => Some(node),
                Part::Text(_) => None,
            })
            .collect()
    }

    fn evaluate_multi<'a>(&'a self, scope: Scope<'a>) -> EvalResult<MultiResult<'a>> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Expr(node) => {
                    let values: Vec<String> = node.evaluate_multi(scope.env, scope.ctx)?.map(|v| v.to_string()).collect();
                    out.push_str(&join_list(&values));
                }
            }
        }
        Ok(MultiResult::single(Value::text(out)))
    }
}

/// `a`, `a and b`, `a, b and c`.
pub(crate) fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

pub(super) fn text_literal() -> ConstructSpec {
    let fallback: Fallback = Arc::new(|text: &str, loader: &mut Loader<'_>| -> ParseResult<Option<Node>> { parse_text(text, loader) });
    ConstructSpec::new("text literal", ConstructKind::Expression, "text").fallback(fallback)
}

fn malformed(line: usize, text: &str, reason: &str) -> ParseError {
    ParseError::Malformed { line, text: text.to_string(), reason: reason.to_string() }
}

fn parse_text(text: &str, loader: &mut Loader<'_>) -> ParseResult<Option<Node>> {
    let Some(body) = text.strip_prefix('"') else {
        return Ok(None);
    };
    let line = loader.line();

    let mut parts: Vec<Part> = Vec::new();
    let mut literal = String::new();
    let mut chars = body.char_indices().peekable();
    let mut closed_at = None;

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                if chars.peek().map(|(_, n)| *n) == Some('"') {
                    chars.next();
                    literal.push('"');
                } else {
                    closed_at = Some(i);
                    break;
                }
            }
            '%' => {
                if chars.peek().map(|(_, n)| *n) == Some('%') {
                    chars.next();
                    literal.push('%');
                    continue;
                }
                let start = i + 1;
                let end = loop {
                    match chars.next() {
                        Some((j, '%')) => break j,
                        Some(_) => {}
                        None => return Err(malformed(line, text, "unclosed %...% in text")),
                    }
                };
                let inner = &body[start..end];
                let node = loader
                    .parse_expression(inner, &TypeSet::any(), true)?
                    .ok_or_else(|| malformed(line, text, &format!("can't understand \"{}\" inside text", inner.trim())))?;
                if !literal.is_empty() {
                    parts.push(Part::Text(std::mem::take(&mut literal)));
                }
                parts.push(Part::Expr(node));
            }
            _ => literal.push(c),
        }
    }

    let Some(close) = closed_at else {
        return Err(malformed(line, text, "text is missing its closing quote"));
    };
    if !body[close + 1..].trim().is_empty() {
        // `"a" + "b"`: not a lone literal; other constructs may claim it.
        return Ok(None);
    }

    if parts.is_empty() {
        return Ok(Some(Node::constant(line, SemanticType::TEXT, vec![Value::text(literal)])));
    }
    if !literal.is_empty() {
        parts.push(Part::Text(literal));
    }
    Ok(Some(loader.node(TextTemplate { parts })))
}
