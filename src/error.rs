//! Error types.
//!
//! Errors are split by phase:
//!
//! - [`GrammarError`] / [`RegistryError`]: registration time, before any
//!   script is parsed.
//! - [`ParseError`]: script load time. Aborts the whole script.
//! - [`EvaluationError`]: run time. Aborts a single trigger execution.
//!
//! A candidate that merely fails to match is not an error: the loader models
//! it as `Ok(None)` and moves on to the next candidate.

use thiserror::Error;

/// A pattern string could not be compiled into a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("unbalanced '{open}' at offset {offset} in pattern \"{pattern}\"")]
    Unbalanced { pattern: String, open: char, offset: usize },

    #[error("unexpected '{found}' at offset {offset} in pattern \"{pattern}\"")]
    Unexpected { pattern: String, found: char, offset: usize },

    #[error("empty placeholder in pattern \"{pattern}\"")]
    EmptyPlaceholder { pattern: String },

    #[error("unknown type '{name}' in pattern \"{pattern}\"")]
    UnknownType { pattern: String, name: String },

    #[error("invalid capture regex <{regex}> in pattern \"{pattern}\": {reason}")]
    InvalidRegex { pattern: String, regex: String, reason: String },
}

/// Registration failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("type '{0}' is already registered")]
    DuplicateType(String),

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("construct '{0}' has neither patterns nor a fallback")]
    EmptyConstruct(&'static str),
}

/// Script text could not be turned into an execution tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: can't understand \"{text}\"")]
    NoMatch { line: usize, text: String },

    #[error("line {line}: malformed \"{text}\": {reason}")]
    Malformed { line: usize, text: String, reason: String },

    #[error("line {line}: expression nested deeper than {depth} levels")]
    TooDeep { line: usize, depth: usize },

    #[error("line {line}: unknown event \"{text}\"")]
    UnknownEvent { line: usize, text: String },

    #[error("line {line}: {reason}")]
    Structure { line: usize, reason: String },
}

impl ParseError {
    /// Script line the error refers to.
    pub fn line(&self) -> usize {
        match self {
            ParseError::NoMatch { line, .. }
            | ParseError::Malformed { line, .. }
            | ParseError::TooDeep { line, .. }
            | ParseError::UnknownEvent { line, .. }
            | ParseError::Structure { line, .. } => *line,
        }
    }
}

/// A node could not produce a value at run time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("line {line}: {what} is not available here")]
    Missing { line: usize, what: String },

    #[error("line {line}: {value} is not {expected}")]
    Coercion { line: usize, value: String, expected: String },

    #[error("line {line}: expected a single value but got {count}")]
    NotSingle { line: usize, count: usize },

    #[error("line {line}: {reason}")]
    Failed { line: usize, reason: String },
}

impl EvaluationError {
    /// Script line the error refers to.
    pub fn line(&self) -> usize {
        match self {
            EvaluationError::Missing { line, .. }
            | EvaluationError::Coercion { line, .. }
            | EvaluationError::NotSingle { line, .. }
            | EvaluationError::Failed { line, .. } => *line,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
pub type EvalResult<T> = Result<T, EvaluationError>;
