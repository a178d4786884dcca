//! Pattern grammar and matcher.
//!
//! Constructs describe their surface syntax with small pattern strings:
//!
//! ```text
//! %players% (can|(is|are) allowed to) build
//! %number% (1¦+|2¦-|3¦*|4¦/) %number%
//! [the] event-<[a-z]+>
//! ```
//!
//! ## How the parts work together
//!
//! ```text
//! pattern ── Grammar::compile (compile.rs) ──▶ Grammar (immutable, shared)
//!                                                 │
//! input ──────────── Matcher::new (matcher.rs) ───┤
//!                                                 ▼
//!                          Vec<MatchResult>  (bindings + parse mark)
//! ```
//!
//! - `compile.rs`: turns the pattern mini-language into an arena of
//!   [`GrammarNode`]s, resolving placeholder type names against the
//!   [`TypeRegistry`](crate::TypeRegistry) and precomputing the literal
//!   fragments every expansion must contain.
//! - `matcher.rs`: enumerates every structural choice (optional present or
//!   absent, each alternation branch, each placeholder span) with results
//!   memoized per `(node, offset)`.
//! - `dedup.rs`: keys used to drop identical candidates.
//!
//! ## Pattern syntax
//!
//! | syntax            | meaning                                              |
//! |-------------------|------------------------------------------------------|
//! | `word`            | case-insensitive literal, whitespace is flexible     |
//! | `[a]`             | optional                                             |
//! | `(a\|b)`          | exactly one branch                                   |
//! | `N¦a`             | branch tag, OR-ed into the parse mark when taken     |
//! | `%type%`          | typed placeholder (`%a/b%` unions, plural names)     |
//! | `%*type%`         | placeholder that only accepts constants              |
//! | `<regex>`         | free-text capture bounded by the regex               |
//! | `\x`              | literal `x`                                          |

#[path = "grammar/compile.rs"]
mod compile;
#[path = "grammar/dedup.rs"]
mod dedup;
#[path = "grammar/matcher.rs"]
mod matcher;

#[cfg(test)]
#[path = "grammar/tests.rs"]
mod tests;

pub use compile::{Branch, Grammar, GrammarNode, NodeId, Placeholder, PlaceholderFlags, Slot, SlotId};
pub use matcher::{Binding, MatchResult, Matcher, ParseMark};
