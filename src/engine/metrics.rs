//! Load metrics.
//!
//! Counters collected while a script is loaded, returned by
//! [`load_verbose_with`](crate::load_verbose_with) and printed by the CLI report.
//! Collection is always on; every counter is a plain increment.

use std::time::Duration;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadMetrics {
    /// Total elapsed time for the load.
    pub total: Duration,
    /// Statement lines parsed (headers and comments excluded).
    pub lines: usize,
    /// Constructs whose patterns were run through the matcher.
    pub constructs_tried: usize,
    /// Patterns skipped because a required fragment was missing from the text.
    pub patterns_gated: usize,
    /// Exact candidate matches considered across all patterns.
    pub candidates: usize,
    /// Recursive parses of placeholder spans, list items and parentheses.
    pub recursions: usize,
    /// Nodes that came out of a builder already folded to a constant.
    pub constants: usize,
    /// Deepest recursion reached.
    pub max_depth: usize,
    /// Sub-parses answered from the statement's record of earlier failures.
    pub failures_reused: usize,
}
