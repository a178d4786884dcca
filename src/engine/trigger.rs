//! Fragment gating (input pre-classification).
//!
//! Before the matcher runs a grammar against a text, the loader checks that
//! every literal fragment the grammar can never do without occurs somewhere
//! in the lowercased text. Most constructs fail this check for most inputs,
//! which keeps the matcher off the hot path.
//!
//! ## Design notes
//!
//! - This is a *heuristic* pre-check. False positives are fine because the
//!   matcher still has to align the full pattern; false negatives are not,
//!   which is why only fragments present in every expansion are used.
//! - Case folding uses `to_lowercase()`, the same folding grammar literals are
//!   normalized with.

use crate::grammar::Grammar;

/// A text prepared for fragment checks.
#[derive(Debug, Clone)]
pub struct TriggerInfo {
    lower: String,
}

impl TriggerInfo {
    pub fn scan(input: &str) -> Self {
        TriggerInfo { lower: input.to_lowercase() }
    }

    /// True when every required fragment of `grammar` occurs in the text.
    pub fn admits(&self, grammar: &Grammar) -> bool {
        grammar.fragments().iter().all(|fragment| self.contains(fragment))
    }

    fn contains(&self, fragment: &str) -> bool {
        if !fragment.contains(' ') {
            return self.lower.contains(fragment);
        }
        // Multi-word fragments match with flexible whitespace.
        let words: Vec<&str> = fragment.split(' ').collect();
        let mut from = 0;
        'start: while let Some(found) = self.lower[from..].find(words[0]) {
            let mut at = from + found + words[0].len();
            for word in &words[1..] {
                let rest = &self.lower[at..];
                let trimmed = rest.trim_start();
                if trimmed.len() == rest.len() || !trimmed.starts_with(word) {
                    from = from + found + words[0].len().max(1);
                    continue 'start;
                }
                at += rest.len() - trimmed.len() + word.len();
            }
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TypeRegistry;

    #[test]
    fn admits_only_texts_holding_every_required_fragment() {
        let types = TypeRegistry::with_builtins();
        let cases = vec![
            ("%objects% (is|are) set", "{x} is set", true),
            ("%objects% (is|are) set", "{x} IS SET", true),
            ("%objects% (is|are) set", "{x} is here", false),
            ("allowed to build", "Steve is allowed   to\tbuild", true),
            ("allowed to build", "Steve is allowed tobuild", false),
            ("%number%", "anything", true),
        ];
        for (pattern, input, expected) in cases {
            let grammar = Grammar::compile(pattern, &types).unwrap();
            assert_eq!(TriggerInfo::scan(input).admits(&grammar), expected, "{:?} vs {:?}", pattern, input);
        }
    }
}
