use super::*;
use crate::engine::{SemanticType, TypeInfo, TypeRegistry};
use crate::error::GrammarError;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn types() -> TypeRegistry {
    let mut reg = TypeRegistry::with_builtins();
    reg.register(TypeInfo::new("entity", "entities")).unwrap();
    reg.register(TypeInfo::new("player", "players").parent("entity")).unwrap();
    reg
}

fn compile(pattern: &str) -> Grammar {
    Grammar::compile(pattern, &types()).unwrap_or_else(|e| panic!("pattern {:?}: {}", pattern, e))
}

fn texts<'i>(m: &MatchResult<'i>) -> Vec<&'i str> {
    m.bindings.iter().map(|b| b.text).collect()
}

#[test]
fn parse_mark_follows_chosen_branch() {
    let g = compile("(1¦a|2¦b)");
    assert_eq!(g.match_exact("a").iter().map(|m| m.mark).collect::<Vec<_>>(), vec![1]);
    assert_eq!(g.match_exact("b").iter().map(|m| m.mark).collect::<Vec<_>>(), vec![2]);

    let same = compile("(1¦a|1¦b)");
    assert_eq!(same.match_exact("a")[0].mark, 1);
    assert_eq!(same.match_exact("b")[0].mark, 1);
}

#[test]
fn parse_marks_accumulate_with_bitwise_or() {
    let g = compile("(1¦quick|2¦slow) [4¦brown] fox");
    let cases = vec![("quick brown fox", 5), ("slow fox", 2), ("slow brown fox", 6), ("quick fox", 1)];
    for (input, mark) in cases {
        let found = g.match_exact(input);
        assert_eq!(found.len(), 1, "input {:?}", input);
        assert_eq!(found[0].mark, mark, "input {:?}", input);
    }
}

#[test]
fn placeholder_binds_text_between_anchors() {
    let g = compile("%number% of items");
    let found = g.match_exact("5 of items");
    assert_eq!(found.len(), 1);
    assert_eq!(texts(&found[0]), vec!["5"]);
    assert!(matches!(g.slot(found[0].bindings[0].slot), Slot::Placeholder(p) if p.types.iter().eq([SemanticType::NUMBER])));
}

#[test]
fn optional_and_alternation_variants_align_identically() {
    let g = compile("%players% (can|(is|are) allowed to) build");
    let can = g.match_exact("Steve can build");
    let allowed = g.match_exact("Steve is allowed to build");
    let plural = g.match_exact("Steve and Alex are allowed to build");
    assert_eq!(can.len(), 1);
    assert_eq!(allowed.len(), 1);
    assert_eq!(texts(&can[0]), vec!["Steve"]);
    assert_eq!(texts(&allowed[0]), vec!["Steve"]);
    assert_eq!(texts(&plural[0]), vec!["Steve and Alex"]);
    assert!(g.match_exact("Steve may build").is_empty());
}

#[test]
fn matching_ignores_case_and_whitespace_runs() {
    let g = compile("send   %text% to   %player%");
    let found = g.match_exact("SEND  hello\tTo  Steve");
    assert_eq!(found.len(), 1);
    assert_eq!(texts(&found[0]), vec!["hello", "Steve"]);
}

#[test]
fn placeholders_skip_quoted_and_bracketed_text() {
    let g = compile("send %text% to %player%");
    let found = g.match_exact(r#"send "going to town" to Steve"#);
    assert_eq!(texts(&found[0]), vec![r#""going to town""#, "Steve"]);

    let found = g.match_exact("send (a to b) to Steve");
    assert_eq!(texts(&found[0]), vec!["(a to b)", "Steve"]);
}

#[test]
fn ambiguous_placeholders_yield_every_split_shortest_first() {
    let g = compile("%text% to %text%");
    let found = g.match_exact("a to b to c");
    let splits: Vec<Vec<&str>> = found.iter().map(texts).collect();
    assert_eq!(splits, vec![vec!["a", "b to c"], vec!["a to b", "c"]]);
}

#[test]
fn words_are_never_split() {
    let g = compile("%text% is %text%");
    let splits: Vec<Vec<&str>> = g.match_exact("this isn't it").iter().map(texts).collect();
    assert!(splits.is_empty(), "{:?}", splits);

    let splits: Vec<Vec<&str>> = g.match_exact("this is it").iter().map(texts).collect();
    assert_eq!(splits, vec![vec!["this", "it"]]);
    assert_eq!(g.match_exact("1+2 is 3").len(), 1);
}

#[test]
fn optional_words_are_tried_present_first() {
    let g = compile("[the] %text%");
    let splits: Vec<Vec<&str>> = g.match_exact("the player").iter().map(texts).collect();
    assert_eq!(splits, vec![vec!["player"], vec!["the player"]]);
}

#[test]
fn free_capture_is_greedy_but_bounded_by_the_rest_of_the_pattern() {
    let g = compile("give <.+> to %player%");
    let found = g.match_exact("give diamond sword to the king to Steve");
    let splits: Vec<Vec<&str>> = found.iter().map(texts).collect();
    assert_eq!(splits, vec![vec!["diamond sword to the king", "Steve"], vec!["diamond sword", "the king to Steve"]]);

    let g = compile("event-<[a-z]+>");
    assert_eq!(texts(&g.match_exact("event-Block")[0]), vec!["Block"]);
    assert!(g.match_exact("event-block2").is_empty());
}

#[test]
fn unmatched_trailing_input_is_flagged() {
    let g = compile("cancel [the] event");
    let mut matcher = Matcher::new(&g, "cancel the event now");
    let all = matcher.matches();
    assert_eq!(all.len(), 1);
    assert!(all[0].unmatched);
    assert!(matcher.exact().is_empty());
}

#[test]
fn find_locates_the_grammar_inside_longer_text() {
    let g = compile("(is|are) allowed to");
    let found = Matcher::new(&g, "Steve is allowed to build").find();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].start, 6);
    assert!(found[0].unmatched);
}

#[test]
fn escapes_and_tags_compile_to_literals() {
    let g = compile(r"100\% \[sure\]");
    assert_eq!(g.match_exact("100% [SURE]").len(), 1);
}

#[test]
fn plural_and_literal_only_flags() {
    let g = compile("%entities% and %*number%");
    let flags: Vec<PlaceholderFlags> = g.placeholders().map(|p| p.flags).collect();
    assert_eq!(flags, vec![PlaceholderFlags::PLURAL, PlaceholderFlags::LITERAL_ONLY]);
    assert_eq!(g.placeholder_count(), 2);
}

#[test]
fn union_placeholders_keep_every_type() {
    let g = compile("%number/text%");
    let p = g.placeholders().next().unwrap();
    assert_eq!(p.types.iter().collect::<Vec<_>>(), vec![SemanticType::NUMBER, SemanticType::TEXT]);
}

#[test]
fn required_fragments_only_keep_words_every_expansion_needs() {
    let cases = vec![
        ("%players% (can|(is|are) allowed to) build", vec!["build"]),
        ("[the] event-<[a-z]+>", vec!["event-"]),
        ("(is|is not) set", vec!["set"]),
        ("(1¦is|2¦is) here", vec!["is", "here"]),
        ("%number%", vec![]),
    ];
    for (pattern, expected) in cases {
        assert_eq!(compile(pattern).fragments(), expected.as_slice(), "pattern {:?}", pattern);
    }
}

fn compile_err(pattern: &str) -> GrammarError {
    Grammar::compile(pattern, &types()).expect_err(pattern)
}

#[test]
fn malformed_patterns_are_rejected() {
    assert!(matches!(compile_err("[the player"), GrammarError::Unbalanced { open: '[', .. }));
    assert!(matches!(compile_err("(a|b"), GrammarError::Unbalanced { open: '(', .. }));
    assert!(matches!(compile_err("a)"), GrammarError::Unexpected { found: ')', .. }));
    assert!(matches!(compile_err("[a)"), GrammarError::Unexpected { found: ')', .. }));
    assert!(matches!(compile_err("%number"), GrammarError::Unbalanced { open: '%', .. }));
    assert!(matches!(compile_err("%%"), GrammarError::EmptyPlaceholder { .. }));
    assert!(matches!(compile_err("%creeper%"), GrammarError::UnknownType { name, .. } if name == "creeper"));
    assert!(matches!(compile_err("<[a-z>"), GrammarError::InvalidRegex { .. }));
    assert!(matches!(compile_err("a ¦ b"), GrammarError::Unexpected { found: '¦', .. }));
}

#[test]
fn candidate_limit_bounds_branching() {
    let g = compile("%text% %text% %text% %text%");
    let input = "a b c d e f g h";
    assert_eq!(Matcher::new(&g, input).exact().len(), 35);

    let capped = Matcher::new(&g, input).with_limit(8).exact();
    assert!(!capped.is_empty());
    assert!(capped.len() <= 8);
}

#[test]
fn long_trailing_placeholders_keep_the_full_span() {
    let g = compile("set %text% to %texts%");
    let items: Vec<String> = (1..=200).map(|i| i.to_string()).collect();
    let input = format!("set x to {}", items.join(", "));

    for limit in [Matcher::DEFAULT_LIMIT, 1] {
        let found = Matcher::new(&g, &input).with_limit(limit).exact();
        assert_eq!(found.len(), 1, "limit {}", limit);
        assert_eq!(texts(&found[0]), vec!["x", &input[9..]]);
    }
}

proptest! {
    #[test]
    fn matching_is_deterministic(input in "[a-c ]{0,24}") {
        let g = compile("[the] (1¦a|2¦b) %text% [c] (a|b|c)");
        let first = Matcher::new(&g, &input).matches();
        let second = Matcher::new(&g, &input).matches();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn exact_matches_consume_all_input(input in "[a-c ]{0,24}") {
        let g = compile("%text% (a|b) [c]");
        for m in g.match_exact(&input) {
            prop_assert!(!m.unmatched);
            prop_assert_eq!(input[m.end..].trim(), "");
        }
    }
}
