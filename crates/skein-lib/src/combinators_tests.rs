use std::cell::Cell;

use crate::test_utils::tokens;
use crate::{EngineConfig, Error, MatchOutcome, Node, ParseContext, Rule, RuleKind, Token};

fn run(rule: &Rule, input: &[Token]) -> (MatchOutcome, usize) {
    let mut ctx = ParseContext::new(input);
    let outcome = rule.try_match(&mut ctx).expect("no fatal error");
    assert!(ctx.outstanding().is_empty(), "outstanding nodes leaked");
    (outcome, ctx.position())
}

fn render(rule: &Rule, input: &[Token]) -> String {
    match run(rule, input).0 {
        MatchOutcome::Matched(node) => node.render(),
        MatchOutcome::NotMatched => "<not matched>".to_string(),
    }
}

fn tok(kind: &str) -> Rule {
    Rule::token(kind)
}

#[test]
fn repeat_collects_every_consecutive_match() {
    let input = tokens("A B B C");
    let grammar = Rule::sequence([tok("A"), Rule::repeat(tok("B")), tok("C")]);

    let (outcome, position) = run(&grammar, &input);

    let node = outcome.into_node().expect("sequence matches");
    insta::assert_snapshot!(node.render(), @"Sequence, Count=3, Children=(a, Repeat, Count=2, Children=(b, b), c)");
    assert_eq!(node.children()[1].count(), 2);
    assert_eq!(position, input.len());
}

#[test]
fn skip_matches_empty_when_body_is_absent() {
    let input = tokens("A C");
    let grammar = Rule::sequence([tok("A"), Rule::skip(tok("B")), tok("C")]);

    let (outcome, position) = run(&grammar, &input);

    let node = outcome.into_node().expect("sequence matches");
    insta::assert_snapshot!(node.render(), @"Sequence, Count=3, Children=(a, Skip, SupportNested=true, Count=0, Children=(), c)");
    assert_eq!(node.children()[1].count(), 0);
    assert_eq!(position, 2);
}

#[test]
fn failed_sequence_rolls_back_and_keeps_last_good() {
    let input = tokens("A X");
    let grammar = Rule::sequence([tok("A"), tok("B")]);
    let mut ctx = ParseContext::new(&input);

    let outcome = grammar.try_match(&mut ctx).unwrap();

    assert_eq!(outcome, MatchOutcome::NotMatched);
    assert_eq!(ctx.position(), 0);
    let last_good = ctx.last_good().expect("`A` committed");
    assert_eq!(last_good.node.render(), "a");
    assert_eq!(last_good.end, 1);
}

#[test]
fn repeat_on_empty_input_matches_nothing() {
    let input = tokens("");
    let (outcome, position) = run(&Rule::repeat(tok("A")), &input);

    insta::assert_snapshot!(outcome.into_node().unwrap().render(), @"Repeat, Count=0, Children=()");
    assert_eq!(position, 0);
    assert_eq!(position, input.len());
}

#[test]
fn repeat_stops_at_first_mismatch() {
    let input = tokens("B B A B");
    let (outcome, position) = run(&Rule::repeat(tok("B")), &input);

    assert_eq!(outcome.node().map(Node::count), Some(2));
    assert_eq!(position, 2);
}

#[test]
fn repeat_with_no_match_still_matches() {
    let input = tokens("A");
    let (outcome, position) = run(&Rule::repeat(tok("B")), &input);

    assert_eq!(outcome.node().map(Node::count), Some(0));
    assert_eq!(position, 0);
}

#[test]
fn repeat_with_several_children_repeats_them_in_order() {
    let input = tokens("A B A B A");
    let mut repeat = Rule::new(RuleKind::Repeat { max: None });
    repeat.append(tok("A")).unwrap().append(tok("B")).unwrap();

    let (outcome, position) = run(&repeat, &input);

    insta::assert_snapshot!(
        outcome.into_node().unwrap().render(),
        @"Repeat, Count=2, Children=(Sequence, Count=2, Children=(a, b), Sequence, Count=2, Children=(a, b))"
    );
    assert_eq!(position, 4);
}

#[test]
fn repeat_honours_its_own_cap() {
    let input = tokens("B B B");
    let (outcome, position) = run(&Rule::repeat_at_most(tok("B"), 2), &input);

    assert_eq!(outcome.node().map(Node::count), Some(2));
    assert_eq!(position, 2);
}

#[test]
fn repeat_honours_the_configured_cap() {
    let input = tokens("B B B");
    let config = EngineConfig::unlimited().with_max_repeat(Some(1));
    let mut ctx = ParseContext::new(&input).with_config(&config);

    let outcome = Rule::repeat_at_most(tok("B"), 2).try_match(&mut ctx).unwrap();

    assert_eq!(outcome.node().map(Node::count), Some(1));
    assert_eq!(ctx.position(), 1);
}

#[test]
fn repeat_stops_when_body_matches_without_consuming() {
    let input = tokens("A A B");
    let (outcome, position) = run(&Rule::repeat(Rule::skip(tok("A"))), &input);

    insta::assert_snapshot!(
        outcome.into_node().unwrap().render(),
        @"Repeat, Count=2, Children=(Skip, SupportNested=true, Count=1, Children=(a), Skip, SupportNested=true, Count=1, Children=(a))"
    );
    assert_eq!(position, 2);
}

#[test]
fn skip_matches_body_once() {
    let input = tokens("B B");
    let (outcome, position) = run(&Rule::skip(tok("B")), &input);

    insta::assert_snapshot!(outcome.into_node().unwrap().render(), @"Skip, SupportNested=true, Count=1, Children=(b)");
    assert_eq!(position, 1);
}

#[test]
fn sequence_is_all_or_nothing() {
    let input = tokens("A B D");
    let (outcome, position) = run(&Rule::sequence([tok("A"), tok("B"), tok("C")]), &input);

    assert_eq!(outcome, MatchOutcome::NotMatched);
    assert_eq!(position, 0);
}

#[test]
fn empty_sequence_matches_without_consuming() {
    let input = tokens("A");
    let (outcome, position) = run(&Rule::sequence([]), &input);

    insta::assert_snapshot!(outcome.into_node().unwrap().render(), @"Sequence, Count=0, Children=()");
    assert_eq!(position, 0);
}

#[test]
fn token_at_end_of_input_does_not_match() {
    let input = tokens("A");
    let (outcome, position) = run(&Rule::sequence([tok("A"), tok("B")]), &input);

    assert_eq!(outcome, MatchOutcome::NotMatched);
    assert_eq!(position, 0);
}

#[test]
fn alternation_takes_first_matching_branch() {
    let input = tokens("A B");
    let grammar = Rule::alternation([
        Rule::sequence([tok("A"), tok("C")]),
        Rule::sequence([tok("A"), tok("B")]),
        tok("A"),
    ]);

    let (outcome, position) = run(&grammar, &input);

    insta::assert_snapshot!(
        outcome.into_node().unwrap().render(),
        @"Alternation, Count=1, Children=(Sequence, Count=2, Children=(a, b))"
    );
    assert_eq!(position, 2);
}

#[test]
fn alternation_without_a_match_restores_cursor() {
    let input = tokens("X");
    let (outcome, position) = run(&Rule::alternation([tok("A"), tok("B")]), &input);

    assert_eq!(outcome, MatchOutcome::NotMatched);
    assert_eq!(position, 0);
}

#[test]
fn keyword_and_any_patterns() {
    let input = vec![
        Token::new("ident", "let", crate::Span::new(0, 3)),
        Token::new("ident", "x", crate::Span::new(4, 5)),
    ];
    let grammar = Rule::sequence([Rule::keyword("ident", "let"), Rule::any()]);
    assert_eq!(render(&grammar, &input), "Sequence, Count=2, Children=(let, x)");

    let wrong = Rule::sequence([Rule::keyword("ident", "const"), Rule::any()]);
    assert_eq!(render(&wrong, &input), "<not matched>");
}

#[test]
fn named_rules_label_their_nodes() {
    let input = tokens("A B");
    let grammar = Rule::sequence([tok("A").named("first"), tok("B")]).named("pair");

    insta::assert_snapshot!(
        render(&grammar, &input),
        @"pair, Count=2, Children=(first, Count=1, Children=(a), b)"
    );
}

// Inside a Skip with `support_nested == false`, nested optional clauses
// become mandatory. A nested Skip that cannot match fails the body instead of
// matching empty.
#[test]
fn strict_skip_makes_nested_skips_mandatory() {
    let body = || Rule::sequence([tok("A"), Rule::skip(tok("B")), tok("C")]);
    let strict = Rule::skip_nested(body(), false);
    let lenient = Rule::skip_nested(body(), true);

    let (outcome, position) = run(&strict, &tokens("A C"));
    insta::assert_snapshot!(outcome.into_node().unwrap().render(), @"Skip, SupportNested=false, Count=0, Children=()");
    assert_eq!(position, 0);

    insta::assert_snapshot!(
        render(&strict, &tokens("A B C")),
        @"Skip, SupportNested=false, Count=1, Children=(Sequence, Count=3, Children=(a, Skip, SupportNested=true, Count=1, Children=(b), c))"
    );
    insta::assert_snapshot!(
        render(&lenient, &tokens("A C")),
        @"Skip, SupportNested=true, Count=1, Children=(Sequence, Count=3, Children=(a, Skip, SupportNested=true, Count=0, Children=(), c))"
    );
}

#[test]
fn strict_mode_ends_with_its_skip() {
    let grammar = Rule::sequence([
        Rule::skip_nested(tok("A"), false),
        Rule::skip(tok("B")),
        tok("C"),
    ]);

    insta::assert_snapshot!(
        render(&grammar, &tokens("C")),
        @"Sequence, Count=3, Children=(Skip, SupportNested=false, Count=0, Children=(), Skip, SupportNested=true, Count=0, Children=(), c)"
    );
}

#[test]
fn nested_skip_supporting_nesting_relaxes_again() {
    let grammar = Rule::skip_nested(
        Rule::sequence([
            tok("A"),
            Rule::skip(Rule::sequence([tok("B"), Rule::skip(tok("C"))])),
        ]),
        false,
    );

    insta::assert_snapshot!(
        render(&grammar, &tokens("A B")),
        @"Skip, SupportNested=false, Count=1, Children=(Sequence, Count=2, Children=(a, Skip, SupportNested=true, Count=1, Children=(Sequence, Count=2, Children=(b, Skip, SupportNested=true, Count=0, Children=()))))"
    );
}

#[test]
fn strict_mode_leaves_repeat_optional() {
    let grammar = Rule::skip_nested(Rule::sequence([tok("A"), Rule::repeat(tok("B"))]), false);

    insta::assert_snapshot!(
        render(&grammar, &tokens("A")),
        @"Skip, SupportNested=false, Count=1, Children=(Sequence, Count=2, Children=(a, Repeat, Count=0, Children=()))"
    );
}

#[test]
fn mismatches_never_move_the_cursor() {
    let rules = [
        tok("A"),
        Rule::sequence([tok("A"), tok("B")]),
        Rule::sequence([tok("A"), Rule::repeat(tok("B")), tok("C")]),
        Rule::alternation([Rule::sequence([tok("A"), tok("A")]), tok("C")]),
        Rule::skip_nested(Rule::sequence([tok("A"), Rule::skip(tok("B"))]), false),
    ];
    let inputs = ["", "A", "A B", "A B B", "A A", "B A", "C", "A B B C"];

    for rule in &rules {
        for input in inputs {
            let input = tokens(input);
            let (outcome, position) = run(rule, &input);
            if !outcome.is_matched() {
                assert_eq!(position, 0, "{rule} moved the cursor on {input:?}");
            }
        }
    }
}

#[test]
fn repeat_and_skip_always_match() {
    let inputs = ["", "B", "B B B", "A B", "B A B"];

    for input in inputs {
        let input = tokens(input);
        let leading_bs = input.iter().take_while(|t| t.is("B")).count();

        let (outcome, position) = run(&Rule::repeat(tok("B")), &input);
        assert_eq!(outcome.node().map(Node::count), Some(leading_bs));
        assert_eq!(position, leading_bs);

        let (outcome, position) = run(&Rule::skip(tok("B")), &input);
        let count = outcome.node().map(Node::count).expect("skip always matches");
        assert!(count <= 1);
        assert_eq!(position, count);
    }
}

#[test]
fn empty_skip_does_not_become_last_good() {
    let input = tokens("A X");
    let grammar = Rule::sequence([tok("A"), Rule::skip(tok("B")), tok("C")]);
    let mut ctx = ParseContext::new(&input);

    grammar.try_match(&mut ctx).unwrap();

    let last_good = ctx.last_good().unwrap();
    assert_eq!(last_good.node.render(), "a");
    assert_eq!(last_good.end, 1);
}

#[test]
fn empty_commits_leave_last_good_in_place() {
    let input = tokens("A X");
    let grammar = Rule::sequence([
        tok("A"),
        Rule::repeat(tok("B")),
        Rule::sequence([]),
        Rule::skip(tok("B")),
        tok("C"),
    ]);
    let mut ctx = ParseContext::new(&input);

    let outcome = grammar.try_match(&mut ctx).unwrap();

    assert_eq!(outcome, MatchOutcome::NotMatched);
    let last_good = ctx.last_good().unwrap();
    assert_eq!(last_good.node.render(), "a");
    assert_eq!(last_good.end, 1);
}

#[test]
fn fatal_error_restores_the_context() {
    let input = tokens("A B B C");
    let grammar = Rule::sequence([tok("A"), Rule::repeat(tok("B")), tok("C")]);
    let config = EngineConfig::unlimited().with_exec_fuel(Some(5));
    let mut ctx = ParseContext::new(&input).with_config(&config);

    let err = grammar.try_match(&mut ctx).unwrap_err();

    assert!(matches!(err, Error::ExecFuelExhausted));
    assert_eq!(ctx.position(), 0);
    assert!(ctx.outstanding().is_empty());
    assert_eq!(ctx.depth, 0);
    assert!(!ctx.strict_optional);
}

#[test]
fn fatal_error_inside_strict_skip_restores_the_mode() {
    let input = tokens("A B");
    let grammar = Rule::skip_nested(Rule::sequence([tok("A"), Rule::reference("Missing")]), false);
    let mut ctx = ParseContext::new(&input);

    let err = grammar.try_match(&mut ctx).unwrap_err();

    assert!(matches!(err, Error::UndefinedRule(_)));
    assert_eq!(ctx.position(), 0);
    assert!(ctx.outstanding().is_empty());
    assert!(!ctx.strict_optional);
}

#[test]
fn last_good_is_the_latest_commit() {
    let input = tokens("A B");
    let mut ctx = ParseContext::new(&input);

    Rule::sequence([tok("A"), tok("B")]).try_match(&mut ctx).unwrap();

    let last_good = ctx.last_good().unwrap();
    assert_eq!(last_good.node.render(), "Sequence, Count=2, Children=(a, b)");
    assert_eq!(last_good.end, 2);
}

#[test]
fn combinators_without_children_are_misconfigured() {
    let input = tokens("A");
    for kind in [
        RuleKind::Repeat { max: None },
        RuleKind::Skip {
            support_nested: true,
        },
        RuleKind::Alternation,
    ] {
        let label = kind.label();
        let mut ctx = ParseContext::new(&input);
        let err = Rule::new(kind).try_match(&mut ctx).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("`{label}` requires at least one child rule")
        );
    }
}

#[test]
fn reference_without_definitions_is_an_error() {
    let input = tokens("A");
    let mut ctx = ParseContext::new(&input);

    let err = Rule::reference("Expr").try_match(&mut ctx).unwrap_err();

    assert!(matches!(err, Error::UndefinedRule(name) if name == "Expr"));
}

#[test]
fn exec_fuel_counts_rule_attempts() {
    let input = tokens("A B C");
    let grammar = Rule::sequence([tok("A"), tok("B"), tok("C")]);

    let tight = EngineConfig::unlimited().with_exec_fuel(Some(3));
    let mut ctx = ParseContext::new(&input).with_config(&tight);
    let err = grammar.try_match(&mut ctx).unwrap_err();
    assert!(matches!(err, Error::ExecFuelExhausted));

    let enough = EngineConfig::unlimited().with_exec_fuel(Some(4));
    let mut ctx = ParseContext::new(&input).with_config(&enough);
    assert!(grammar.try_match(&mut ctx).unwrap().is_matched());
    assert_eq!(ctx.fuel_consumed(), 4);
}

#[test]
fn cancellation_is_polled_between_repeat_iterations() {
    let input = tokens(&"B ".repeat(100));
    let polls = Cell::new(0u32);
    let cancel = || {
        polls.set(polls.get() + 1);
        polls.get() > 10
    };
    let mut ctx = ParseContext::new(&input).with_cancellation(&cancel);

    let err = Rule::repeat(tok("B")).try_match(&mut ctx).unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(ctx.position() < input.len());
}
