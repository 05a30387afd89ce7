mod common;

use common::{list_grammar, list_visitor, optimized, unoptimized};
use polygram_backend::{
    compile,
    runtime::{
        Enter, Error, Expected, Match, ParseError, ParseMode, RecursionError, SemanticValue, Span,
        Tree, Visitor,
    },
    Expr, Grammar, Rule,
};

fn single(expr: Expr) -> Grammar {
    Grammar::new("root").with_rule(Rule::new("root", expr))
}

fn parse_error(result: Result<impl std::fmt::Debug, Error>) -> ParseError {
    match result {
        Err(Error::Parse(err)) => err,
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn test_list_values() {
    let runtime = optimized(&list_grammar(), &list_visitor());

    let value = runtime.parse_str("[-12, x]").unwrap();
    assert_eq!(
        value,
        Tree::branch("list", vec![
            Tree::leaf("["),
            Tree::branch("number", vec![Tree::leaf("-"), Tree::leaf("12")]),
            Tree::leaf(","),
            Tree::branch("word", vec![Tree::leaf("x")]),
            Tree::leaf("]"),
        ])
    );

    let value = runtime.parse_str("[TRUE,trueish]").unwrap();
    assert_eq!(
        value,
        Tree::branch("list", vec![
            Tree::leaf("["),
            Tree::branch("keyword", vec![Tree::leaf("TRUE")]),
            Tree::leaf(","),
            Tree::branch("word", vec![Tree::leaf("trueish")]),
            Tree::leaf("]"),
        ])
    );

    let value = runtime.parse_str("[\"a\\\"b\"]").unwrap();
    assert_eq!(
        value.children()[1],
        Tree::leaf("\"a\\\"b\"")
    );
}

#[test]
fn test_list_error() {
    for runtime in [
        optimized(&list_grammar(), &list_visitor()),
        unoptimized(&list_grammar(), &list_visitor()),
    ] {
        let err = parse_error(runtime.parse("[1 2]", ParseMode::Full));
        assert_eq!(err.position, 3);
        assert!(err.expected.contains(&Expected::Literal(",".into())));
        assert!(err.expected.contains(&Expected::Literal("]".into())));
    }
}

#[test]
fn test_repetition_bounds() {
    let runtime = compile(
        &single(Expr::repeat(Expr::text("a"), 2, Some(3))),
        &Visitor::<Tree>::new(),
    )
    .unwrap();

    assert!(runtime.parse_str("aa").is_ok());
    assert!(runtime.parse_str("aaa").is_ok());
    assert!(runtime.parse_str("").is_err());
    assert!(runtime.parse_str("a").is_err());

    let err = parse_error(runtime.parse("aaaa", ParseMode::Full));
    assert_eq!(err.position, 3);
    assert_eq!(err.expected, [Expected::EndOfInput]);

    let parsed = runtime.parse("aaaa", ParseMode::Prefix).unwrap();
    assert_eq!(parsed.consumed, 3);
}

#[test]
fn test_lazy_repetition() {
    // root = "a"*? "ab"
    let grammar = single(Expr::seq([
        Expr::lazy(Expr::text("a"), 0, None),
        Expr::text("ab"),
    ]));
    let runtime = compile(&grammar, &Visitor::<Tree>::new()).unwrap();

    assert_eq!(
        runtime.parse_str("aaab").unwrap(),
        Tree::Sequence(vec![
            Tree::leaf("a"),
            Tree::leaf("a"),
            Tree::leaf("ab")
        ])
    );
    assert_eq!(runtime.parse("aab", ParseMode::Prefix).unwrap().consumed, 3);
}

#[test]
fn test_furthest_failure() {
    let grammar = single(Expr::choice([Expr::text("ab"), Expr::text("ac")]));
    for runtime in [
        optimized(&grammar, &Visitor::<Tree>::new()),
        unoptimized(&grammar, &Visitor::<Tree>::new()),
    ] {
        let err = parse_error(runtime.parse("ad", ParseMode::Full));
        assert_eq!(err.position, 1);
        assert_eq!(err.expected, [
            Expected::Literal("b".into()),
            Expected::Literal("c".into())
        ]);
        assert_eq!(
            err.to_string(),
            "unexpected input at offset 1, expected \"b\" or \"c\""
        );
    }
}

#[test]
fn test_token_failure_is_the_token() {
    let grammar = Grammar::new("root")
        .with_rule(Rule::new(
            "root",
            Expr::seq([Expr::reference("KEY"), Expr::text(";")]),
        ))
        .with_rule(Rule::new("KEY", Expr::choice([Expr::text("ab"), Expr::text("ac")])).token());

    for runtime in [
        optimized(&grammar, &Visitor::<Tree>::new()),
        unoptimized(&grammar, &Visitor::<Tree>::new()),
    ] {
        assert_eq!(
            runtime.parse_str("ac;").unwrap(),
            Tree::Sequence(vec![Tree::leaf("ac"), Tree::leaf(";")])
        );
        let err = parse_error(runtime.parse("ad;", ParseMode::Full));
        assert_eq!(err.position, 0);
        assert_eq!(err.expected, [Expected::Rule("KEY".into())]);
    }
}

#[test]
fn test_left_recursion() {
    // rule = rule "x" | "x"
    let grammar = Grammar::new("rule").with_rule(Rule::new(
        "rule",
        Expr::choice([
            Expr::seq([Expr::reference("rule"), Expr::text("x")]),
            Expr::text("x"),
        ]),
    ));
    for runtime in [
        optimized(&grammar, &Visitor::<Tree>::new()),
        unoptimized(&grammar, &Visitor::<Tree>::new()),
    ] {
        let err = runtime.parse("xx", ParseMode::Full).unwrap_err();
        assert_eq!(
            err,
            Error::Recursion(RecursionError {
                rule: "rule".into(),
                position: 0
            })
        );
    }
}

#[test]
fn test_indirect_recursion_not_at_start() {
    // a = "(" a ")" | "x"
    let grammar = single(Expr::choice([
        Expr::seq([Expr::text("("), Expr::reference("root"), Expr::text(")")]),
        Expr::text("x"),
    ]));
    let runtime = compile(&grammar, &Visitor::<Tree>::tree(["root"])).unwrap();
    assert_eq!(
        runtime.parse_str("((x))").unwrap().to_string(),
        "root\n  \"(\"\n  root\n    \"(\"\n    root\n      \"x\"\n    \")\"\n  \")\"\n"
    );
}

#[test]
fn test_case_insensitive() {
    let grammar = single(Expr::seq([
        Expr::text_nocase("select"),
        Expr::Literal(polygram_backend::Literal {
            value: polygram_backend::LiteralValue::Set(
                polygram_backend::runtime::CharSet::range('a', 'c'),
            ),
            case_sensitive: false,
        }),
    ]));
    let runtime = compile(&grammar, &Visitor::<Tree>::new()).unwrap();

    assert_eq!(
        runtime.parse_str("SeLeCtB").unwrap(),
        Tree::Sequence(vec![Tree::leaf("SeLeCt"), Tree::leaf("B")])
    );
    assert!(runtime.parse_str("selectd").is_err());
}

#[test]
fn test_exclude_and_lookahead() {
    let runtime = optimized(&list_grammar(), &list_visitor());

    assert!(runtime.parse_str("[null]").is_ok());
    // keywords are not words, `nullx` is not a keyword
    let value = runtime.parse_str("[nullx]").unwrap();
    assert_eq!(value.children()[1], Tree::branch("word", vec![Tree::leaf("nullx")]));
    let value = runtime.parse_str("[null]").unwrap();
    assert_eq!(value.children()[1], Tree::branch("keyword", vec![Tree::leaf("null")]));
}

#[test]
fn test_anchors() {
    let grammar = single(Expr::seq([
        Expr::Reference("START".into()),
        Expr::text("a"),
        Expr::optional(Expr::AnchorEnd),
    ]))
    .with_rule(Rule::new("START", Expr::AnchorStart));
    let runtime = compile(&grammar, &Visitor::<Tree>::new()).unwrap();

    assert!(runtime.parse_str("a").is_ok());
    assert_eq!(runtime.parse("ab", ParseMode::Prefix).unwrap().consumed, 1);

    // the end anchor never matches before the end of input
    let anchored = single(Expr::seq([Expr::text("a"), Expr::AnchorEnd, Expr::text("b")]));
    let runtime = compile(&anchored, &Visitor::<Tree>::new()).unwrap();
    let err = parse_error(runtime.parse("ab", ParseMode::Prefix));
    assert_eq!(err.position, 1);
    assert_eq!(err.expected, [Expected::EndOfInput]);
}

#[test]
fn test_ignored_rule() {
    let grammar = single(Expr::seq([
        Expr::text("a"),
        Expr::reference("_"),
        Expr::text("b"),
    ]))
    .with_rule(Rule::new("_", Expr::star(Expr::text(" "))).ignored());
    let runtime = compile(&grammar, &Visitor::<Tree>::new()).unwrap();

    assert_eq!(
        runtime.parse_str("a   b").unwrap(),
        Tree::Sequence(vec![Tree::leaf("a"), Tree::leaf("b")])
    );
}

#[test]
fn test_long_input() {
    let letters = single(Expr::star(Expr::range('a', 'z')));
    let runtime = compile(&letters, &Visitor::<()>::new()).unwrap();
    let input = "a".repeat(100_000);
    assert_eq!(runtime.parse(&input, ParseMode::Full).unwrap().consumed, 100_000);

    let input = format!("[{}]", vec!["12"; 20_000].join(", "));
    for runtime in [
        optimized(&list_grammar(), &list_visitor()),
        unoptimized(&list_grammar(), &list_visitor()),
    ] {
        let value = runtime.parse_str(&input).unwrap();
        assert_eq!(value.children().len(), 2 * 20_000 + 1);
    }
}

/// Number of matched digits, weighted by their value.
#[derive(PartialEq, Eq, Debug)]
struct Count(usize);

impl SemanticValue for Count {
    fn from_text(_: &str, _: Span) -> Self {
        Count(0)
    }
    fn from_sequence(values: Vec<Self>) -> Self {
        Count(values.into_iter().map(|Count(n)| n).sum())
    }
}

#[test]
fn test_hooks() {
    fn count(_: &Match<'_>, children: Vec<Count>) -> Count {
        Count(children.into_iter().map(|Count(n)| n).sum::<usize>() + 1)
    }
    fn digit_value(m: &Match<'_>) -> Count {
        Count(m.text.parse().unwrap())
    }
    fn not_after_zero(enter: &Enter<'_>) -> bool {
        !enter.input[..enter.position].ends_with('0')
    }

    // root = digit+   digit = [0-9]
    let grammar = single(Expr::plus(Expr::reference("digit")))
        .with_rule(Rule::new("digit", Expr::range('0', '9')));
    let visitor = Visitor::<Count>::new()
        .on_value("root", count)
        .on_match("digit", digit_value)
        .on_enter("digit", not_after_zero);
    let runtime = compile(&grammar, &visitor).unwrap();

    assert_eq!(runtime.parse_str("123").unwrap(), Count(1 + 2 + 3 + 1));
    let err = parse_error(runtime.parse("103", ParseMode::Full));
    assert_eq!(err.position, 2);
    assert!(err.expected.contains(&Expected::Rule("digit".into())));
}

#[test]
fn test_source_display() {
    let runtime = optimized(&list_grammar(), &list_visitor());
    let input = "[1,\n 2,,]";
    let err = parse_error(runtime.parse(input, ParseMode::Full));
    assert_eq!(err.position, 7);
    assert_eq!(err.line_column(input), (2, 4));

    let rendered = err.display_in(input).to_string();
    assert!(rendered.starts_with("At 2:4 (7): unexpected input at offset 7, expected"));
    assert!(rendered.contains("\n     2,,]\n"));
}

#[test]
fn test_demo_grammar() {
    let grammar: Grammar = serde_json::from_str(include_str!("../../../demos/arith.json")).unwrap();
    let runtime = compile(&grammar, &Visitor::<Tree>::tree(["expr", "term"])).unwrap();

    let value = runtime.parse_str(include_str!("../../../demos/arith.txt")).unwrap();
    let Tree::Node { rule, children } = &value else {
        panic!("expected an expr node, got {value:?}");
    };
    assert_eq!(rule, "expr");
    assert_eq!(children.len(), 3);
    assert_eq!(children[1], Tree::leaf("+"));

    let err = parse_error(runtime.parse("1 +", ParseMode::Full));
    assert_eq!(err.position, 3);
    assert!(err.expected.contains(&Expected::Rule("NUMBER".into())));
    assert!(err.expected.contains(&Expected::Literal("(".into())));
}
