#![allow(dead_code)]

use polygram_backend::{
    compile, compile_with,
    runtime::{CharSet, Runtime, Tree, Visitor},
    CompileOptions, Expr, Grammar, OptimizerOptions, Rule,
};

/// Bracketed lists of numbers, strings, keywords and words.
pub fn list_grammar() -> Grammar {
    let word_char = || {
        Expr::choice([
            Expr::range('a', 'z'),
            Expr::range('A', 'Z'),
            Expr::range('0', '9'),
            Expr::text("_"),
        ])
    };
    let not_followed_by = |expr: Expr| Expr::exclude(Expr::empty(), expr);

    Grammar::new("list")
        .with_rule(Rule::new(
            "list",
            Expr::seq([
                Expr::text("["),
                Expr::reference("_ws"),
                Expr::optional(Expr::seq([
                    Expr::reference("value"),
                    Expr::star(Expr::seq([
                        Expr::reference("_ws"),
                        Expr::text(","),
                        Expr::reference("_ws"),
                        Expr::reference("value"),
                    ])),
                ])),
                Expr::reference("_ws"),
                Expr::text("]"),
            ]),
        ))
        .with_rule(Rule::new(
            "value",
            Expr::choice([
                Expr::reference("number"),
                Expr::reference("STRING"),
                Expr::reference("keyword"),
                Expr::reference("word"),
                Expr::reference("list"),
            ]),
        ))
        .with_rule(Rule::new(
            "number",
            Expr::seq([Expr::optional(Expr::text("-")), Expr::reference("DIGITS")]),
        ))
        .with_rule(Rule::new("DIGITS", Expr::plus(Expr::range('0', '9'))).token())
        .with_rule(
            Rule::new(
                "STRING",
                Expr::seq([
                    Expr::text("\""),
                    Expr::star(Expr::choice([
                        Expr::exclude(
                            Expr::range(' ', char::MAX),
                            Expr::set(CharSet::from_chars(['"', '\\'])),
                        ),
                        Expr::seq([Expr::text("\\"), Expr::range(' ', char::MAX)]),
                    ])),
                    Expr::text("\""),
                ]),
            )
            .token(),
        )
        .with_rule(Rule::new(
            "keyword",
            Expr::seq([
                Expr::choice([
                    Expr::text_nocase("true"),
                    Expr::text_nocase("false"),
                    Expr::text_nocase("null"),
                ]),
                not_followed_by(word_char()),
            ]),
        ))
        .with_rule(Rule::new(
            "word",
            Expr::exclude(Expr::reference("IDENT"), Expr::reference("keyword")),
        ))
        .with_rule(
            Rule::new(
                "IDENT",
                Expr::seq([
                    Expr::choice([Expr::range('a', 'z'), Expr::range('A', 'Z'), Expr::text("_")]),
                    Expr::star(word_char()),
                ]),
            )
            .token(),
        )
        .with_rule(
            Rule::new(
                "_ws",
                Expr::star(Expr::set(CharSet::from_chars([' ', '\t', '\n']))),
            )
            .ignored(),
        )
}

pub fn list_visitor() -> Visitor<Tree> {
    Visitor::<Tree>::tree(["list", "number", "keyword", "word"])
}

pub fn unoptimized<V>(grammar: &Grammar, visitor: &Visitor<V>) -> Runtime<V> {
    let options = CompileOptions {
        optimize: false,
        optimizer: OptimizerOptions::none(),
        predictive: false,
    };
    compile_with(grammar, visitor, &options).unwrap()
}

pub fn optimized<V>(grammar: &Grammar, visitor: &Visitor<V>) -> Runtime<V> {
    compile(grammar, visitor).unwrap()
}

pub const LIST_INPUTS: &[&str] = &[
    "[]",
    "[ ]",
    "[1]",
    "[-12, 3]",
    "[abc, true, TRUE, trueish, null_, \"str\\\"ing\"]",
    "[[1, [2]], [], x]",
    "[1,]",
    "[1 2]",
    "[\"unterminated]",
    "[-]",
    "[false, False, fAlSe]",
    "",
    "[",
    "[1]]",
];
