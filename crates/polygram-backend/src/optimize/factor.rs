use crate::model::{Expr, Grammar, Literal, LiteralValue};

/// Hoists a literal shared by adjacent alternatives of an ordered choice out of them.
///
/// `"a" x | "a" y | z` becomes `"a" (x | y) | z`. In rules whose child values are discarded
/// (tokens and ignored rules) a common prefix of text literals is split off as well, so
/// `"abc" | "abd"` becomes `"ab" ("c" | "d")`.
pub(super) fn left_factor(grammar: &Grammar) -> Grammar {
    grammar.map_exprs(|rule| {
        let split_text = !rule.attributes.is_empty();
        rule.expr.clone().transform(|expr| match expr {
            Expr::Choice {
                alternatives,
                ordered: true,
            } => Expr::Choice {
                alternatives: factor_alternatives(alternatives, split_text),
                ordered: true,
            },
            other => other,
        })
    })
}

fn leading_literal(expr: &Expr) -> Option<&Literal> {
    match expr {
        Expr::Literal(literal) => Some(literal),
        Expr::Sequence(items) => items.first()?.as_literal(),
        _ => None,
    }
}

fn leading_text(expr: &Expr) -> Option<(&str, bool)> {
    let literal = leading_literal(expr)?;
    Some((literal.as_text()?, literal.case_sensitive))
}

/// Removes the leading literal.
fn strip_leading(expr: Expr) -> Expr {
    match expr {
        Expr::Literal(_) => Expr::empty(),
        Expr::Sequence(mut items) => {
            items.remove(0);
            Expr::Sequence(items)
        }
        other => unreachable!("No leading literal in {other:?}"),
    }
}

/// Drops the first `len` bytes of the leading text literal.
fn strip_leading_text(expr: Expr, len: usize) -> Expr {
    let shorten = |literal: Literal| -> Option<Expr> {
        let LiteralValue::Text(text) = literal.value else {
            unreachable!("Leading literal is not text");
        };
        let rest = &text[len..];
        (!rest.is_empty()).then(|| Expr::Literal(Literal {
            value: LiteralValue::Text(rest.to_owned()),
            case_sensitive: literal.case_sensitive,
        }))
    };
    match expr {
        Expr::Literal(literal) => shorten(literal).unwrap_or_else(Expr::empty),
        Expr::Sequence(mut items) => {
            let Expr::Literal(literal) = items.remove(0) else {
                unreachable!("Sequence has no leading literal");
            };
            if let Some(rest) = shorten(literal) {
                items.insert(0, rest);
            }
            Expr::Sequence(items)
        }
        other => unreachable!("No leading literal in {other:?}"),
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|&((_, x), y)| x != y)
        .map_or(a.len().min(b.len()), |((i, _), _)| i)
}

fn factor_alternatives(alternatives: Vec<Expr>, split_text: bool) -> Vec<Expr> {
    let mut out = Vec::with_capacity(alternatives.len());
    let mut rest = alternatives.into_iter().peekable();

    while let Some(first) = rest.next() {
        let Some(head) = leading_literal(&first).cloned() else {
            out.push(first);
            continue;
        };

        let mut run = vec![first];
        while let Some(next) = rest.next_if(|next| leading_literal(next) == Some(&head)) {
            run.push(next);
        }
        if run.len() > 1 {
            log::trace!("Factored out a literal shared by {} alternatives", run.len());
            let remainders = run.into_iter().map(strip_leading).collect::<Vec<_>>();
            out.push(Expr::seq([Expr::Literal(head), Expr::choice(remainders)]));
            continue;
        }

        let Some(first) = run.pop() else {
            continue;
        };
        if !split_text {
            out.push(first);
            continue;
        }
        let Some((text, case_sensitive)) = leading_text(&first) else {
            out.push(first);
            continue;
        };

        let mut prefix = text.to_owned();
        let mut run = vec![first];
        while let Some(next) = rest.next_if(|next| match leading_text(next) {
            Some((other, other_case)) if other_case == case_sensitive => {
                common_prefix_len(&prefix, other) > 0
            }
            _ => false,
        }) {
            if let Some((other, _)) = leading_text(&next) {
                let len = common_prefix_len(&prefix, other);
                prefix.truncate(len);
            }
            run.push(next);
        }

        if run.len() > 1 {
            log::trace!("Split text prefix {prefix:?} off {} alternatives", run.len());
            let remainders = run
                .into_iter()
                .map(|alternative| strip_leading_text(alternative, prefix.len()))
                .collect::<Vec<_>>();
            let head = Expr::Literal(Literal {
                value: LiteralValue::Text(prefix),
                case_sensitive,
            });
            out.push(Expr::seq([head, Expr::choice(remainders)]));
        } else {
            out.extend(run);
        }
    }

    out
}
