use crate::model::{Expr, Grammar};

/// Brings every rule into canonical form: groups are removed, optionals become repetitions,
/// singleton sequences and choices collapse and nested sequences or ordered choices are
/// flattened into their parent.
pub fn normalize(grammar: &Grammar) -> Grammar {
    grammar.map_exprs(|rule| normalize_expr(rule.expr.clone()))
}

pub fn normalize_expr(expr: Expr) -> Expr {
    expr.transform(normalize_node)
}

/// Expects the children to already be normalized.
pub(crate) fn normalize_node(expr: Expr) -> Expr {
    match expr {
        Expr::Group(inner) => *inner,
        Expr::Optional(inner) => Expr::Repetition {
            expr: inner,
            min: 0,
            max: Some(1),
            greedy: true,
        },
        Expr::Repetition {
            expr,
            min: 1,
            max: Some(1),
            ..
        } => *expr,
        Expr::Sequence(items) => {
            let mut items = inline_some_children(items, |child| match child {
                Expr::Sequence(inner) => Ok(inner),
                other => Err(other),
            });
            match items.len() {
                1 => items.remove(0),
                _ => Expr::Sequence(items),
            }
        }
        Expr::Choice {
            alternatives,
            ordered,
        } => {
            let mut alternatives = match ordered {
                true => inline_some_children(alternatives, |child| match child {
                    Expr::Choice {
                        alternatives,
                        ordered: true,
                    } => Ok(alternatives),
                    other => Err(other),
                }),
                false => alternatives,
            };
            match alternatives.len() {
                1 => alternatives.remove(0),
                _ => Expr::Choice {
                    alternatives,
                    ordered,
                },
            }
        }
        other => other,
    }
}

/// Splices the children for which `split` returns `Ok` into the parent list.
fn inline_some_children(
    children: Vec<Expr>,
    mut split: impl FnMut(Expr) -> Result<Vec<Expr>, Expr>,
) -> Vec<Expr> {
    let mut new_children = Vec::with_capacity(children.len());
    for child in children {
        match split(child) {
            Ok(mut inner) => new_children.append(&mut inner),
            Err(child) => new_children.push(child),
        }
    }
    new_children
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_expr() {
        let expr = Expr::seq([
            Expr::group(Expr::seq([Expr::text("a"), Expr::text("b")])),
            Expr::choice([
                Expr::choice([Expr::text("c"), Expr::text("d")]),
                Expr::unordered([Expr::text("e"), Expr::text("f")]),
            ]),
            Expr::optional(Expr::reference("x")),
            Expr::repeat(Expr::seq([Expr::reference("y")]), 1, Some(1)),
        ]);

        let expected = Expr::seq([
            Expr::text("a"),
            Expr::text("b"),
            Expr::choice([
                Expr::text("c"),
                Expr::text("d"),
                Expr::unordered([Expr::text("e"), Expr::text("f")]),
            ]),
            Expr::repeat(Expr::reference("x"), 0, Some(1)),
            Expr::reference("y"),
        ]);
        assert_eq!(normalize_expr(expr), expected);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let expr = Expr::choice([
            Expr::group(Expr::choice([Expr::text("a")])),
            Expr::seq([Expr::seq([]), Expr::optional(Expr::optional(Expr::text("b")))]),
        ]);
        let once = normalize_expr(expr);
        assert_eq!(normalize_expr(once.clone()), once);
    }
}
