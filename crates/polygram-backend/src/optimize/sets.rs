use polygram_runtime::CharSet;

use crate::model::{Expr, Grammar};

/// Merges adjacent symbol-set alternatives of ordered choices and folds the difference of two
/// symbol sets into a single set.
pub(super) fn coalesce_sets(grammar: &Grammar) -> Grammar {
    grammar.map_exprs(|rule| rule.expr.clone().transform(coalesce_node))
}

fn as_set(expr: &Expr) -> Option<CharSet> {
    expr.as_literal()?.as_set()
}

fn coalesce_node(expr: Expr) -> Expr {
    match expr {
        Expr::Choice {
            alternatives,
            ordered: true,
        } => {
            let mut out: Vec<Expr> = Vec::with_capacity(alternatives.len());
            for alternative in alternatives {
                if let (Some(previous), Some(set)) = (out.last_mut(), as_set(&alternative)) {
                    if let Some(merged) = as_set(previous) {
                        *previous = Expr::set(merged.union(&set));
                        continue;
                    }
                }
                out.push(alternative);
            }
            Expr::Choice {
                alternatives: out,
                ordered: true,
            }
        }
        Expr::Exclude { base, except } => match (as_set(&base), as_set(&except)) {
            (Some(base), Some(except)) => Expr::set(base.difference(&except)),
            _ => Expr::Exclude { base, except },
        },
        other => other,
    }
}
