use std::collections::BTreeSet;

use cranelift_entity::EntitySet;

use crate::model::Grammar;

/// Removes rules which can't be reached from the root or from a `preserve`d rule.
pub(super) fn eliminate_dead_rules(grammar: &mut Grammar, preserve: &BTreeSet<String>) {
    let Some(root) = grammar.find(grammar.root()) else {
        return;
    };

    let mut reachable = EntitySet::new();
    let mut stack = vec![root];
    stack.extend(preserve.iter().filter_map(|name| grammar.find(name)));
    while let Some(handle) = stack.pop() {
        if reachable.insert(handle) {
            let rule = grammar.get(handle);
            stack.extend(rule.expr.references().into_iter().filter_map(|name| grammar.find(name)));
        }
    }

    let before = grammar.len();
    grammar.retain(|handle, rule| {
        let keep = reachable.contains(handle);
        if !keep {
            log::debug!("Removed unreachable rule `{}`", rule.name);
        }
        keep
    });
    if grammar.len() != before {
        log::debug!("Removed {} unreachable rules", before - grammar.len());
    }
}

#[test]
fn test_eliminate_dead_rules() {
    use crate::model::Expr;

    let mut grammar = Grammar::new("root");
    grammar.define("unused", Expr::reference("root"));
    grammar.define("root", Expr::seq([Expr::reference("a"), Expr::text("!")]));
    grammar.define("a", Expr::reference("a2"));
    grammar.define("a2", Expr::text("a"));
    grammar.define("hooked", Expr::reference("helper"));
    grammar.define("helper", Expr::text("h"));
    grammar.define("orphan", Expr::text("o"));

    eliminate_dead_rules(&mut grammar, &BTreeSet::from(["hooked".to_owned()]));
    let names = grammar.rules().map(|rule| rule.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["root", "a", "a2", "hooked", "helper"]);
}
