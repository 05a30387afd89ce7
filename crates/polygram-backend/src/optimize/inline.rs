use std::collections::{BTreeSet, HashMap};

use cranelift_entity::{EntitySet, SecondaryMap};

use crate::model::{Expr, Grammar, RuleHandle};

/// Rules that can reach themselves through references.
pub(crate) fn recursive_rules(grammar: &Grammar) -> EntitySet<RuleHandle> {
    let mut edges: SecondaryMap<RuleHandle, Vec<RuleHandle>> = SecondaryMap::new();
    for (handle, rule) in grammar.iter() {
        edges[handle] = rule
            .expr
            .references()
            .into_iter()
            .filter_map(|name| grammar.find(name))
            .collect();
    }

    let mut recursive = EntitySet::new();
    for (handle, _) in grammar.iter() {
        let mut visited = EntitySet::new();
        let mut stack = edges[handle].clone();
        while let Some(next) = stack.pop() {
            if next == handle {
                recursive.insert(handle);
                break;
            }
            if visited.insert(next) {
                stack.extend_from_slice(&edges[next]);
            }
        }
    }
    recursive
}

/// Substitutes every rule that is referenced exactly once into its only call site.
///
/// The root, recursive rules, rules with attributes and `preserve`d rules stay. A rule without
/// a value hook splices its children into its parent, so substituting it keeps values intact.
pub(super) fn inline_rules(grammar: &Grammar, preserve: &BTreeSet<String>) -> Grammar {
    let mut references: HashMap<&str, usize> = HashMap::new();
    let mut definitions: HashMap<&str, usize> = HashMap::new();
    for rule in grammar.rules() {
        *definitions.entry(&rule.name).or_default() += 1;
        for name in rule.expr.references() {
            *references.entry(name).or_default() += 1;
        }
    }

    let recursive = recursive_rules(grammar);
    let candidates = grammar
        .iter()
        .filter(|(handle, rule)| {
            let name = rule.name.as_str();
            name != grammar.root()
                && references.get(name) == Some(&1)
                && definitions.get(name) == Some(&1)
                && rule.attributes.is_empty()
                && !preserve.contains(name)
                && !recursive.contains(*handle)
        })
        .map(|(handle, _)| handle)
        .collect::<Vec<_>>();

    if candidates.is_empty() {
        return grammar.clone();
    }

    let mut grammar = grammar.clone();
    let handles = grammar.iter().map(|(handle, _)| handle).collect::<Vec<_>>();
    let mut removed = EntitySet::new();
    for candidate in candidates {
        let name = grammar.get(candidate).name.clone();
        let body = grammar.get(candidate).expr.clone();
        removed.insert(candidate);

        let mut replaced = 0;
        for &handle in &handles {
            if removed.contains(handle) {
                continue;
            }
            grammar.get_mut(handle).expr.visit_mut(|expr| {
                if matches!(expr, Expr::Reference(target) if *target == name) {
                    *expr = Expr::group(body.clone());
                    replaced += 1;
                }
            });
        }
        debug_assert_eq!(replaced, 1, "Rule `{name}` should have exactly one call site");
        log::debug!("Inlined rule `{name}`");
    }

    grammar.retain(|handle, _| !removed.contains(handle));
    grammar
}
