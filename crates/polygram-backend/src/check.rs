use std::collections::HashSet;

use cranelift_entity::{EntitySet, SecondaryMap};

use crate::{
    error::{Problem, WellFormednessError},
    model::{Expr, Grammar, LiteralValue, RuleHandle},
    optimize::first::FirstSets,
};

/// Reports every structural problem of the grammar at once.
pub fn validate(grammar: &Grammar) -> Result<(), WellFormednessError> {
    let mut problems = Vec::new();
    let mut push = |problem: Problem| {
        if !problems.contains(&problem) {
            problems.push(problem);
        }
    };

    if grammar.find(grammar.root()).is_none() {
        push(Problem::UndefinedRoot(grammar.root().to_owned()));
    }

    let mut seen = HashSet::new();
    for rule in grammar.rules() {
        if !seen.insert(rule.name.as_str()) {
            push(Problem::DuplicateRule(rule.name.clone()));
        }

        rule.expr.visit(|expr| match expr {
            Expr::Reference(name) => {
                if grammar.find(name).is_none() && !grammar.is_external(name) {
                    push(Problem::UndefinedReference {
                        rule: rule.name.clone(),
                        name: name.clone(),
                    });
                }
            }
            &Expr::Repetition {
                min, max: Some(max), ..
            } => {
                if max == 0 || min > max {
                    push(Problem::InvalidBounds {
                        rule: rule.name.clone(),
                        min,
                        max,
                    });
                }
            }
            Expr::Literal(literal) => {
                if matches!(&literal.value, LiteralValue::Text(text) if text.is_empty()) {
                    push(Problem::EmptyLiteral {
                        rule: rule.name.clone(),
                    });
                }
            }
            _ => {}
        });
    }

    match problems.is_empty() {
        true => Ok(()),
        false => Err(WellFormednessError { problems }),
    }
}

/// Name of the first rule containing an unordered choice.
pub fn find_unordered_choice(grammar: &Grammar) -> Option<&str> {
    grammar.rules().find_map(|rule| {
        let mut found = false;
        rule.expr.visit(|expr| found |= matches!(expr, Expr::Choice { ordered: false, .. }));
        found.then_some(rule.name.as_str())
    })
}

/// Rules that can call themselves without consuming input first. Parsing through them
/// always ends with a recursion error.
pub fn find_left_recursion(grammar: &Grammar, first: &FirstSets) -> Vec<String> {
    let mut prefix_rules: SecondaryMap<RuleHandle, Vec<RuleHandle>> = SecondaryMap::new();
    for (handle, rule) in grammar.iter() {
        let mut names = Vec::new();
        collect_prefix_rules(&rule.expr, first, &mut names);
        prefix_rules[handle] = names
            .into_iter()
            .filter_map(|name| grammar.find(name))
            .collect();
    }

    let mut recursive = Vec::new();
    for (handle, rule) in grammar.iter() {
        let mut visited = EntitySet::new();
        let mut stack = prefix_rules[handle].clone();
        while let Some(next) = stack.pop() {
            if next == handle {
                recursive.push(rule.name.clone());
                break;
            }
            if visited.insert(next) {
                stack.extend_from_slice(&prefix_rules[next]);
            }
        }
    }
    recursive
}

fn collect_prefix_rules<'a>(expr: &'a Expr, first: &FirstSets, rules: &mut Vec<&'a str>) {
    match expr {
        Expr::Reference(name) => rules.push(name),
        Expr::Sequence(items) => {
            for item in items {
                collect_prefix_rules(item, first, rules);
                if !first.expr(item).nullable {
                    break;
                }
            }
        }
        Expr::Choice { alternatives, .. } => {
            for alternative in alternatives {
                collect_prefix_rules(alternative, first, rules);
            }
        }
        Expr::Repetition { expr, .. } | Expr::Optional(expr) | Expr::Group(expr) => {
            collect_prefix_rules(expr, first, rules)
        }
        Expr::Exclude { base, except } => {
            collect_prefix_rules(base, first, rules);
            collect_prefix_rules(except, first, rules);
        }
        Expr::Literal(_) | Expr::AnchorStart | Expr::AnchorEnd => {}
    }
}
