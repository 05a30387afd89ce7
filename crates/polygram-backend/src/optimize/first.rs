use std::collections::HashMap;

use polygram_runtime::CharSet;

use crate::model::{Expr, Grammar, LiteralValue};

/// Symbols that can start a match, and whether the empty match is possible.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct First {
    pub set: CharSet,
    pub nullable: bool,
}

impl First {
    fn unknown() -> First {
        First {
            set: CharSet::empty(),
            nullable: true,
        }
    }
    fn union(&mut self, other: &First) {
        self.set = self.set.union(&other.set);
        self.nullable |= other.nullable;
    }
}

/// FIRST sets of every rule of a grammar.
#[derive(Clone, Debug, Default)]
pub struct FirstSets {
    rules: HashMap<String, First>,
}

impl FirstSets {
    /// Iterates until no rule's set changes, starting from empty non-nullable sets.
    pub fn compute(grammar: &Grammar) -> FirstSets {
        let mut this = FirstSets::default();
        for rule in grammar.rules() {
            this.rules.entry(rule.name.clone()).or_default();
        }

        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut changed = false;
            for (handle, rule) in grammar.iter() {
                // duplicate definitions are malformed, only the first counts
                if grammar.find(&rule.name) != Some(handle) {
                    continue;
                }
                let first = this.expr(&rule.expr);
                if this.rules.get(&rule.name) != Some(&first) {
                    this.rules.insert(rule.name.clone(), first);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        log::trace!("FIRST sets converged after {rounds} rounds");

        this
    }

    /// Unknown rules are treated as matching anything, including nothing.
    pub fn rule(&self, name: &str) -> First {
        match self.rules.get(name) {
            Some(first) => first.clone(),
            None => First::unknown(),
        }
    }

    pub fn expr(&self, expr: &Expr) -> First {
        match expr {
            Expr::Literal(literal) => match &literal.value {
                LiteralValue::Text(text) => match text.chars().next() {
                    Some(c) => First {
                        set: match literal.case_sensitive {
                            true => CharSet::single(c),
                            false => CharSet::single(c).ascii_case_folded(),
                        },
                        nullable: false,
                    },
                    None => First {
                        set: CharSet::empty(),
                        nullable: true,
                    },
                },
                LiteralValue::Set(_) => First {
                    set: literal.as_set().unwrap_or_default(),
                    nullable: false,
                },
            },
            Expr::Reference(name) => self.rule(name),
            Expr::Sequence(items) => {
                let mut first = First {
                    set: CharSet::empty(),
                    nullable: true,
                };
                for item in items {
                    let item = self.expr(item);
                    first.set = first.set.union(&item.set);
                    if !item.nullable {
                        first.nullable = false;
                        break;
                    }
                }
                first
            }
            Expr::Choice { alternatives, .. } => {
                let mut first = First::default();
                for alternative in alternatives {
                    first.union(&self.expr(alternative));
                }
                first
            }
            Expr::Repetition { expr, min, .. } => {
                let mut first = self.expr(expr);
                first.nullable |= *min == 0;
                first
            }
            Expr::Optional(expr) => First {
                nullable: true,
                ..self.expr(expr)
            },
            Expr::Group(expr) => self.expr(expr),
            // `except` only removes matches
            Expr::Exclude { base, .. } => self.expr(base),
            Expr::AnchorStart | Expr::AnchorEnd => First {
                set: CharSet::empty(),
                nullable: true,
            },
        }
    }
}
