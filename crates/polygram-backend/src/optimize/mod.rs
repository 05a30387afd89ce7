mod dead;
mod factor;
pub mod first;
mod inline;
mod sets;

use std::collections::BTreeSet;

use crate::{model::Grammar, normalize::normalize};

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct OptimizerOptions {
    pub inline: bool,
    pub eliminate_dead: bool,
    pub left_factor: bool,
    pub coalesce_sets: bool,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        OptimizerOptions {
            inline: true,
            eliminate_dead: true,
            left_factor: true,
            coalesce_sets: true,
        }
    }
}

impl OptimizerOptions {
    pub fn none() -> OptimizerOptions {
        OptimizerOptions {
            inline: false,
            eliminate_dead: false,
            left_factor: false,
            coalesce_sets: false,
        }
    }
}

/// Rewrites a grammar into an equivalent one that is cheaper to interpret.
///
/// Every pass keeps the matched language, the semantic values and the order of choice
/// alternatives. Passes are repeated until nothing changes, so running the optimizer on its
/// own output returns it unchanged.
#[derive(Clone, Debug, Default)]
pub struct Optimizer {
    options: OptimizerOptions,
    preserve: BTreeSet<String>,
}

impl Optimizer {
    pub fn new() -> Optimizer {
        Optimizer::default()
    }
    pub fn with_options(options: OptimizerOptions) -> Optimizer {
        Optimizer {
            options,
            preserve: BTreeSet::new(),
        }
    }
    /// Rules which are observed from the outside (for example hooked by a visitor) and must
    /// neither be inlined nor removed.
    pub fn preserve<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Optimizer {
        self.preserve.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn run(&self, grammar: &Grammar) -> Grammar {
        let mut current = normalize(grammar);
        let mut round = 0;
        loop {
            round += 1;
            let next = self.round(&current);
            if next == current {
                log::debug!(
                    "Optimizer reached a fixed point after {round} rounds, {} -> {} rules",
                    grammar.len(),
                    next.len()
                );
                return next;
            }
            current = next;
        }
    }

    fn round(&self, grammar: &Grammar) -> Grammar {
        let mut grammar = grammar.clone();
        if self.options.inline {
            grammar = normalize(&inline::inline_rules(&grammar, &self.preserve));
        }
        if self.options.eliminate_dead {
            dead::eliminate_dead_rules(&mut grammar, &self.preserve);
        }
        if self.options.left_factor {
            grammar = normalize(&factor::left_factor(&grammar));
        }
        if self.options.coalesce_sets {
            grammar = normalize(&sets::coalesce_sets(&grammar));
        }
        grammar
    }
}

pub fn optimize(grammar: &Grammar) -> Grammar {
    Optimizer::new().run(grammar)
}
