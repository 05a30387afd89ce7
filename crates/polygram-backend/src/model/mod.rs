mod display;
mod expr;

use std::collections::{BTreeSet, HashMap};

use cranelift_entity::{entity_impl, PrimaryMap};
use serde::{Deserialize, Serialize};

pub use expr::{Expr, Literal, LiteralValue};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RuleHandle(u32);

entity_impl! { RuleHandle }

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct RuleAttributes {
    /// The rule's value is its matched text, failures inside it are reported as the rule.
    #[serde(default, skip_serializing_if = "is_false")]
    pub token: bool,
    /// The rule contributes no value.
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignored: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl RuleAttributes {
    pub fn is_empty(&self) -> bool {
        !self.token && !self.ignored
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub expr: Expr,
    #[serde(default, skip_serializing_if = "RuleAttributes::is_empty")]
    pub attributes: RuleAttributes,
}

impl Rule {
    pub fn new(name: impl Into<String>, expr: Expr) -> Rule {
        Rule {
            name: name.into(),
            expr,
            attributes: RuleAttributes::default(),
        }
    }
    pub fn token(mut self) -> Rule {
        self.attributes.token = true;
        self
    }
    pub fn ignored(mut self) -> Rule {
        self.attributes.ignored = true;
        self
    }
}

/// An ordered set of rules with a designated root.
///
/// Rule names are not required to be unique here, [`crate::validate`] reports duplicates and
/// lookups by name return the first definition.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(from = "GrammarDef", into = "GrammarDef")]
pub struct Grammar {
    root: String,
    rules: PrimaryMap<RuleHandle, Rule>,
    names: HashMap<String, RuleHandle>,
    externals: BTreeSet<String>,
}

impl Grammar {
    pub fn new(root: impl Into<String>) -> Grammar {
        Grammar {
            root: root.into(),
            rules: PrimaryMap::new(),
            names: HashMap::new(),
            externals: BTreeSet::new(),
        }
    }

    pub fn add_rule(&mut self, rule: Rule) -> RuleHandle {
        let name = rule.name.clone();
        let handle = self.rules.push(rule);
        self.names.entry(name).or_insert(handle);
        handle
    }
    pub fn define(&mut self, name: impl Into<String>, expr: Expr) -> RuleHandle {
        self.add_rule(Rule::new(name, expr))
    }
    pub fn with_rule(mut self, rule: Rule) -> Grammar {
        self.add_rule(rule);
        self
    }
    /// References to `name` are allowed to stay unresolved until the grammar is compiled.
    pub fn mark_external(&mut self, name: impl Into<String>) {
        self.externals.insert(name.into());
    }

    pub fn root(&self) -> &str {
        &self.root
    }
    pub fn set_root(&mut self, root: impl Into<String>) {
        self.root = root.into();
    }
    pub fn len(&self) -> usize {
        self.rules.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, handle: RuleHandle) -> &Rule {
        &self.rules[handle]
    }
    pub fn get_mut(&mut self, handle: RuleHandle) -> &mut Rule {
        &mut self.rules[handle]
    }
    pub fn find(&self, name: &str) -> Option<RuleHandle> {
        self.names.get(name).copied()
    }
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.find(name).map(|handle| &self.rules[handle])
    }
    pub fn iter(&self) -> impl Iterator<Item = (RuleHandle, &Rule)> + '_ {
        self.rules.iter()
    }
    pub fn rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values()
    }

    pub fn externals(&self) -> impl Iterator<Item = &str> + '_ {
        self.externals.iter().map(String::as_str)
    }
    pub fn is_external(&self, name: &str) -> bool {
        self.externals.contains(name)
    }

    /// Rebuilds the grammar from the rules for which `f` returns true. Handles are reassigned.
    pub fn retain(&mut self, mut f: impl FnMut(RuleHandle, &Rule) -> bool) {
        let rules = std::mem::take(&mut self.rules);
        self.names.clear();
        for (handle, rule) in rules.into_iter() {
            if f(handle, &rule) {
                self.add_rule(rule);
            }
        }
    }

    /// Rewrites every rule's expression, keeping names, order and attributes.
    pub fn map_exprs(&self, mut f: impl FnMut(&Rule) -> Expr) -> Grammar {
        let mut out = Grammar {
            root: self.root.clone(),
            rules: PrimaryMap::with_capacity(self.rules.len()),
            names: HashMap::with_capacity(self.names.len()),
            externals: self.externals.clone(),
        };
        for rule in self.rules.values() {
            out.add_rule(Rule {
                name: rule.name.clone(),
                expr: f(rule),
                attributes: rule.attributes,
            });
        }
        out
    }

    /// Imports the rules of `other` that are not defined here. External names that become
    /// defined are resolved, the remaining externals of `other` are carried over.
    pub fn merge(&mut self, other: &Grammar) {
        for rule in other.rules.values() {
            if self.find(&rule.name).is_none() {
                self.add_rule(rule.clone());
            }
        }
        for name in &other.externals {
            self.externals.insert(name.clone());
        }
        let names = &self.names;
        self.externals.retain(|name| !names.contains_key(name));
    }
}

#[derive(Serialize, Deserialize)]
struct GrammarDef {
    root: String,
    rules: Vec<Rule>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    externals: BTreeSet<String>,
}

impl From<GrammarDef> for Grammar {
    fn from(def: GrammarDef) -> Grammar {
        let mut grammar = Grammar::new(def.root);
        for rule in def.rules {
            grammar.add_rule(rule);
        }
        grammar.externals = def.externals;
        grammar
    }
}

impl From<Grammar> for GrammarDef {
    fn from(grammar: Grammar) -> GrammarDef {
        GrammarDef {
            root: grammar.root,
            rules: grammar.rules.into_iter().map(|(_, rule)| rule).collect(),
            externals: grammar.externals,
        }
    }
}
