use std::{collections::BTreeMap, fmt::Debug};

use crate::{value::Tree, Span};

/// A rule is about to be tried at `position`.
#[derive(Clone, Copy, Debug)]
pub struct Enter<'a> {
    pub rule: &'a str,
    pub position: usize,
    pub input: &'a str,
}

/// A rule matched `span` in the final parse.
#[derive(Clone, Copy, Debug)]
pub struct Match<'a> {
    pub rule: &'a str,
    pub span: Span,
    pub text: &'a str,
}

/// Returning `false` rejects the rule at this position.
pub type EnterHook = fn(&Enter<'_>) -> bool;
/// Replaces the rule's child values with a value built from the matched text.
pub type MatchHook<V> = fn(&Match<'_>) -> V;
/// Folds the rule's child values into one.
pub type ValueHook<V> = fn(&Match<'_>, Vec<V>) -> V;

pub struct Hooks<V> {
    pub on_enter: Option<EnterHook>,
    pub on_match: Option<MatchHook<V>>,
    pub on_value: Option<ValueHook<V>>,
}

impl<V> Hooks<V> {
    pub const fn none() -> Hooks<V> {
        Hooks {
            on_enter: None,
            on_match: None,
            on_value: None,
        }
    }
    pub fn is_empty(&self) -> bool {
        self.on_enter.is_none() && self.on_match.is_none() && self.on_value.is_none()
    }
}

impl<V> Clone for Hooks<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Hooks<V> {}

impl<V> Default for Hooks<V> {
    fn default() -> Self {
        Hooks::none()
    }
}

impl<V> Debug for Hooks<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("on_enter", &self.on_enter.is_some())
            .field("on_match", &self.on_match.is_some())
            .field("on_value", &self.on_value.is_some())
            .finish()
    }
}

/// Semantic actions keyed by rule name.
pub struct Visitor<V> {
    hooks: BTreeMap<String, Hooks<V>>,
}

impl<V> Default for Visitor<V> {
    fn default() -> Self {
        Visitor::new()
    }
}

impl<V> Clone for Visitor<V> {
    fn clone(&self) -> Self {
        Visitor {
            hooks: self.hooks.clone(),
        }
    }
}

impl<V> Debug for Visitor<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.hooks.iter()).finish()
    }
}

impl<V> Visitor<V> {
    pub fn new() -> Visitor<V> {
        Visitor {
            hooks: BTreeMap::new(),
        }
    }
    fn entry(&mut self, rule: &str) -> &mut Hooks<V> {
        self.hooks.entry(rule.to_owned()).or_default()
    }
    pub fn on_enter(mut self, rule: &str, hook: EnterHook) -> Self {
        self.entry(rule).on_enter = Some(hook);
        self
    }
    pub fn on_match(mut self, rule: &str, hook: MatchHook<V>) -> Self {
        self.entry(rule).on_match = Some(hook);
        self
    }
    pub fn on_value(mut self, rule: &str, hook: ValueHook<V>) -> Self {
        self.entry(rule).on_value = Some(hook);
        self
    }
    pub fn set(&mut self, rule: &str, hooks: Hooks<V>) {
        self.hooks.insert(rule.to_owned(), hooks);
    }
    pub fn get(&self, rule: &str) -> Hooks<V> {
        self.hooks.get(rule).copied().unwrap_or_default()
    }
    pub fn rule_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.hooks.keys().map(String::as_str)
    }
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl Visitor<Tree> {
    /// Builds a [`Tree::Node`] for each of the named rules, everything else is spliced.
    pub fn tree<'a>(rules: impl IntoIterator<Item = &'a str>) -> Visitor<Tree> {
        let mut visitor = Visitor::new();
        for rule in rules {
            visitor.entry(rule).on_value = Some(Tree::node);
        }
        visitor
    }
}

#[test]
fn test_visitor_builder() {
    fn reject(_: &Enter<'_>) -> bool {
        false
    }
    let visitor = Visitor::<Tree>::tree(["a", "b"])
        .on_enter("c", reject)
        .on_match("a", Tree::text);

    assert_eq!(visitor.rule_names().collect::<Vec<_>>(), ["a", "b", "c"]);
    let a = visitor.get("a");
    assert!(a.on_match.is_some() && a.on_value.is_some() && a.on_enter.is_none());
    assert!(visitor.get("missing").is_empty());
}
