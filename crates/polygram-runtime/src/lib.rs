pub mod charset;
pub mod error;
pub mod parser;
pub mod trace;
pub mod value;
pub mod visitor;

use std::fmt::{Debug, Display};

use cranelift_entity::{entity_impl, packed_option::PackedOption, EntityRef, PrimaryMap};

pub use charset::{CharRange, CharSet};
pub use error::{Error, Expected, ParseError, RecursionError};
pub use parser::{ParseMode, Parsed};
pub use value::{SemanticValue, Tree};
pub use visitor::{Enter, Hooks, Match, Visitor};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(u32);
entity_impl!(RuleId, "rule");

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);
entity_impl!(NodeId, "node");

/// Byte range `start..end` of the input.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        Span { start, end }
    }
    pub fn at(pos: usize) -> Span {
        Span {
            start: pos,
            end: pos,
        }
    }
    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }
    #[track_caller]
    pub fn as_str(self, src: &str) -> &str {
        &src[self.start..self.end]
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct RuleFlags {
    /// The rule yields its matched text as a single value.
    pub token: bool,
    /// The rule yields no value.
    pub ignored: bool,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Repeat {
    pub body: NodeId,
    pub min: u32,
    pub max: Option<u32>,
    pub greedy: bool,
    /// Symbols that can begin an iteration, `None` when the body is nullable.
    pub first: Option<CharSet>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Node {
    Literal {
        text: Box<str>,
        case_sensitive: bool,
    },
    Set(CharSet),
    Call(RuleId),
    Sequence(Box<[NodeId]>),
    Choice {
        alternatives: Box<[NodeId]>,
        dispatch: Option<Dispatch>,
    },
    Repeat(Repeat),
    Exclude {
        base: NodeId,
        except: NodeId,
    },
    Start,
    End,
}

/// Lookup table from the next input symbol to the only alternative that can match it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Dispatch {
    table: Box<[(CharRange, u32)]>,
}

impl Dispatch {
    /// `firsts[i]` is the FIRST set of alternative `i`. Returns `None` if any two sets overlap.
    pub fn new(firsts: &[CharSet]) -> Option<Dispatch> {
        let mut table = Vec::new();
        for (index, set) in firsts.iter().enumerate() {
            let index = u32::try_from(index).ok()?;
            table.extend(set.ranges().iter().map(|&range| (range, index)));
        }
        table.sort_by_key(|(range, _)| range.start);

        for pair in table.windows(2) {
            if pair[0].0.end >= pair[1].0.start {
                return None;
            }
        }

        Some(Dispatch {
            table: table.into(),
        })
    }
    pub fn select(&self, c: char) -> Option<usize> {
        let index = self.table.partition_point(|(range, _)| range.end < c);
        match self.table.get(index) {
            Some(&(range, alternative)) if range.contains(c) => Some(alternative as usize),
            _ => None,
        }
    }
}

pub struct CompiledRule<V> {
    pub name: Box<str>,
    pub body: NodeId,
    pub flags: RuleFlags,
    pub hooks: Hooks<V>,
}

impl<V> Debug for CompiledRule<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRule")
            .field("name", &self.name)
            .field("body", &self.body)
            .field("flags", &self.flags)
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// A grammar bound to a visitor, ready for parsing.
///
/// Nothing inside is mutated after construction, a single runtime can serve any number of
/// concurrent [`Runtime::parse`] calls.
pub struct Runtime<V> {
    nodes: PrimaryMap<NodeId, Node>,
    rules: PrimaryMap<RuleId, CompiledRule<V>>,
    root: RuleId,
}

impl<V> Runtime<V> {
    pub fn root(&self) -> RuleId {
        self.root
    }
    pub fn rule(&self, rule: RuleId) -> &CompiledRule<V> {
        &self.rules[rule]
    }
    pub fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node]
    }
    pub fn find_rule(&self, name: &str) -> Option<RuleId> {
        self.rules
            .iter()
            .find(|(_, rule)| &*rule.name == name)
            .map(|(handle, _)| handle)
    }
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &CompiledRule<V>)> + '_ {
        self.rules.iter()
    }
}

impl<V> Debug for Runtime<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("root", &self.root)
            .field("rules", &self.rules)
            .field("nodes", &self.nodes)
            .finish()
    }
}

struct PendingRule<V> {
    name: Box<str>,
    flags: RuleFlags,
    hooks: Hooks<V>,
    body: PackedOption<NodeId>,
}

/// Incrementally assembles a [`Runtime`]. Rules are declared up front so that
/// [`Node::Call`] can refer to rules whose bodies are not built yet.
pub struct RuntimeBuilder<V> {
    nodes: PrimaryMap<NodeId, Node>,
    rules: Vec<PendingRule<V>>,
}

impl<V> Default for RuntimeBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RuntimeBuilder<V> {
    pub fn new() -> RuntimeBuilder<V> {
        RuntimeBuilder {
            nodes: PrimaryMap::new(),
            rules: Vec::new(),
        }
    }
    pub fn declare_rule(&mut self, name: &str, flags: RuleFlags, hooks: Hooks<V>) -> RuleId {
        let handle = RuleId::new(self.rules.len());
        self.rules.push(PendingRule {
            name: name.into(),
            flags,
            hooks,
            body: PackedOption::default(),
        });
        handle
    }
    pub fn push_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node)
    }
    pub fn define_rule(&mut self, rule: RuleId, body: NodeId) {
        self.rules[rule.index()].body = body.into();
    }
    pub fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node]
    }
    /// Panics if some declared rule was never defined.
    pub fn finish(self, root: RuleId) -> Runtime<V> {
        assert!(root.index() < self.rules.len(), "Root rule was not declared");

        let mut rules = PrimaryMap::with_capacity(self.rules.len());
        for pending in self.rules {
            let Some(body) = pending.body.expand() else {
                panic!("Rule `{}` was declared but never defined", pending.name);
            };
            rules.push(CompiledRule {
                name: pending.name,
                body,
                flags: pending.flags,
                hooks: pending.hooks,
            });
        }

        Runtime {
            nodes: self.nodes,
            rules,
            root,
        }
    }
}

#[test]
fn test_entity_display() {
    assert_eq!(RuleId::new(3).to_string(), "rule3");
    assert_eq!(format!("{:?}", NodeId::new(0)), "node0");
    assert_eq!(format!("{:?}", Some(RuleId::new(1))), "Some(rule1)");
}

#[test]
fn test_dispatch() {
    let firsts = [
        CharSet::range('a', 'f'),
        CharSet::from_chars(['x', '0']),
        CharSet::range('g', 'k'),
    ];
    let dispatch = Dispatch::new(&firsts).unwrap();
    assert_eq!(dispatch.select('a'), Some(0));
    assert_eq!(dispatch.select('f'), Some(0));
    assert_eq!(dispatch.select('0'), Some(1));
    assert_eq!(dispatch.select('x'), Some(1));
    assert_eq!(dispatch.select('h'), Some(2));
    assert_eq!(dispatch.select('z'), None);

    let overlapping = [CharSet::range('a', 'f'), CharSet::single('c')];
    assert!(Dispatch::new(&overlapping).is_none());
}

#[test]
fn test_runtime_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Runtime<Tree>>();
    assert_send_sync::<Runtime<()>>();
}
