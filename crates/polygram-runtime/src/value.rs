use std::fmt::Display;

use crate::{visitor::Match, Span};

/// Values produced while replaying a successful parse.
pub trait SemanticValue: Sized {
    /// Value of a matched literal, or of a whole token rule.
    fn from_text(text: &str, span: Span) -> Self;
    /// Combines the top-level values when the root did not produce exactly one.
    fn from_sequence(values: Vec<Self>) -> Self;
}

impl SemanticValue for () {
    fn from_text(_: &str, _: Span) -> Self {}
    fn from_sequence(_: Vec<Self>) -> Self {}
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Tree {
    Text(String),
    Node { rule: String, children: Vec<Tree> },
    Sequence(Vec<Tree>),
}

impl Tree {
    pub fn leaf(text: impl Into<String>) -> Tree {
        Tree::Text(text.into())
    }
    pub fn branch(rule: impl Into<String>, children: Vec<Tree>) -> Tree {
        Tree::Node {
            rule: rule.into(),
            children,
        }
    }
    /// An `on_value` hook that wraps the children in a node named after the rule.
    pub fn node(m: &Match<'_>, children: Vec<Tree>) -> Tree {
        Tree::branch(m.rule, children)
    }
    /// An `on_match` hook that keeps only the matched text.
    pub fn text(m: &Match<'_>) -> Tree {
        Tree::leaf(m.text)
    }
    pub fn children(&self) -> &[Tree] {
        match self {
            Tree::Text(_) => &[],
            Tree::Node { children, .. } | Tree::Sequence(children) => children,
        }
    }

    pub fn display_into(&self, buf: &mut dyn std::fmt::Write, indent: usize) -> std::fmt::Result {
        for _ in 0..indent {
            write!(buf, "  ")?;
        }
        match self {
            Tree::Text(text) => writeln!(buf, "{text:?}"),
            Tree::Node { rule, children } => {
                writeln!(buf, "{rule}")?;
                for child in children {
                    child.display_into(buf, indent + 1)?;
                }
                Ok(())
            }
            Tree::Sequence(children) => {
                writeln!(buf, "*")?;
                for child in children {
                    child.display_into(buf, indent + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl SemanticValue for Tree {
    fn from_text(text: &str, _: Span) -> Self {
        Tree::Text(text.to_owned())
    }
    fn from_sequence(values: Vec<Self>) -> Self {
        Tree::Sequence(values)
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.display_into(f, 0)
    }
}

#[test]
fn test_tree_display() {
    let tree = Tree::branch(
        "pair",
        vec![
            Tree::leaf("a"),
            Tree::branch("value", vec![Tree::leaf("1")]),
        ],
    );
    let expected = "\
pair
  \"a\"
  value
    \"1\"
";
    assert_eq!(tree.to_string(), expected);
    assert_eq!(tree.children().len(), 2);
}
