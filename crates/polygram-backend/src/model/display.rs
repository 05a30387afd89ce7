use std::fmt::Display;

use super::{Expr, Grammar, Literal, LiteralValue, Rule};

impl Literal {
    pub fn display_into(&self, buf: &mut dyn std::fmt::Write) -> std::fmt::Result {
        match &self.value {
            LiteralValue::Text(text) => write!(buf, "{text:?}")?,
            LiteralValue::Set(set) => write!(buf, "{set}")?,
        }
        if !self.case_sensitive {
            write!(buf, "i")?;
        }
        Ok(())
    }
}

impl Expr {
    fn display_head(&self, buf: &mut dyn std::fmt::Write) -> std::fmt::Result {
        match self {
            Expr::Literal(literal) => literal.display_into(buf),
            Expr::Reference(name) => write!(buf, "{name}"),
            Expr::Sequence(_) => write!(buf, "Sequence"),
            Expr::Choice { ordered: true, .. } => write!(buf, "Choice"),
            Expr::Choice { ordered: false, .. } => write!(buf, "Choice (unordered)"),
            Expr::Repetition {
                min, max, greedy, ..
            } => {
                write!(buf, "Repeat {{{min},")?;
                if let Some(max) = max {
                    write!(buf, "{max}")?;
                }
                write!(buf, "}}")?;
                if !greedy {
                    write!(buf, " lazy")?;
                }
                Ok(())
            }
            Expr::Optional(_) => write!(buf, "Optional"),
            Expr::Group(_) => write!(buf, "Group"),
            Expr::Exclude { .. } => write!(buf, "Exclude"),
            Expr::AnchorStart => write!(buf, "Start"),
            Expr::AnchorEnd => write!(buf, "End"),
        }
    }

    pub fn display_into_indent(&self, buf: &mut dyn std::fmt::Write, indent: u32) -> std::fmt::Result {
        for _ in 0..indent {
            write!(buf, "  ")?;
        }
        self.display_head(buf)?;
        writeln!(buf)?;

        let mut result = Ok(());
        self.for_each_child(|child| {
            if result.is_ok() {
                result = child.display_into_indent(buf, indent + 1);
            }
        });
        result
    }

    pub fn display_into(&self, buf: &mut dyn std::fmt::Write) -> std::fmt::Result {
        self.display_into_indent(buf, 0)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.display_into(f)
    }
}

impl Rule {
    pub fn display_into(&self, buf: &mut dyn std::fmt::Write) -> std::fmt::Result {
        write!(buf, "{}", self.name)?;
        if self.attributes.token {
            write!(buf, " (token)")?;
        }
        if self.attributes.ignored {
            write!(buf, " (ignored)")?;
        }
        writeln!(buf, " =")?;
        self.expr.display_into_indent(buf, 1)
    }
}

impl Grammar {
    pub fn display_into(&self, buf: &mut dyn std::fmt::Write) -> std::fmt::Result {
        writeln!(buf, "root {}", self.root())?;
        for name in self.externals() {
            writeln!(buf, "external {name}")?;
        }
        for rule in self.rules() {
            writeln!(buf)?;
            rule.display_into(buf)?;
        }
        Ok(())
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.display_into(f)
    }
}

#[test]
fn test_display() {
    use polygram_runtime::CharSet;

    let grammar = Grammar::new("list")
        .with_rule(Rule::new(
            "list",
            Expr::seq([
                Expr::text("["),
                Expr::star(Expr::reference("item")),
                Expr::lazy(Expr::text_nocase("x"), 1, Some(2)),
                Expr::text("]"),
            ]),
        ))
        .with_rule(Rule::new("item", Expr::set(CharSet::from_chars(['a', 'b', 'c']))).token());

    let expected = r#"root list

list =
  Sequence
    "["
    Repeat {0,}
      item
    Repeat {1,2} lazy
      "x"i
    "]"

item (token) =
  [a-c]
"#;
    assert_eq!(grammar.to_string(), expected);
}
