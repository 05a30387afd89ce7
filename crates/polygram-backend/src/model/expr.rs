use polygram_runtime::{CharRange, CharSet};
use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralValue {
    Text(String),
    Set(CharSet),
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Literal {
    pub value: LiteralValue,
    /// When false, ASCII letters match either case.
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
}

fn default_true() -> bool {
    true
}

impl Literal {
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            LiteralValue::Text(text) => Some(text),
            LiteralValue::Set(_) => None,
        }
    }
    /// The set of symbols this literal accepts, with case folding applied.
    pub fn as_set(&self) -> Option<CharSet> {
        match &self.value {
            LiteralValue::Text(_) => None,
            LiteralValue::Set(set) if self.case_sensitive => Some(set.clone()),
            LiteralValue::Set(set) => Some(set.ascii_case_folded()),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Literal(Literal),
    Reference(String),
    Sequence(Vec<Expr>),
    Choice {
        alternatives: Vec<Expr>,
        #[serde(default = "default_true")]
        ordered: bool,
    },
    Repetition {
        expr: Box<Expr>,
        min: u32,
        #[serde(default)]
        max: Option<u32>,
        #[serde(default = "default_true")]
        greedy: bool,
    },
    Optional(Box<Expr>),
    Group(Box<Expr>),
    /// Matches `base` unless `except` matches at the same position.
    Exclude {
        base: Box<Expr>,
        except: Box<Expr>,
    },
    AnchorStart,
    AnchorEnd,
}

impl Expr {
    pub fn text(text: impl Into<String>) -> Expr {
        Expr::Literal(Literal {
            value: LiteralValue::Text(text.into()),
            case_sensitive: true,
        })
    }
    pub fn text_nocase(text: impl Into<String>) -> Expr {
        Expr::Literal(Literal {
            value: LiteralValue::Text(text.into()),
            case_sensitive: false,
        })
    }
    pub fn set(set: CharSet) -> Expr {
        Expr::Literal(Literal {
            value: LiteralValue::Set(set),
            case_sensitive: true,
        })
    }
    pub fn range(start: char, end: char) -> Expr {
        Expr::set(CharSet::from_ranges([CharRange::new(start, end)]))
    }
    pub fn reference(name: impl Into<String>) -> Expr {
        Expr::Reference(name.into())
    }
    pub fn seq(items: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Sequence(items.into_iter().collect())
    }
    pub fn choice(alternatives: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Choice {
            alternatives: alternatives.into_iter().collect(),
            ordered: true,
        }
    }
    pub fn unordered(alternatives: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Choice {
            alternatives: alternatives.into_iter().collect(),
            ordered: false,
        }
    }
    pub fn repeat(expr: Expr, min: u32, max: Option<u32>) -> Expr {
        Expr::Repetition {
            expr: Box::new(expr),
            min,
            max,
            greedy: true,
        }
    }
    pub fn lazy(expr: Expr, min: u32, max: Option<u32>) -> Expr {
        Expr::Repetition {
            expr: Box::new(expr),
            min,
            max,
            greedy: false,
        }
    }
    pub fn star(expr: Expr) -> Expr {
        Expr::repeat(expr, 0, None)
    }
    pub fn plus(expr: Expr) -> Expr {
        Expr::repeat(expr, 1, None)
    }
    pub fn optional(expr: Expr) -> Expr {
        Expr::Optional(Box::new(expr))
    }
    pub fn group(expr: Expr) -> Expr {
        Expr::Group(Box::new(expr))
    }
    pub fn exclude(base: Expr, except: Expr) -> Expr {
        Expr::Exclude {
            base: Box::new(base),
            except: Box::new(except),
        }
    }
    pub fn empty() -> Expr {
        Expr::Sequence(Vec::new())
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expr::Literal(literal) => Some(literal),
            _ => None,
        }
    }
    pub fn is_ordered_choice(&self) -> bool {
        matches!(self, Expr::Choice { ordered: true, .. })
    }

    pub fn for_each_child<'a>(&'a self, mut f: impl FnMut(&'a Expr)) {
        match self {
            Expr::Sequence(items)
            | Expr::Choice {
                alternatives: items,
                ..
            } => items.iter().for_each(f),
            Expr::Repetition { expr, .. } | Expr::Optional(expr) | Expr::Group(expr) => f(expr),
            Expr::Exclude { base, except } => {
                f(base);
                f(except);
            }
            Expr::Literal(_) | Expr::Reference(_) | Expr::AnchorStart | Expr::AnchorEnd => {}
        }
    }
    pub fn for_each_child_mut(&mut self, mut f: impl FnMut(&mut Expr)) {
        match self {
            Expr::Sequence(items)
            | Expr::Choice {
                alternatives: items,
                ..
            } => items.iter_mut().for_each(f),
            Expr::Repetition { expr, .. } | Expr::Optional(expr) | Expr::Group(expr) => f(expr),
            Expr::Exclude { base, except } => {
                f(base);
                f(except);
            }
            Expr::Literal(_) | Expr::Reference(_) | Expr::AnchorStart | Expr::AnchorEnd => {}
        }
    }

    /// Rewrites the immediate children, the variant itself stays the same.
    pub fn map_children(self, mut f: impl FnMut(Expr) -> Expr) -> Expr {
        match self {
            Expr::Sequence(items) => Expr::Sequence(items.into_iter().map(f).collect()),
            Expr::Choice {
                alternatives,
                ordered,
            } => Expr::Choice {
                alternatives: alternatives.into_iter().map(f).collect(),
                ordered,
            },
            Expr::Repetition {
                expr,
                min,
                max,
                greedy,
            } => Expr::Repetition {
                expr: Box::new(f(*expr)),
                min,
                max,
                greedy,
            },
            Expr::Optional(expr) => Expr::Optional(Box::new(f(*expr))),
            Expr::Group(expr) => Expr::Group(Box::new(f(*expr))),
            Expr::Exclude { base, except } => {
                let base = Box::new(f(*base));
                let except = Box::new(f(*except));
                Expr::Exclude { base, except }
            }
            leaf @ (Expr::Literal(_) | Expr::Reference(_) | Expr::AnchorStart | Expr::AnchorEnd) => {
                leaf
            }
        }
    }

    fn transform_impl(self, f: &mut dyn FnMut(Expr) -> Expr) -> Expr {
        let expr = self.map_children(|child| child.transform_impl(f));
        f(expr)
    }
    /// Bottom-up rewrite, `f` sees every node after its children were rewritten.
    pub fn transform(self, mut f: impl FnMut(Expr) -> Expr) -> Expr {
        self.transform_impl(&mut f)
    }

    fn visit_impl(&self, f: &mut dyn FnMut(&Expr)) {
        self.for_each_child(|child| child.visit_impl(f));
        f(self)
    }
    /// Post-order traversal.
    pub fn visit(&self, mut f: impl FnMut(&Expr)) {
        self.visit_impl(&mut f)
    }
    fn visit_mut_impl(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        self.for_each_child_mut(|child| child.visit_mut_impl(f));
        f(self)
    }
    pub fn visit_mut(&mut self, mut f: impl FnMut(&mut Expr)) {
        self.visit_mut_impl(&mut f)
    }

    /// Names of referenced rules in order of appearance, repeated references included.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }
    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Reference(name) => out.push(name),
            _ => self.for_each_child(|child| child.collect_references(out)),
        }
    }

    pub fn size(&self) -> usize {
        let mut size = 0;
        self.visit(|_| size += 1);
        size
    }
}

#[test]
fn test_transform_is_bottom_up() {
    let expr = Expr::seq([
        Expr::text("a"),
        Expr::group(Expr::reference("b")),
        Expr::optional(Expr::text("c")),
    ]);

    let mut order = Vec::new();
    expr.visit(|e| {
        if let Some(text) = e.as_literal().and_then(Literal::as_text) {
            order.push(text.to_owned());
        }
    });
    assert_eq!(order, ["a", "c"]);

    let upper = expr.transform(|e| match e {
        Expr::Literal(Literal {
            value: LiteralValue::Text(text),
            case_sensitive,
        }) => Expr::Literal(Literal {
            value: LiteralValue::Text(text.to_uppercase()),
            case_sensitive,
        }),
        Expr::Group(inner) => *inner,
        other => other,
    });
    assert_eq!(
        upper,
        Expr::seq([
            Expr::text("A"),
            Expr::reference("b"),
            Expr::optional(Expr::text("C")),
        ])
    );
    assert_eq!(upper.references(), ["b"]);
    assert_eq!(upper.size(), 5);
}

#[test]
fn test_map_children_keeps_variant() {
    let expr = Expr::exclude(Expr::range('a', 'z'), Expr::text("x"));
    let mapped = expr.map_children(|_| Expr::AnchorEnd);
    assert_eq!(mapped, Expr::exclude(Expr::AnchorEnd, Expr::AnchorEnd));
}
