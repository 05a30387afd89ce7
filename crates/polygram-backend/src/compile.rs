use std::collections::HashMap;

use polygram_runtime::{
    Dispatch, Node, NodeId, Repeat, RuleFlags, RuleId, Runtime, RuntimeBuilder, Visitor,
};

use crate::{
    check::{find_left_recursion, find_unordered_choice, validate},
    error::ConfigError,
    model::{Expr, Grammar, LiteralValue},
    optimize::{first::FirstSets, Optimizer, OptimizerOptions},
};

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CompileOptions {
    /// Run the optimizer before lowering.
    pub optimize: bool,
    pub optimizer: OptimizerOptions,
    /// Attach predictive dispatch tables to choices whose alternatives start with disjoint symbols.
    pub predictive: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            optimize: true,
            optimizer: OptimizerOptions::default(),
            predictive: true,
        }
    }
}

pub fn compile<V>(grammar: &Grammar, visitor: &Visitor<V>) -> Result<Runtime<V>, ConfigError> {
    compile_with(grammar, visitor, &CompileOptions::default())
}

pub fn compile_with<V>(
    grammar: &Grammar,
    visitor: &Visitor<V>,
    options: &CompileOptions,
) -> Result<Runtime<V>, ConfigError> {
    validate(grammar)?;
    check_bindings(grammar, visitor)?;

    let optimized;
    let grammar = match options.optimize {
        true => {
            optimized = Optimizer::with_options(options.optimizer.clone())
                .preserve(visitor.rule_names())
                .run(grammar);
            &optimized
        }
        false => grammar,
    };

    let first = FirstSets::compute(grammar);
    for name in find_left_recursion(grammar, &first) {
        log::warn!("Rule `{name}` is left recursive, parsing through it will fail");
    }

    let mut cx = LowerCx {
        builder: RuntimeBuilder::new(),
        handles: HashMap::new(),
        first: &first,
        predictive: options.predictive,
        dispatched: 0,
    };

    for rule in grammar.rules() {
        let flags = RuleFlags {
            token: rule.attributes.token,
            ignored: rule.attributes.ignored,
        };
        let handle = cx.builder.declare_rule(&rule.name, flags, visitor.get(&rule.name));
        cx.handles.insert(&rule.name, handle);
    }
    for rule in grammar.rules() {
        let body = cx.lower(&rule.expr);
        let handle = cx.handles[rule.name.as_str()];
        cx.builder.define_rule(handle, body);
    }

    let root = cx.handles[grammar.root()];
    let dispatched = cx.dispatched;
    let runtime = cx.builder.finish(root);
    log::debug!(
        "Compiled {} rules into {} nodes, {dispatched} choices use predictive dispatch",
        runtime.rule_count(),
        runtime.node_count()
    );

    Ok(runtime)
}

/// Everything that makes a well-formed grammar impossible to execute with this visitor.
fn check_bindings<V>(grammar: &Grammar, visitor: &Visitor<V>) -> Result<(), ConfigError> {
    if let Some(name) = visitor.rule_names().find(|name| grammar.find(name).is_none()) {
        return Err(ConfigError::UnknownRule(name.to_owned()));
    }
    for rule in grammar.rules() {
        if let Some(name) = rule.expr.references().into_iter().find(|name| grammar.find(name).is_none()) {
            return Err(ConfigError::UnresolvedExternal {
                rule: rule.name.clone(),
                name: name.to_owned(),
            });
        }
    }
    if let Some(rule) = find_unordered_choice(grammar) {
        return Err(ConfigError::UnorderedChoice(rule.to_owned()));
    }
    Ok(())
}

struct LowerCx<'a, V> {
    builder: RuntimeBuilder<V>,
    handles: HashMap<&'a str, RuleId>,
    first: &'a FirstSets,
    predictive: bool,
    dispatched: usize,
}

impl<V> LowerCx<'_, V> {
    fn lower(&mut self, expr: &Expr) -> NodeId {
        let node = match expr {
            Expr::Literal(literal) => match &literal.value {
                LiteralValue::Text(text) => Node::Literal {
                    text: text.as_str().into(),
                    case_sensitive: literal.case_sensitive,
                },
                LiteralValue::Set(_) => Node::Set(literal.as_set().unwrap_or_default()),
            },
            Expr::Reference(name) => Node::Call(self.handles[name.as_str()]),
            Expr::Sequence(items) => {
                let items = items.iter().map(|item| self.lower(item)).collect();
                Node::Sequence(items)
            }
            Expr::Choice { alternatives, .. } => {
                let dispatch = self.dispatch(alternatives);
                let alternatives = alternatives.iter().map(|item| self.lower(item)).collect();
                Node::Choice {
                    alternatives,
                    dispatch,
                }
            }
            Expr::Repetition {
                expr,
                min,
                max,
                greedy,
            } => self.repeat(expr, *min, *max, *greedy),
            Expr::Optional(expr) => self.repeat(expr, 0, Some(1), true),
            Expr::Group(expr) => return self.lower(expr),
            Expr::Exclude { base, except } => {
                let base = self.lower(base);
                let except = self.lower(except);
                Node::Exclude { base, except }
            }
            Expr::AnchorStart => Node::Start,
            Expr::AnchorEnd => Node::End,
        };
        self.builder.push_node(node)
    }

    fn repeat(&mut self, body: &Expr, min: u32, max: Option<u32>, greedy: bool) -> Node {
        let first = self.first.expr(body);
        let body = self.lower(body);
        Node::Repeat(Repeat {
            body,
            min,
            max,
            greedy,
            first: (!first.nullable).then_some(first.set),
        })
    }

    fn dispatch(&mut self, alternatives: &[Expr]) -> Option<Dispatch> {
        if !self.predictive || alternatives.len() < 2 {
            return None;
        }
        let mut firsts = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            let first = self.first.expr(alternative);
            if first.nullable {
                return None;
            }
            firsts.push(first.set);
        }
        let dispatch = Dispatch::new(&firsts)?;
        log::trace!("Choice of {} alternatives uses predictive dispatch", alternatives.len());
        self.dispatched += 1;
        Some(dispatch)
    }
}
