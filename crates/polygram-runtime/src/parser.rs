use crate::{
    error::{Error, Expected, ParseError, RecursionError},
    trace::{Event, PostorderTrace},
    value::SemanticValue,
    visitor::Enter,
    Node, NodeId, Repeat, RuleId, Runtime,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum ParseMode {
    /// The root rule must consume the whole input.
    #[default]
    Full,
    /// The root rule may stop early, the longest match is taken.
    ///
    /// Unless a match reaches the end of the input, every derivation of the root rule is
    /// explored to find the longest one. With nested ambiguous repetitions such as
    /// `([a-z]+)*` that is exponential in the length of the input.
    Prefix,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Parsed<V> {
    pub value: V,
    /// Bytes of input consumed by the root rule.
    pub consumed: usize,
}

/// Compact form of [`Expected`], resolved against the runtime only once the parse has failed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Expect {
    /// The unmatched remainder of a literal node.
    Literal { node: NodeId, matched: usize },
    Set(NodeId),
    /// The FIRST set of a repetition node.
    First(NodeId),
    Rule(RuleId),
    Start,
    End,
}

/// What happens once the current node has matched. Frames link to the frame that follows
/// them, so a frame index stands for the whole rest of the parse.
#[derive(Clone, Copy, Debug)]
enum Frame<'r> {
    /// The start rule matched.
    Done,
    /// The remaining items of a sequence.
    Sequence { rest: &'r [NodeId], next: usize },
    /// Iteration `count` of a repetition, started at `start`, matched.
    Repeat {
        node: NodeId,
        repeat: &'r Repeat,
        count: u32,
        start: usize,
        next: usize,
    },
    /// The body of a rule matched, its events begin at trace index `first`.
    Close {
        rule: RuleId,
        start: usize,
        first: usize,
        outer: Option<(RuleId, usize)>,
        next: usize,
    },
    /// The excluded part of an exclusion matched, the exclusion fails.
    Excluded { barrier: usize, next: usize },
}

/// Alternative continuation of a choice point.
#[derive(Clone, Copy, Debug)]
enum Resume<'r> {
    /// The untried alternatives of a choice.
    Alternatives(&'r [NodeId]),
    /// End a greedy repetition here.
    Stop,
    /// Attempt another iteration of a lazy repetition.
    Iterate {
        node: NodeId,
        repeat: &'r Repeat,
        count: u32,
    },
    /// The excluded part of an exclusion did not match, try its base.
    Base(NodeId),
}

/// A saved point to backtrack to.
#[derive(Clone, Copy, Debug)]
struct ChoicePoint<'r> {
    resume: Resume<'r>,
    pos: usize,
    cont: usize,
    trace: usize,
    frames: usize,
    silent: u32,
    atomic: Option<(RuleId, usize)>,
}

/// Next step of the engine.
enum Task {
    Match { node: NodeId, pos: usize, cont: usize },
    /// The current node matched up to `pos`, run frame `cont`.
    Return { pos: usize, cont: usize },
    Backtrack,
    /// The whole input was matched.
    Finish,
}

/// Mutable state of a single [`Runtime::parse`] call.
///
/// All pending work lives on the heap, nested rules and long repetitions do not grow the
/// native stack.
struct ParseState<'r> {
    frames: Vec<Frame<'r>>,
    choices: Vec<ChoicePoint<'r>>,
    trace: Vec<Event>,

    furthest: usize,
    expected: Vec<Expect>,
    /// Failures are not recorded while inside a lookahead.
    silent: u32,
    /// Failures inside a token rule are reported as the rule itself.
    atomic: Option<(RuleId, usize)>,

    /// End and trace of the longest match so far.
    best: Option<(usize, Vec<Event>)>,
}

impl<'r> ParseState<'r> {
    fn new() -> ParseState<'r> {
        ParseState {
            frames: Vec::new(),
            choices: Vec::new(),
            trace: Vec::new(),
            furthest: 0,
            expected: Vec::new(),
            silent: 0,
            atomic: None,
            best: None,
        }
    }

    fn push_frame(&mut self, frame: Frame<'r>) -> usize {
        self.frames.push(frame);
        self.frames.len() - 1
    }

    /// Returns the index of the new choice point.
    fn push_choice(&mut self, resume: Resume<'r>, pos: usize, cont: usize) -> usize {
        self.choices.push(ChoicePoint {
            resume,
            pos,
            cont,
            trace: self.trace.len(),
            frames: self.frames.len(),
            silent: self.silent,
            atomic: self.atomic,
        });
        self.choices.len() - 1
    }

    /// Pops the latest choice point and restores the state saved in it.
    fn backtrack(&mut self) -> Option<ChoicePoint<'r>> {
        let point = self.choices.pop()?;
        debug_assert!(
            point.trace <= self.trace.len() && point.frames <= self.frames.len(),
            "Choice point saved more state than is present"
        );
        self.trace.truncate(point.trace);
        self.frames.truncate(point.frames);
        self.silent = point.silent;
        self.atomic = point.atomic;
        Some(point)
    }

    /// Whether `rule` started at `position` is still being matched by the frames from `cont` on.
    fn is_active(&self, rule: RuleId, position: usize, mut cont: usize) -> bool {
        loop {
            match self.frames[cont] {
                Frame::Done => return false,
                Frame::Close {
                    rule: active,
                    start,
                    next,
                    ..
                } => {
                    // rules further out started earlier
                    if start != position {
                        return false;
                    }
                    if active == rule {
                        return true;
                    }
                    cont = next;
                }
                Frame::Sequence { next, .. }
                | Frame::Repeat { next, .. }
                | Frame::Excluded { next, .. } => cont = next,
            }
        }
    }

    fn text(&mut self, start: usize, end: usize, cont: usize) -> Task {
        self.trace.push(Event::Text { start, end });
        Task::Return { pos: end, cont }
    }

    fn sequence(&mut self, items: &'r [NodeId], pos: usize, cont: usize) -> Task {
        match items {
            [] => Task::Return { pos, cont },
            [last] => Task::Match {
                node: *last,
                pos,
                cont,
            },
            [first, rest @ ..] => {
                let next = self.push_frame(Frame::Sequence { rest, next: cont });
                Task::Match {
                    node: *first,
                    pos,
                    cont: next,
                }
            }
        }
    }

    fn alternatives(&mut self, alternatives: &'r [NodeId], pos: usize, cont: usize) -> Task {
        match alternatives {
            [] => Task::Backtrack,
            [first, rest @ ..] => {
                if !rest.is_empty() {
                    self.push_choice(Resume::Alternatives(rest), pos, cont);
                }
                Task::Match {
                    node: *first,
                    pos,
                    cont,
                }
            }
        }
    }

    fn fail(&mut self, position: usize, expect: Expect) {
        if self.silent > 0 {
            return;
        }
        let (position, expect) = match self.atomic {
            Some((rule, start)) => (start, Expect::Rule(rule)),
            None => (position, expect),
        };
        if position > self.furthest {
            self.furthest = position;
            self.expected.clear();
        }
        if position == self.furthest && !self.expected.contains(&expect) {
            self.expected.push(expect);
        }
    }

    fn into_error<V>(self, runtime: &Runtime<V>) -> ParseError {
        let expected = self
            .expected
            .iter()
            .map(|expect| match *expect {
                Expect::Literal { node, matched } => match runtime.node(node) {
                    Node::Literal { text, .. } => Expected::Literal(text[matched..].to_owned()),
                    other => unreachable!("Literal expectation on {other:?}"),
                },
                Expect::Set(node) => match runtime.node(node) {
                    Node::Set(set) => Expected::Set(set.clone()),
                    other => unreachable!("Set expectation on {other:?}"),
                },
                Expect::First(node) => match runtime.node(node) {
                    Node::Repeat(Repeat {
                        first: Some(first), ..
                    }) => Expected::Set(first.clone()),
                    other => unreachable!("First expectation on {other:?}"),
                },
                Expect::Rule(rule) => Expected::Rule(runtime.rule(rule).name.to_string()),
                Expect::Start => Expected::StartOfInput,
                Expect::End => Expected::EndOfInput,
            })
            .collect();

        ParseError::new(self.furthest, expected)
    }
}

/// Matches `text` at the start of `rest`, returning its byte length or the length of the matching prefix.
fn match_literal(text: &str, rest: &str, case_sensitive: bool) -> Result<usize, usize> {
    let mut offset = 0;
    let mut input = rest.chars();
    for expected in text.chars() {
        match input.next() {
            Some(c) if c == expected || (!case_sensitive && c.eq_ignore_ascii_case(&expected)) => {
                offset += c.len_utf8();
            }
            _ => return Err(offset),
        }
    }
    Ok(offset)
}

struct Engine<'r, 'i, V> {
    runtime: &'r Runtime<V>,
    input: &'i str,
    mode: ParseMode,
}

impl<'r, V> Engine<'r, '_, V> {
    fn peek(&self, position: usize) -> Option<char> {
        self.input[position..].chars().next()
    }

    /// Runs the start rule to completion, returning the end and trace of the chosen match.
    fn run(
        &self,
        start: RuleId,
        st: &mut ParseState<'r>,
    ) -> Result<Option<(usize, Vec<Event>)>, RecursionError> {
        let done = st.push_frame(Frame::Done);
        let mut task = self.call(start, 0, done, st)?;
        loop {
            task = match task {
                Task::Match { node, pos, cont } => self.node(node, pos, cont, st)?,
                Task::Return { pos, cont } => self.resume(st.frames[cont], pos, st),
                Task::Backtrack => match st.backtrack() {
                    Some(point) => self.retry(point, st),
                    None => break,
                },
                Task::Finish => break,
            };
        }
        Ok(st.best.take())
    }

    /// The start rule matched up to `pos`.
    fn accept(&self, pos: usize, st: &mut ParseState<'r>) -> Task {
        if pos == self.input.len() {
            st.best = Some((pos, std::mem::take(&mut st.trace)));
            return Task::Finish;
        }
        match self.mode {
            ParseMode::Full => st.fail(pos, Expect::End),
            // a prefix parse keeps looking for a longer match
            ParseMode::Prefix => {
                if st.best.as_ref().map_or(true, |&(longest, _)| pos > longest) {
                    st.best = Some((pos, st.trace.clone()));
                }
            }
        }
        Task::Backtrack
    }

    fn node(
        &self,
        id: NodeId,
        pos: usize,
        cont: usize,
        st: &mut ParseState<'r>,
    ) -> Result<Task, RecursionError> {
        let task = match self.runtime.node(id) {
            Node::Literal {
                text,
                case_sensitive,
            } => match match_literal(text, &self.input[pos..], *case_sensitive) {
                Ok(len) => st.text(pos, pos + len, cont),
                Err(matched) => {
                    st.fail(pos + matched, Expect::Literal { node: id, matched });
                    Task::Backtrack
                }
            },
            Node::Set(set) => match self.peek(pos) {
                Some(c) if set.contains(c) => st.text(pos, pos + c.len_utf8(), cont),
                _ => {
                    st.fail(pos, Expect::Set(id));
                    Task::Backtrack
                }
            },
            Node::Call(rule) => return self.call(*rule, pos, cont, st),
            Node::Sequence(items) => st.sequence(items, pos, cont),
            Node::Choice {
                alternatives,
                dispatch,
            } => {
                // on a miss fall through to plain trial so that every alternative records what it expected
                let selected = match (dispatch, self.peek(pos)) {
                    (Some(dispatch), Some(c)) => dispatch.select(c),
                    _ => None,
                };
                match selected {
                    Some(index) => Task::Match {
                        node: alternatives[index],
                        pos,
                        cont,
                    },
                    None => st.alternatives(alternatives, pos, cont),
                }
            }
            Node::Repeat(repeat) => self.repeat(id, repeat, 0, pos, cont, st),
            Node::Exclude { base, except } => {
                let barrier = st.push_choice(Resume::Base(*base), pos, cont);
                st.silent += 1;
                let hit = st.push_frame(Frame::Excluded {
                    barrier,
                    next: cont,
                });
                Task::Match {
                    node: *except,
                    pos,
                    cont: hit,
                }
            }
            Node::Start => {
                if pos == 0 {
                    Task::Return { pos, cont }
                } else {
                    st.fail(pos, Expect::Start);
                    Task::Backtrack
                }
            }
            Node::End => {
                if pos == self.input.len() {
                    Task::Return { pos, cont }
                } else {
                    st.fail(pos, Expect::End);
                    Task::Backtrack
                }
            }
        };
        Ok(task)
    }

    fn repeat(
        &self,
        id: NodeId,
        repeat: &'r Repeat,
        count: u32,
        pos: usize,
        cont: usize,
        st: &mut ParseState<'r>,
    ) -> Task {
        let can_stop = count >= repeat.min;
        let can_continue = repeat.max.map_or(true, |max| count < max);

        if !can_continue {
            return if can_stop {
                Task::Return { pos, cont }
            } else {
                Task::Backtrack
            };
        }
        if can_stop {
            if !repeat.greedy {
                st.push_choice(
                    Resume::Iterate {
                        node: id,
                        repeat,
                        count,
                    },
                    pos,
                    cont,
                );
                return Task::Return { pos, cont };
            }
            st.push_choice(Resume::Stop, pos, cont);
        }
        self.iterate(id, repeat, count, pos, cont, st)
    }

    fn iterate(
        &self,
        id: NodeId,
        repeat: &'r Repeat,
        count: u32,
        pos: usize,
        cont: usize,
        st: &mut ParseState<'r>,
    ) -> Task {
        let viable = match (&repeat.first, self.peek(pos)) {
            (None, _) => true,
            (Some(first), Some(c)) => first.contains(c),
            (Some(_), None) => false,
        };
        if !viable {
            st.fail(pos, Expect::First(id));
            return Task::Backtrack;
        }

        let next = st.push_frame(Frame::Repeat {
            node: id,
            repeat,
            count,
            start: pos,
            next: cont,
        });
        Task::Match {
            node: repeat.body,
            pos,
            cont: next,
        }
    }

    fn call(
        &self,
        id: RuleId,
        pos: usize,
        cont: usize,
        st: &mut ParseState<'r>,
    ) -> Result<Task, RecursionError> {
        let rule = self.runtime.rule(id);

        if st.is_active(id, pos, cont) {
            log::debug!("Rule `{}` re-entered at offset {pos}", rule.name);
            return Err(RecursionError {
                rule: rule.name.to_string(),
                position: pos,
            });
        }

        if let Some(on_enter) = rule.hooks.on_enter {
            let enter = Enter {
                rule: &rule.name,
                position: pos,
                input: self.input,
            };
            if !on_enter(&enter) {
                st.fail(pos, Expect::Rule(id));
                return Ok(Task::Backtrack);
            }
        }

        let outer = st.atomic;
        if rule.flags.token && outer.is_none() {
            st.atomic = Some((id, pos));
        }
        let first = st.trace.len();
        let close = st.push_frame(Frame::Close {
            rule: id,
            start: pos,
            first,
            outer,
            next: cont,
        });
        Ok(Task::Match {
            node: rule.body,
            pos,
            cont: close,
        })
    }

    /// Runs `frame` now that the node before it matched up to `pos`.
    fn resume(&self, frame: Frame<'r>, pos: usize, st: &mut ParseState<'r>) -> Task {
        match frame {
            Frame::Done => self.accept(pos, st),
            Frame::Sequence { rest, next } => st.sequence(rest, pos, next),
            Frame::Repeat {
                node,
                repeat,
                count,
                start,
                next,
            } => {
                // an empty iteration can only help while below the minimum
                if pos == start && count >= repeat.min {
                    return Task::Backtrack;
                }
                self.repeat(node, repeat, count + 1, pos, next, st)
            }
            Frame::Close {
                rule,
                start,
                first,
                outer,
                next,
            } => {
                st.atomic = outer;
                st.trace.push(Event::Close {
                    rule,
                    start,
                    end: pos,
                    first,
                });
                Task::Return { pos, cont: next }
            }
            Frame::Excluded { barrier, .. } => {
                // drop everything the lookahead left behind, including the choice point of its base
                st.choices.truncate(barrier);
                Task::Backtrack
            }
        }
    }

    fn retry(&self, point: ChoicePoint<'r>, st: &mut ParseState<'r>) -> Task {
        let ChoicePoint {
            resume, pos, cont, ..
        } = point;
        match resume {
            Resume::Alternatives(rest) => st.alternatives(rest, pos, cont),
            Resume::Stop => Task::Return { pos, cont },
            Resume::Iterate {
                node,
                repeat,
                count,
            } => self.iterate(node, repeat, count, pos, cont, st),
            Resume::Base(base) => Task::Match {
                node: base,
                pos,
                cont,
            },
        }
    }
}

impl<V: SemanticValue> Runtime<V> {
    pub fn parse(&self, input: &str, mode: ParseMode) -> Result<Parsed<V>, Error> {
        self.parse_from(self.root(), input, mode)
    }

    /// Like [`Runtime::parse`] but starting from an arbitrary rule.
    pub fn parse_from(&self, start: RuleId, input: &str, mode: ParseMode) -> Result<Parsed<V>, Error> {
        let engine = Engine {
            runtime: self,
            input,
            mode,
        };
        let mut st = ParseState::new();

        let Some((consumed, events)) = engine.run(start, &mut st)? else {
            return Err(st.into_error(self).into());
        };

        let values = PostorderTrace::from_raw(events).replay(self, input);
        Ok(Parsed {
            value: single_or_sequence(values),
            consumed,
        })
    }

    pub fn parse_str(&self, input: &str) -> Result<V, Error> {
        self.parse(input, ParseMode::Full).map(|parsed| parsed.value)
    }
}

fn single_or_sequence<V: SemanticValue>(mut values: Vec<V>) -> V {
    if values.len() == 1 {
        if let Some(value) = values.pop() {
            return value;
        }
    }
    V::from_sequence(values)
}

#[cfg(test)]
mod tests {
    use crate::{
        CharSet, Enter, Error, Expected, Hooks, Node, ParseMode, Repeat, RuleFlags, RuntimeBuilder,
        Tree,
    };

    fn literal(b: &mut RuntimeBuilder<Tree>, text: &str) -> crate::NodeId {
        b.push_node(Node::Literal {
            text: text.into(),
            case_sensitive: true,
        })
    }

    #[test]
    fn test_match_literal() {
        assert_eq!(super::match_literal("abc", "abcd", true), Ok(3));
        assert_eq!(super::match_literal("abc", "abd", true), Err(2));
        assert_eq!(super::match_literal("abc", "ABC", false), Ok(3));
        assert_eq!(super::match_literal("é", "É", false), Err(0));
        assert_eq!(super::match_literal("ab", "a", true), Err(1));
    }

    #[test]
    fn test_choice_backtracks() {
        // root = ("a" | "ab") "c"
        let mut b = RuntimeBuilder::new();
        let root = b.declare_rule("root", RuleFlags::default(), Hooks::none());
        let a = literal(&mut b, "a");
        let ab = literal(&mut b, "ab");
        let choice = b.push_node(Node::Choice {
            alternatives: Box::new([a, ab]),
            dispatch: None,
        });
        let c = literal(&mut b, "c");
        let body = b.push_node(Node::Sequence(Box::new([choice, c])));
        b.define_rule(root, body);
        let runtime = b.finish(root);

        let parsed = runtime.parse("abc", ParseMode::Full).unwrap();
        assert_eq!(parsed.consumed, 3);
        assert_eq!(
            parsed.value,
            Tree::Sequence(vec![Tree::leaf("ab"), Tree::leaf("c")])
        );
    }

    #[test]
    fn test_prefix_takes_longest() {
        // root = "a"*?  (lazy)
        let mut b = RuntimeBuilder::new();
        let root = b.declare_rule("root", RuleFlags::default(), Hooks::none());
        let a = literal(&mut b, "a");
        let body = b.push_node(Node::Repeat(Repeat {
            body: a,
            min: 0,
            max: None,
            greedy: false,
            first: Some(CharSet::single('a')),
        }));
        b.define_rule(root, body);
        let runtime = b.finish(root);

        let parsed = runtime.parse("aaab", ParseMode::Prefix).unwrap();
        assert_eq!(parsed.consumed, 3);

        let err = runtime.parse("aaab", ParseMode::Full).unwrap_err();
        let Error::Parse(err) = err else {
            panic!("expected a parse error");
        };
        assert_eq!(err.position, 3);
        assert!(err.expected.contains(&Expected::EndOfInput));
        assert!(err.expected.contains(&Expected::Set(CharSet::single('a'))));
    }

    #[test]
    fn test_token_rule_reports_itself() {
        // root = NUMBER ";"   NUMBER = [0-9] [0-9]
        let mut b = RuntimeBuilder::new();
        let root = b.declare_rule("root", RuleFlags::default(), Hooks::none());
        let number = b.declare_rule(
            "NUMBER",
            RuleFlags {
                token: true,
                ignored: false,
            },
            Hooks::none(),
        );
        let digit = b.push_node(Node::Set(CharSet::range('0', '9')));
        let digits = b.push_node(Node::Sequence(Box::new([digit, digit])));
        b.define_rule(number, digits);
        let call = b.push_node(Node::Call(number));
        let semi = literal(&mut b, ";");
        let body = b.push_node(Node::Sequence(Box::new([call, semi])));
        b.define_rule(root, body);
        let runtime = b.finish(root);

        assert_eq!(runtime.parse_str("42;").unwrap(), Tree::Sequence(vec![
            Tree::leaf("42"),
            Tree::leaf(";")
        ]));

        let Error::Parse(err) = runtime.parse_str("4x;").unwrap_err() else {
            panic!("expected a parse error");
        };
        assert_eq!(err.position, 0);
        assert_eq!(err.expected, [Expected::Rule("NUMBER".into())]);
    }

    #[test]
    fn test_enter_guard() {
        fn only_at_start(enter: &Enter<'_>) -> bool {
            enter.position == 0
        }
        // root = item item   item = "x"
        let mut b = RuntimeBuilder::new();
        let root = b.declare_rule("root", RuleFlags::default(), Hooks::none());
        let item = b.declare_rule(
            "item",
            RuleFlags::default(),
            Hooks {
                on_enter: Some(only_at_start),
                ..Hooks::none()
            },
        );
        let x = literal(&mut b, "x");
        b.define_rule(item, x);
        let call = b.push_node(Node::Call(item));
        let body = b.push_node(Node::Sequence(Box::new([call, call])));
        b.define_rule(root, body);
        let runtime = b.finish(root);

        let Error::Parse(err) = runtime.parse_str("xx").unwrap_err() else {
            panic!("expected a parse error");
        };
        assert_eq!(err.position, 1);
        assert_eq!(err.expected, [Expected::Rule("item".into())]);
    }

    #[test]
    fn test_long_repetition() {
        // root = [a-z]*
        let mut b = RuntimeBuilder::<()>::new();
        let root = b.declare_rule("root", RuleFlags::default(), Hooks::none());
        let letter = b.push_node(Node::Set(CharSet::range('a', 'z')));
        let body = b.push_node(Node::Repeat(Repeat {
            body: letter,
            min: 0,
            max: None,
            greedy: true,
            first: Some(CharSet::range('a', 'z')),
        }));
        b.define_rule(root, body);
        let runtime = b.finish(root);

        let input = "a".repeat(100_000);
        assert_eq!(runtime.parse(&input, ParseMode::Full).unwrap().consumed, 100_000);

        let input = format!("{input}!");
        assert_eq!(runtime.parse(&input, ParseMode::Prefix).unwrap().consumed, 100_000);
        let Error::Parse(err) = runtime.parse(&input, ParseMode::Full).unwrap_err() else {
            panic!("expected a parse error");
        };
        assert_eq!(err.position, 100_000);
    }

    #[test]
    fn test_deep_nesting() {
        // root = "(" root ")" | "x"
        let mut b = RuntimeBuilder::<()>::new();
        let root = b.declare_rule("root", RuleFlags::default(), Hooks::none());
        let open = b.push_node(Node::Literal {
            text: "(".into(),
            case_sensitive: true,
        });
        let close = b.push_node(Node::Literal {
            text: ")".into(),
            case_sensitive: true,
        });
        let x = b.push_node(Node::Literal {
            text: "x".into(),
            case_sensitive: true,
        });
        let call = b.push_node(Node::Call(root));
        let nested = b.push_node(Node::Sequence(Box::new([open, call, close])));
        let body = b.push_node(Node::Choice {
            alternatives: Box::new([nested, x]),
            dispatch: None,
        });
        b.define_rule(root, body);
        let runtime = b.finish(root);

        let depth = 50_000;
        let input = format!("{}x{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(runtime.parse(&input, ParseMode::Full).unwrap().consumed, input.len());

        let truncated = &input[..input.len() - 1];
        let Error::Parse(err) = runtime.parse(truncated, ParseMode::Full).unwrap_err() else {
            panic!("expected a parse error");
        };
        assert_eq!(err.position, truncated.len());
        assert_eq!(err.expected, [Expected::Literal(")".into())]);
    }

    #[test]
    fn test_prefix_nested_repetition() {
        // root = ([a-z]+)*
        let mut b = RuntimeBuilder::<()>::new();
        let root = b.declare_rule("root", RuleFlags::default(), Hooks::none());
        let letter = b.push_node(Node::Set(CharSet::range('a', 'z')));
        let word = b.push_node(Node::Repeat(Repeat {
            body: letter,
            min: 1,
            max: None,
            greedy: true,
            first: Some(CharSet::range('a', 'z')),
        }));
        let body = b.push_node(Node::Repeat(Repeat {
            body: word,
            min: 0,
            max: None,
            greedy: true,
            first: Some(CharSet::range('a', 'z')),
        }));
        b.define_rule(root, body);
        let runtime = b.finish(root);

        assert_eq!(runtime.parse("aaaaaaaaaaaa!", ParseMode::Prefix).unwrap().consumed, 12);
        // the first match of the greedy loops already reaches the end
        let input = "a".repeat(10_000);
        assert_eq!(runtime.parse(&input, ParseMode::Prefix).unwrap().consumed, 10_000);
    }

    #[test]
    fn test_exclusion_backtracks() {
        // root = ([a-z]+ - "if") ";"
        let mut b = RuntimeBuilder::new();
        let root = b.declare_rule("root", RuleFlags::default(), Hooks::none());
        let letter = b.push_node(Node::Set(CharSet::range('a', 'z')));
        let word = b.push_node(Node::Repeat(Repeat {
            body: letter,
            min: 1,
            max: None,
            greedy: true,
            first: Some(CharSet::range('a', 'z')),
        }));
        let keyword = literal(&mut b, "if");
        let end = b.push_node(Node::End);
        let exact = b.push_node(Node::Sequence(Box::new([keyword, end])));
        let except = b.push_node(Node::Choice {
            alternatives: Box::new([exact, keyword]),
            dispatch: None,
        });
        let name = b.push_node(Node::Exclude {
            base: word,
            except,
        });
        let semi = literal(&mut b, ";");
        let body = b.push_node(Node::Sequence(Box::new([name, semi])));
        b.define_rule(root, body);
        let runtime = b.finish(root);

        assert_eq!(
            runtime.parse_str("abc;").unwrap(),
            Tree::Sequence(vec![
                Tree::leaf("a"),
                Tree::leaf("b"),
                Tree::leaf("c"),
                Tree::leaf(";")
            ])
        );
        // failures inside the lookahead are not reported
        let Error::Parse(err) = runtime.parse_str("iffy;").unwrap_err() else {
            panic!("expected a parse error");
        };
        assert_eq!(err.position, 0);
        assert!(err.expected.is_empty());

        let Error::Parse(err) = runtime.parse_str("ab1").unwrap_err() else {
            panic!("expected a parse error");
        };
        assert_eq!(err.position, 2);
        assert!(err.expected.contains(&Expected::Literal(";".into())));
    }
}
