use std::fmt::Display;

use crate::{
    value::SemanticValue,
    visitor::Match,
    RuleId, Runtime, Span,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event {
    /// A literal or symbol-set matched `start..end`.
    Text { start: usize, end: usize },
    /// A rule matched `start..end`, its children are the events from index `first` up to this one.
    Close {
        rule: RuleId,
        start: usize,
        end: usize,
        first: usize,
    },
}

/// Events of a successful parse in the order they completed.
#[derive(Clone, Default, Debug)]
pub struct PostorderTrace(Vec<Event>);
impl PostorderTrace {
    pub fn from_raw(vec: Vec<Event>) -> PostorderTrace {
        Self(vec)
    }
    pub fn into_raw(self) -> Vec<Event> {
        self.0
    }
    pub fn get_raw(&self) -> &Vec<Event> {
        &self.0
    }

    /// Runs the visitor hooks bottom-up, returns the values left at the top level.
    pub fn replay<V: SemanticValue>(&self, runtime: &Runtime<V>, input: &str) -> Vec<V> {
        let mut values: Vec<V> = Vec::new();
        // number of values before each event
        let mut marks: Vec<usize> = Vec::with_capacity(self.0.len());

        for event in &self.0 {
            marks.push(values.len());
            match *event {
                Event::Text { start, end } => {
                    values.push(V::from_text(&input[start..end], Span::new(start, end)));
                }
                Event::Close {
                    rule,
                    start,
                    end,
                    first,
                } => {
                    let mut children = values.split_off(marks[first]);
                    let compiled = runtime.rule(rule);
                    if compiled.flags.ignored {
                        continue;
                    }

                    let span = Span::new(start, end);
                    let m = Match {
                        rule: &compiled.name,
                        span,
                        text: &input[start..end],
                    };
                    if let Some(on_match) = compiled.hooks.on_match {
                        children = vec![on_match(&m)];
                    } else if compiled.flags.token {
                        children = vec![V::from_text(m.text, span)];
                    }
                    match compiled.hooks.on_value {
                        Some(on_value) => values.push(on_value(&m, children)),
                        None => values.extend(children),
                    }
                }
            }
        }

        values
    }

    pub fn display_into<V>(
        &self,
        buf: &mut dyn std::fmt::Write,
        runtime: &Runtime<V>,
        input: &str,
    ) -> std::fmt::Result {
        for event in &self.0 {
            match *event {
                Event::Text { start, end } => writeln!(buf, "{:?}", &input[start..end])?,
                Event::Close {
                    rule, start, end, ..
                } => writeln!(buf, "{} {start}..{end}", runtime.rule(rule).name)?,
            }
        }
        Ok(())
    }

    pub fn display<'a, V>(
        &'a self,
        runtime: &'a Runtime<V>,
        input: &'a str,
    ) -> PostorderTraceDisplay<'a, V> {
        PostorderTraceDisplay(self, runtime, input)
    }
}

pub struct PostorderTraceDisplay<'a, V>(&'a PostorderTrace, &'a Runtime<V>, &'a str);
impl<V> Display for PostorderTraceDisplay<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.display_into(f, self.1, self.2)
    }
}
