use std::fmt::Display;

use crate::charset::CharSet;

/// Something the parser would have accepted at the failure position.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Expected {
    Literal(String),
    Set(CharSet),
    Rule(String),
    StartOfInput,
    EndOfInput,
}

impl Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::Literal(text) => write!(f, "{text:?}"),
            Expected::Set(set) => write!(f, "{set}"),
            Expected::Rule(name) => write!(f, "{name}"),
            Expected::StartOfInput => write!(f, "start of input"),
            Expected::EndOfInput => write!(f, "end of input"),
        }
    }
}

/// The input was not recognized. Points at the furthest position any alternative reached.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error("unexpected input at offset {position}{}", expected_list(.expected))]
pub struct ParseError {
    /// Byte offset into the input.
    pub position: usize,
    /// Sorted and deduplicated.
    pub expected: Vec<Expected>,
}

impl ParseError {
    pub fn new(position: usize, mut expected: Vec<Expected>) -> ParseError {
        expected.sort();
        expected.dedup();
        ParseError { position, expected }
    }

    /// One-based line and column (in chars) of the failure.
    pub fn line_column(&self, input: &str) -> (usize, usize) {
        let position = clamp_to_boundary(input, self.position);
        let before = &input[..position];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = input[line_start..position].chars().count() + 1;
        (line, column)
    }

    pub fn display_in<'a>(&'a self, input: &'a str) -> SourceDisplay<'a> {
        SourceDisplay { error: self, input }
    }
}

fn clamp_to_boundary(input: &str, mut position: usize) -> usize {
    position = position.min(input.len());
    while !input.is_char_boundary(position) {
        position -= 1;
    }
    position
}

/// `", expected a, b or c"`, empty when nothing was expected.
fn expected_list(expected: &[Expected]) -> String {
    let Some((last, rest)) = expected.split_last() else {
        return String::new();
    };
    let mut out = String::from(", expected ");
    for (i, item) in rest.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&item.to_string());
    }
    if !rest.is_empty() {
        out.push_str(" or ");
    }
    out.push_str(&last.to_string());
    out
}

#[derive(Clone, Copy)]
pub struct SourceDisplay<'a> {
    error: &'a ParseError,
    input: &'a str,
}

impl Display for SourceDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (line, column) = self.error.line_column(self.input);
        writeln!(f, "At {line}:{column} ({}): {}", self.error.position, self.error)?;

        let position = clamp_to_boundary(self.input, self.error.position);
        let line_start = self.input[..position].rfind('\n').map_or(0, |i| i + 1);
        let line_end = self.input[position..]
            .find('\n')
            .map_or(self.input.len(), |i| position + i);
        let source_line = self.input[line_start..line_end].trim_end_matches('\r');

        writeln!(f, "    {source_line}")?;
        writeln!(f, "    {:>column$}", "^")
    }
}

/// A rule was re-entered at the same position without consuming input.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error("left recursion: rule `{rule}` re-entered at offset {position}")]
pub struct RecursionError {
    pub rule: String,
    pub position: usize,
}

#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Recursion(#[from] RecursionError),
}

#[test]
fn test_parse_error_display() {
    let error = ParseError::new(
        1,
        vec![
            Expected::Literal("c".into()),
            Expected::Literal("b".into()),
            Expected::Literal("b".into()),
        ],
    );
    assert_eq!(
        error.expected,
        [Expected::Literal("b".into()), Expected::Literal("c".into())]
    );
    assert_eq!(
        error.to_string(),
        "unexpected input at offset 1, expected \"b\" or \"c\""
    );

    let error = ParseError::new(3, vec![Expected::EndOfInput]);
    assert_eq!(
        error.to_string(),
        "unexpected input at offset 3, expected end of input"
    );

    let error = ParseError::new(
        0,
        vec![
            Expected::Rule("value".into()),
            Expected::Literal("[".into()),
            Expected::StartOfInput,
        ],
    );
    assert_eq!(
        error.to_string(),
        "unexpected input at offset 0, expected \"[\", value or start of input"
    );

    let error: Box<dyn std::error::Error> = Box::new(ParseError::new(5, Vec::new()));
    assert_eq!(error.to_string(), "unexpected input at offset 5");
    assert!(error.source().is_none());
}

#[test]
fn test_source_display() {
    let input = "key = 1\nother = ?\n";
    let error = ParseError::new(16, vec![Expected::Set(CharSet::range('0', '9'))]);
    assert_eq!(error.line_column(input), (2, 9));

    let expected = "\
At 2:9 (16): unexpected input at offset 16, expected [0-9]
    other = ?
            ^
";
    assert_eq!(error.display_in(input).to_string(), expected);
}
