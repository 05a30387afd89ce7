use std::{cmp::Ordering, fmt::Display};

/// Inclusive range of unicode scalar values.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharRange {
    pub start: char,
    pub end: char,
}

impl CharRange {
    pub fn new(start: char, end: char) -> CharRange {
        CharRange { start, end }
    }
    pub fn single(c: char) -> CharRange {
        CharRange { start: c, end: c }
    }
    pub fn contains(self, c: char) -> bool {
        self.start <= c && c <= self.end
    }
}

/// A set of symbols stored as sorted, disjoint and non-adjacent inclusive ranges.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "Vec<CharRange>", into = "Vec<CharRange>")
)]
pub struct CharSet {
    ranges: Vec<CharRange>,
}

fn next_char(c: char) -> Option<char> {
    match c {
        '\u{D7FF}' => Some('\u{E000}'),
        char::MAX => None,
        _ => char::from_u32(c as u32 + 1),
    }
}

fn prev_char(c: char) -> Option<char> {
    match c {
        '\u{E000}' => Some('\u{D7FF}'),
        '\0' => None,
        _ => char::from_u32(c as u32 - 1),
    }
}

impl CharSet {
    pub fn empty() -> CharSet {
        CharSet::default()
    }
    pub fn single(c: char) -> CharSet {
        CharSet {
            ranges: vec![CharRange::single(c)],
        }
    }
    pub fn range(start: char, end: char) -> CharSet {
        CharSet::from_ranges([CharRange::new(start, end)])
    }
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> CharSet {
        CharSet::from_ranges(chars.into_iter().map(CharRange::single))
    }
    /// Ranges with `start > end` are dropped.
    pub fn from_ranges(ranges: impl IntoIterator<Item = CharRange>) -> CharSet {
        let mut ranges = ranges
            .into_iter()
            .filter(|r| r.start <= r.end)
            .collect::<Vec<_>>();
        ranges.sort();

        let mut merged: Vec<CharRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            if let Some(last) = merged.last_mut() {
                let touches = match next_char(last.end) {
                    Some(next) => range.start <= next,
                    None => true,
                };
                if touches {
                    last.end = last.end.max(range.end);
                    continue;
                }
            }
            merged.push(range);
        }

        CharSet { ranges: merged }
    }
    pub fn ranges(&self) -> &[CharRange] {
        &self.ranges
    }
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
    pub fn contains(&self, c: char) -> bool {
        self.ranges
            .binary_search_by(|r| {
                if r.end < c {
                    Ordering::Less
                } else if r.start > c {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .is_ok()
    }
    pub fn union(&self, other: &CharSet) -> CharSet {
        if other.is_empty() {
            return self.clone();
        }
        CharSet::from_ranges(self.ranges.iter().chain(&other.ranges).copied())
    }
    pub fn difference(&self, other: &CharSet) -> CharSet {
        let mut out = Vec::new();
        for &range in &self.ranges {
            let mut start = Some(range.start);
            for cut in &other.ranges {
                let Some(s) = start else {
                    break;
                };
                if cut.end < s {
                    continue;
                }
                if cut.start > range.end {
                    break;
                }
                if cut.start > s {
                    if let Some(end) = prev_char(cut.start) {
                        out.push(CharRange::new(s, end));
                    }
                }
                start = next_char(cut.end).filter(|&next| next <= range.end);
            }
            if let Some(s) = start {
                out.push(CharRange::new(s, range.end));
            }
        }
        CharSet { ranges: out }
    }
    pub fn intersects(&self, other: &CharSet) -> bool {
        let mut a = self.ranges.iter().peekable();
        let mut b = other.ranges.iter().peekable();
        while let (Some(x), Some(y)) = (a.peek(), b.peek()) {
            if x.end < y.start {
                a.next();
            } else if y.end < x.start {
                b.next();
            } else {
                return true;
            }
        }
        false
    }
    /// Adds the other-case counterpart of every ASCII letter in the set.
    pub fn ascii_case_folded(&self) -> CharSet {
        let mut extra = Vec::new();
        for range in &self.ranges {
            for (lo, hi) in [('a', 'z'), ('A', 'Z')] {
                let start = range.start.max(lo);
                let end = range.end.min(hi);
                if start <= end {
                    let flip = |c: char| match c.is_ascii_lowercase() {
                        true => c.to_ascii_uppercase(),
                        false => c.to_ascii_lowercase(),
                    };
                    extra.push(CharRange::new(flip(start), flip(end)));
                }
            }
        }
        if extra.is_empty() {
            return self.clone();
        }
        CharSet::from_ranges(self.ranges.iter().copied().chain(extra))
    }
}

impl From<Vec<CharRange>> for CharSet {
    fn from(value: Vec<CharRange>) -> CharSet {
        CharSet::from_ranges(value)
    }
}

impl From<CharSet> for Vec<CharRange> {
    fn from(value: CharSet) -> Vec<CharRange> {
        value.ranges
    }
}

fn write_escaped(f: &mut std::fmt::Formatter<'_>, c: char) -> std::fmt::Result {
    match c {
        ']' | '[' | '-' | '^' => write!(f, "\\{c}"),
        _ => write!(f, "{}", c.escape_debug()),
    }
}

impl Display for CharSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for range in &self.ranges {
            write_escaped(f, range.start)?;
            if range.start != range.end {
                write!(f, "-")?;
                write_escaped(f, range.end)?;
            }
        }
        write!(f, "]")
    }
}

#[test]
fn test_normalize() {
    let set = CharSet::from_ranges([
        CharRange::new('x', 'z'),
        CharRange::new('a', 'c'),
        CharRange::new('d', 'f'),
        CharRange::new('b', 'b'),
        CharRange::new('q', 'p'),
    ]);
    assert_eq!(
        set.ranges(),
        &[CharRange::new('a', 'f'), CharRange::new('x', 'z')]
    );
    assert_eq!(set.to_string(), "[a-fx-z]");
}

#[test]
fn test_contains() {
    let set = CharSet::from_ranges([CharRange::new('0', '9'), CharRange::single('_')]);
    assert!(set.contains('0'));
    assert!(set.contains('5'));
    assert!(set.contains('_'));
    assert!(!set.contains('a'));
    assert!(!CharSet::empty().contains('a'));
}

#[test]
fn test_difference() {
    let az = CharSet::range('a', 'z');
    assert_eq!(az.difference(&CharSet::single('m')).to_string(), "[a-ln-z]");
    assert_eq!(az.difference(&CharSet::range('f', 'm')).to_string(), "[a-en-z]");

    let af = CharSet::range('a', 'f');
    assert_eq!(af.difference(&CharSet::range('u', 'z')), af);
    assert_eq!(af.difference(&CharSet::range('d', 'z')).to_string(), "[a-c]");
    assert_eq!(
        CharSet::range('f', 'z')
            .difference(&CharSet::range('a', 'm'))
            .to_string(),
        "[n-z]"
    );
    assert!(CharSet::range('f', 'm').difference(&az).is_empty());
}

#[test]
fn test_surrogate_gap() {
    let set = CharSet::from_ranges([
        CharRange::new('a', '\u{D7FF}'),
        CharRange::new('\u{E000}', '\u{E010}'),
    ]);
    assert_eq!(set.ranges().len(), 1);

    let cut = set.difference(&CharSet::range('\u{E000}', '\u{E010}'));
    assert_eq!(cut, CharSet::range('a', '\u{D7FF}'));
}

#[test]
fn test_intersects_and_fold() {
    let lower = CharSet::range('a', 'f');
    assert!(!lower.intersects(&CharSet::range('A', 'F')));
    assert!(lower.ascii_case_folded().intersects(&CharSet::single('C')));
    assert_eq!(
        CharSet::from_chars(['k', '1']).ascii_case_folded().to_string(),
        "[1Kk]"
    );
}
