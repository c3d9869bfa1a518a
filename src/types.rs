/// Core domain types shared by the trie, the line translator, and the link resolver.
use std::fmt;

use serde::Serialize;

/// One hunk header from a unified diff: the old-side range and the new-side range.
/// Hunks are kept in diff order, which is ascending on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HunkTranslation {
    /// Range in the newer revision.
    pub new: LineRange,
    /// Range in the older revision.
    pub old: LineRange,
}

/// An inclusive range of one-based line numbers.
///
/// `span == 0` marks the side of a pure insertion or deletion: there are no lines
/// there, and `start == end` names the line the change sits after.
/// Construct through [`LineRange::new`] so `end == start + max(span - 1, 0)` holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    /// Last line of the range (equal to `start` when `span` is 0 or 1).
    pub end: u32,
    /// Number of lines covered.
    pub span: u32,
    /// First line of the range.
    pub start: u32,
}

impl LineRange {
    /// Whether `line` lies inside this range. A zero-span range contains nothing.
    pub const fn contains(&self, line: u32) -> bool {
        return self.span > 0 && self.start <= line && line <= self.end;
    }

    /// Build a range from its two inclusive bounds. `end < start` yields a zero span.
    pub const fn from_bounds(start: u32, end: u32) -> Self {
        if end < start {
            return Self::new(start, 0);
        }
        return Self::new(start, end.saturating_sub(start).saturating_add(1));
    }

    /// Build a range from its first line and line count.
    pub const fn new(start: u32, span: u32) -> Self {
        return Self {
            end: start.saturating_add(span.saturating_sub(1)),
            span,
            start,
        };
    }

    /// A range covering exactly one line.
    pub const fn single(line: u32) -> Self {
        return Self::new(line, 1);
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{},{},{}", self.start, self.end, self.span);
    }
}

/// A candidate link produced by one matcher over one line of text.
/// Offsets count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkCandidate<P> {
    /// Number of characters covered.
    pub length: usize,
    /// What the matcher recognised; opaque to the resolver.
    pub payload: P,
    /// Character offset of the first matched character.
    pub start_index: usize,
}

impl<P> LinkCandidate<P> {
    /// Character offset one past the last matched character.
    pub const fn end_index(&self) -> usize {
        return self.start_index.saturating_add(self.length);
    }
}

/// A trie key found in scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<V> {
    /// Character offset where the key starts.
    pub start_index: usize,
    /// The matched key.
    pub text: String,
    /// Value stored under the key.
    pub value: V,
}

impl<V> Match<V> {
    /// Inclusive character offset of the last matched character.
    pub fn last_index(&self) -> usize {
        return self.start_index.saturating_add(self.char_len().saturating_sub(1));
    }

    /// Length of the match in characters.
    pub fn char_len(&self) -> usize {
        return self.text.chars().count();
    }
}

/// The final clickable unit: one span and every candidate that claimed exactly it.
/// More than one candidate means the text is ambiguous and the user has to choose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLink<P> {
    /// Candidates sharing this span, in encounter order. Never empty.
    pub candidates: Vec<LinkCandidate<P>>,
    /// Number of characters covered.
    pub length: usize,
    /// Character offset of the first linked character.
    pub start_index: usize,
}

impl<P> ResolvedLink<P> {
    /// Whether a choice must be offered before dispatching.
    pub const fn is_ambiguous(&self) -> bool {
        return self.candidates.len() > 1;
    }
}
