//! Line translation across revisions from `--unified=0` hunk headers.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::types::{HunkTranslation, LineRange};

/// Hunk header at the start of a line: `@@ -start[,span] +start[,span] @@`.
#[allow(clippy::expect_used, reason = "hardcoded pattern, compile-time invariant")]
static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"(?m)^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid regex");
});

/// Which end of a range a composed translation is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Last line: a zero-span landing keeps the line before the change.
    End,
    /// First line: a zero-span landing moves to the line after the change.
    Start,
}

/// The side of a diff a query starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// The newer revision.
    New,
    /// The older revision.
    Old,
}

/// Maps line numbers between the two revisions of one diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTranslator {
    /// Hunks in diff order.
    hunks: Vec<HunkTranslation>,
}

impl LineTranslator {
    /// Parsed hunks, in diff order.
    pub fn hunks(&self) -> &[HunkTranslation] {
        return &self.hunks;
    }

    /// Where a line of the older revision sits in the newer one.
    pub fn new_line(&self, old_line: u32) -> LineRange {
        return self.translate(old_line, Side::Old);
    }

    /// Where a line of the newer revision sits in the older one.
    pub fn old_line(&self, new_line: u32) -> LineRange {
        return self.translate(new_line, Side::New);
    }

    /// Read every hunk header in a raw diff. Other lines are ignored.
    ///
    /// A header whose numbers do not fit a line number invalidates the whole
    /// diff: the translator is then empty and every query maps a line to itself.
    pub fn parse(diff: &str) -> Self {
        let parsed: Option<Vec<HunkTranslation>> =
            HUNK_HEADER.captures_iter(diff).map(|cap| return parse_hunk_header(&cap)).collect();
        if parsed.is_none() {
            tracing::warn!("unparseable hunk header, translating lines unchanged");
        }
        return Self {
            hunks: parsed.unwrap_or_default(),
        };
    }

    /// Shared algorithm for both directions.
    ///
    /// A line inside a hunk's `from` range has no individual counterpart, so the
    /// whole `to` range comes back. Otherwise the line shifts by the net line delta
    /// of every hunk that ends before it.
    fn translate(&self, line: u32, from: Side) -> LineRange {
        if let Some(hunk) = self.hunks.iter().find(|h| return h.side(from).contains(line)) {
            return hunk.side(from.opposite());
        }

        let offset = self
            .hunks
            .iter()
            .filter(|h| return h.side(from).end < line)
            .fold(0_i64, |acc, h| {
                let delta = i64::from(h.side(from.opposite()).span)
                    .saturating_sub(i64::from(h.side(from).span));
                return acc.saturating_add(delta);
            });

        let shifted = i64::from(line).saturating_add(offset).max(0);
        return LineRange::single(u32::try_from(shifted).unwrap_or(u32::MAX));
    }
}

impl HunkTranslation {
    /// The range on one side of the hunk.
    const fn side(&self, side: Side) -> LineRange {
        return match side {
            Side::New => self.new,
            Side::Old => self.old,
        };
    }
}

impl Side {
    /// The other side of the diff.
    const fn opposite(self) -> Self {
        return match self {
            Self::New => Self::Old,
            Self::Old => Self::New,
        };
    }
}

/// Turn one header capture into a hunk. Returns `None` when a number overflows.
fn parse_hunk_header(cap: &Captures<'_>) -> Option<HunkTranslation> {
    let old = parse_range_spec(cap, 1, 2)?;
    let new = parse_range_spec(cap, 3, 4)?;
    return Some(HunkTranslation { new, old });
}

/// Parse `start[,span]` from two capture groups. A missing span means one line.
fn parse_range_spec(cap: &Captures<'_>, start_group: usize, span_group: usize) -> Option<LineRange> {
    let start: u32 = cap.get(start_group)?.as_str().parse().ok()?;
    let span: u32 = match cap.get(span_group) {
        None => 1,
        Some(m) => m.as_str().parse().ok()?,
    };
    return Some(LineRange::new(start, span));
}

/// Follow one boundary of a line through a chain of diffs, newest pair first.
///
/// Each translator maps the older revision of its pair to the newer one; the
/// line starts in the newest revision and is walked back through each
/// translator's old side. When a step lands on a zero-span range (the line did
/// not exist there) a start boundary moves to the following line so it never
/// names a line that was not there.
pub fn translate_to_oldest(line: u32, boundary: Boundary, translators: &[LineTranslator]) -> u32 {
    return translators.iter().fold(line, |current, translator| {
        return land_on_boundary(translator.old_line(current), boundary);
    });
}

/// Walk a whole range back to the oldest revision. The result never ends before it starts.
pub fn translate_range_to_oldest(range: LineRange, translators: &[LineTranslator]) -> LineRange {
    let start = translate_to_oldest(range.start, Boundary::Start, translators);
    let end = translate_to_oldest(range.end, Boundary::End, translators);
    return LineRange::from_bounds(start, end.max(start));
}

/// Pick the line a boundary settles on within a translated range.
const fn land_on_boundary(range: LineRange, boundary: Boundary) -> u32 {
    return match boundary {
        Boundary::End => range.end,
        Boundary::Start if range.span == 0 => range.start.saturating_add(1),
        Boundary::Start => range.start,
    };
}
