//! Source positions and spans.
//!
//! Positions are byte-like offsets that only need to be ordered: the analysis
//! is position based, so "before" and "after" in source order is the only
//! property the rest of the workspace relies on.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A unique identifier for a source file
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize, Display)]
#[display("file#{_0}")]
pub struct FileId(pub u32);

impl FileId {
    /// Creates a file id.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// A half-open `[start, end)` span of source positions.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize, Display)]
#[display("{start}..{end}")]
pub struct Span {
    /// First position covered by the span
    pub start: u32,
    /// One past the last position covered by the span
    pub end: u32,
}

impl Span {
    /// Creates a span. `end` is clamped so that it never precedes `start`.
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// An empty span sitting at a single position.
    #[must_use]
    pub fn at(pos: u32) -> Self {
        Self::new(pos, pos)
    }

    /// The span as a `usize` range.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    /// Number of positions covered.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Returns `true` if the span covers no positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if `pos` lies inside `[start, end)`.
    #[must_use]
    pub fn contains(&self, pos: u32) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Returns `true` if `other` lies entirely within this span.
    #[must_use]
    pub fn encloses(&self, other: Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// A span with associated file
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize, Display)]
#[display("{file}:{span}")]
pub struct FileSpan {
    /// File the span belongs to
    pub file: FileId,
    /// Positions inside the file
    pub span: Span,
}

impl FileSpan {
    /// Creates a file span.
    #[must_use]
    pub fn new(file: FileId, span: Span) -> Self {
        Self { file, span }
    }

    /// Placeholder span for synthesized nodes.
    #[must_use]
    pub fn dummy() -> Self {
        Self::new(FileId(0), Span::at(0))
    }

    /// The span as a `usize` range.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.span.range()
    }

    /// First position covered.
    #[must_use]
    pub fn start(&self) -> u32 {
        self.span.start
    }

    /// One past the last position covered.
    #[must_use]
    pub fn end(&self) -> u32 {
        self.span.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_contains_is_half_open() {
        let span = Span::new(3, 7);
        assert!(!span.contains(2));
        assert!(span.contains(3));
        assert!(span.contains(6));
        assert!(!span.contains(7));
    }

    #[test]
    fn test_span_new_clamps_end() {
        let span = Span::new(5, 2);
        assert_eq!(span.end, 5);
        assert!(span.is_empty());
    }

    #[test]
    fn test_span_cover_and_encloses() {
        let outer = Span::new(1, 4).cover(Span::new(6, 9));
        assert_eq!(outer, Span::new(1, 9));
        assert!(outer.encloses(Span::new(2, 8)));
        assert!(!Span::new(2, 8).encloses(outer));
    }

    #[test]
    fn test_file_span_display() {
        let span = FileSpan::new(FileId(2), Span::new(10, 12));
        assert_eq!(span.to_string(), "file#2:10..12");
    }
}
