//! The reference path value type.

use std::fmt;

use rp_intern::{Interner, Symbol};

/// One step of a [`ReferencePath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A field, parameter or local name
    Name(Symbol),
    /// An anonymous element access
    Index,
    /// A trusted helper call whose internals are opaque
    Call(Symbol),
}

impl Segment {
    /// Returns `true` for element accesses and helper calls, the two kinds of
    /// step a reallocation can invalidate.
    #[must_use]
    pub fn is_indirection(&self) -> bool {
        matches!(self, Self::Index | Self::Call(_))
    }

    /// Returns `true` for call markers.
    #[must_use]
    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call(_))
    }
}

/// Root-to-leaf description of how a reference was derived.
///
/// Paths are plain values: two paths are the same path exactly when their
/// fields are equal. The empty path is the "not statically representable"
/// sentinel; it relates to every path as unrelated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ReferencePath {
    segments: Vec<Segment>,
    dynamic_boundary: usize,
    explicit_length: usize,
    derived_from_local_scope: bool,
}

impl ReferencePath {
    /// Creates a path.
    ///
    /// `dynamic_boundary` is clamped to the number of segments. The explicit
    /// length is derived from the position of the first call marker.
    #[must_use]
    pub fn new(segments: Vec<Segment>, dynamic_boundary: usize, derived_from_local_scope: bool) -> Self {
        let explicit_length = segments
            .iter()
            .position(Segment::is_call)
            .unwrap_or(segments.len());
        let dynamic_boundary = dynamic_boundary.min(segments.len());

        Self {
            segments,
            dynamic_boundary,
            explicit_length,
            derived_from_local_scope,
        }
    }

    /// The "not statically representable" sentinel.
    #[must_use]
    pub fn not_representable() -> Self {
        Self::default()
    }

    /// Returns `false` for the sentinel.
    #[must_use]
    pub fn is_representable(&self) -> bool {
        !self.segments.is_empty()
    }

    /// Segments, root first.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Root segment, if any.
    #[must_use]
    pub fn root(&self) -> Option<Segment> {
        self.segments.first().copied()
    }

    /// Length of the prefix up to and including the first resizable anchor.
    #[must_use]
    pub fn dynamic_boundary(&self) -> usize {
        self.dynamic_boundary
    }

    /// Number of leading segments before the first call marker.
    #[must_use]
    pub fn explicit_length(&self) -> usize {
        self.explicit_length
    }

    /// Whether the path is rooted in a locally-held exclusive-access handle.
    #[must_use]
    pub fn derived_from_local_scope(&self) -> bool {
        self.derived_from_local_scope
    }

    /// Whether the path points directly at a resizable anchor rather than at
    /// a stable location reached through one.
    #[must_use]
    pub fn points_to_dyn_sized(&self) -> bool {
        self.is_representable() && self.dynamic_boundary == self.segments.len()
    }

    /// Whether any segment of the path lies inside or on a resizable anchor.
    #[must_use]
    pub fn crosses_dyn_sized(&self) -> bool {
        self.dynamic_boundary > 0
    }

    /// Renders the path with names resolved through `interner`.
    ///
    /// Names are joined with `.`, element accesses render as `[]`, helper
    /// calls as `name()`, and the resizable anchor is followed by `!`.
    #[must_use]
    pub fn display<'a>(&'a self, interner: &'a Interner) -> PathDisplay<'a> {
        PathDisplay {
            path: self,
            interner,
        }
    }
}

/// [`fmt::Display`] adapter returned by [`ReferencePath::display`].
pub struct PathDisplay<'a> {
    path: &'a ReferencePath,
    interner: &'a Interner,
}

impl fmt::Display for PathDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return f.write_str("<unrepresentable>");
        }

        for (idx, segment) in self.path.segments.iter().enumerate() {
            match segment {
                Segment::Name(name) => {
                    if idx > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(self.interner.resolve(name))?;
                }
                Segment::Index => f.write_str("[]")?,
                Segment::Call(name) => {
                    if idx > 0 {
                        f.write_str(".")?;
                    }
                    write!(f, "{}()", self.interner.resolve(name))?;
                }
            }
            if idx + 1 == self.path.dynamic_boundary {
                f.write_str("!")?;
            }
        }
        Ok(())
    }
}
