//! Structural relations between paths and the two safety predicates.

use derive_more::Display;
use serde::Serialize;

use crate::path::{ReferencePath, Segment};

/// How two paths relate, seen from the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathRelation {
    /// Different roots, or at least one side is not representable.
    #[display("unrelated")]
    Unrelated,
    /// Same root, diverging before either verified prefix ends.
    #[display("sibling")]
    Sibling,
    /// The first path is a strict prefix of the second.
    #[display("parent")]
    Parent,
    /// Identical verified prefixes.
    #[display("same")]
    Same,
    /// The second path is a strict prefix of the first.
    #[display("child")]
    Child,
}

/// Computes the structural relation of `a` to `b`.
///
/// Only the verified (explicit) prefixes are compared; segments behind a
/// call marker are trusted but never matched against each other.
#[must_use]
pub fn relation(a: &ReferencePath, b: &ReferencePath) -> PathRelation {
    match (a.root(), b.root()) {
        (Some(root_a), Some(root_b)) if root_a == root_b => {}
        _ => return PathRelation::Unrelated,
    }

    let shared = a.explicit_length().min(b.explicit_length());
    let diverges = a.segments()[..shared]
        .iter()
        .zip(&b.segments()[..shared])
        .any(|(left, right)| left != right);
    if diverges {
        return PathRelation::Sibling;
    }

    match a.explicit_length().cmp(&b.explicit_length()) {
        std::cmp::Ordering::Less => PathRelation::Parent,
        std::cmp::Ordering::Equal => PathRelation::Same,
        std::cmp::Ordering::Greater => PathRelation::Child,
    }
}

/// Whether the part of `path` from `start` up to and including its resizable
/// anchor passes through an element access or helper call.
#[must_use]
pub fn has_resizable_access_since(path: &ReferencePath, start: usize) -> bool {
    let end = (path.dynamic_boundary() + 1).min(path.len());
    if start >= end {
        return false;
    }
    path.segments()[start..end]
        .iter()
        .any(Segment::is_indirection)
}

/// Whether resizing through `mutator` could leave `victim` dangling.
///
/// Only a path pointing directly at a resizable anchor can reallocate, and
/// it can only relocate what lies at or below it.
#[must_use]
pub fn can_invalidate(mutator: &ReferencePath, victim: &ReferencePath) -> bool {
    if !mutator.points_to_dyn_sized() {
        return false;
    }

    match relation(mutator, victim) {
        PathRelation::Unrelated | PathRelation::Sibling | PathRelation::Child => false,
        PathRelation::Parent | PathRelation::Same => {
            has_resizable_access_since(victim, mutator.explicit_length())
        }
    }
}

/// Whether `a` and `b` may refer to overlapping dynamically sized storage.
#[must_use]
pub fn can_alias(a: &ReferencePath, b: &ReferencePath) -> bool {
    if !a.points_to_dyn_sized() && !b.points_to_dyn_sized() {
        return false;
    }

    match relation(a, b) {
        PathRelation::Unrelated | PathRelation::Sibling => false,
        PathRelation::Parent => {
            b.points_to_dyn_sized() || has_resizable_access_since(b, a.explicit_length())
        }
        PathRelation::Same => {
            a.explicit_length() <= a.dynamic_boundary()
                || b.explicit_length() <= b.dynamic_boundary()
        }
        PathRelation::Child => a.points_to_dyn_sized(),
    }
}
