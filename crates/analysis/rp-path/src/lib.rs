//! Reference paths and the relations between them.
//!
//! A [`ReferencePath`] describes how a reference was derived from a root
//! variable: through fields, element accesses and trusted helper calls. Two
//! paths can be related structurally ([`relation`]) and checked for the two
//! unsafe patterns the rest of the analysis reports:
//!
//! - [`can_invalidate`]: resizing the container one path points at could
//!   leave the other reference dangling.
//! - [`can_alias`]: the two references may overlap inside dynamically sized
//!   storage.
//!
//! # Dynamic boundary
//!
//! Every path records where dynamically sized (reallocatable) data begins.
//! `segments[..dynamic_boundary]` runs from the root up to and including the
//! first resizable anchor; the rest is a suffix of fixed accesses on top of
//! that anchor. A path whose boundary equals its length points directly at
//! the anchor, which is the only kind of handle that can trigger a
//! reallocation.
//!
//! # Examples
//!
//! ```rust
//! use rp_intern::Interner;
//! use rp_path::{ReferencePath, Segment, PathRelation, relation, can_invalidate};
//!
//! let interner = Interner::new();
//! let container = Segment::Name(interner.intern("container"));
//! let items = Segment::Name(interner.intern("items"));
//! let value = Segment::Name(interner.intern("value"));
//!
//! // container.items, where `items` is resizable
//! let list = ReferencePath::new(vec![container, items], 2, false);
//! // container.items[i].value
//! let element = ReferencePath::new(vec![container, items, Segment::Index, value], 2, false);
//!
//! assert_eq!(relation(&list, &element), PathRelation::Parent);
//! assert!(can_invalidate(&list, &element));
//! ```

mod path;
mod relation;
pub mod template;

pub use path::{PathDisplay, ReferencePath, Segment};
pub use relation::{PathRelation, can_alias, can_invalidate, has_resizable_access_since, relation};
pub use template::{PathTemplate, TemplateError};
