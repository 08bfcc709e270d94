//! Construction of [`ReferencePath`](rp_path::ReferencePath)s from method
//! bodies.
//!
//! - [`TemplateTable`]: declared path templates of every method, parsed once
//!   before any analysis runs
//! - [`PathBuilder`]: the backward walk from a reference-valued expression to
//!   its root

mod builder;
mod table;

pub use builder::{BuildFailure, DEFAULT_MAX_WALK_STEPS, PathBuilder};
pub use table::{TemplateTable, TemplateTableError};
