//! Reference variable resolution.
//!
//! A single upfront pass over a method body records every binding event of
//! every local (declarations with an initializer, loop-iteration bindings,
//! by-reference reassignments and out-arguments of calls) together with every
//! use, in source order. The resulting [`BindingIndex`] is immutable and is
//! shared by the [`Resolver`] and the lifetime scanner.
//!
//! ```rust,ignore
//! let index = BindingIndex::build(body);
//! let resolver = Resolver::new(body, &index);
//! if let Some(binding) = resolver.resolve(expr) {
//!     // continue the path walk from `binding.producer`
//! }
//! ```

mod binding;
mod resolver;

pub use binding::{BindingEvent, BindingIndex, BindingKind, ReferenceVariableBinding};
pub use resolver::Resolver;
