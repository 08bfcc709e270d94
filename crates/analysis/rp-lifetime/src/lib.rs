//! Approximate liveness of reference locals.
//!
//! This crate answers one question for the safety checks: which reference
//! locals could still be used after a given program point? The answer is a
//! single-pass, position-based approximation rather than a dataflow fixpoint.
//!
//! # Architecture
//!
//! - [`LivenessWindow`]: the source range a binding is assumed valid for
//! - [`LifetimeScanner`]: walks the binding events of a body and reports the
//!   bindings whose window spans a query point, as [`LiveBinding`]s
//!
//! # Limitations
//!
//! - Windows grow to the last use seen in source order, so a use in an
//!   earlier branch extends a window exactly like one on the same path
//! - Loop-carried uses are not modelled beyond the loop-item window
//! - A binding stays live up to the point it is rebound, used or not

mod scanner;
mod window;

pub use scanner::{LifetimeScanner, LiveBinding};
pub use window::LivenessWindow;
