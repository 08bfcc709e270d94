//! Reference safety checks for the refpath analysis.
//!
//! This crate is the rule-facing surface of the analysis: it combines the
//! path builder, the lifetime scanner and the relation engine to decide
//! whether a call could invalidate a live reference, whether two arguments
//! of a call could alias resizable storage, and whether a reference escapes
//! the access scope it was obtained from.
//!
//! # Architecture
//!
//! - [`RefSafetyChecker`]: runs the checks over single calls, returns or a
//!   whole body
//! - [`RefSafetyError`]: one finding, with its primary span
//!
//! # Limitations
//!
//! The checks inherit the approximations of the layers below them:
//! - Liveness is position based, see `rp-lifetime`
//! - Calls are only understood through recognized helper kinds and declared
//!   path templates
//! - Unrepresentable references are skipped by the invalidation and
//!   aliasing checks and reported separately as unverifiable
//!
//! # Examples
//!
//! ```rust,ignore
//! use rp_borrow_check::RefSafetyChecker;
//!
//! let result = RefSafetyChecker::check(&program, &templates, body);
//! ```

mod checker;
mod error;

pub use checker::RefSafetyChecker;
pub use error::{CheckResult, RefSafetyError};
