//! Reference safety findings.

use rp_span::FileSpan;
use thiserror::Error;

/// Result type for whole-body checks.
///
/// Checking can produce multiple findings, so all of them are collected.
pub type CheckResult<T> = Result<T, Vec<RefSafetyError>>;

/// A reference safety finding.
///
/// Paths are carried in their rendered form (`container.items![].value`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefSafetyError {
    /// A call may resize storage a live reference points into.
    #[error("call may invalidate a live reference")]
    InvalidatedReference {
        /// The call
        call_span: FileSpan,
        /// Called method
        method: String,
        /// Path of the argument that can resize
        mutator: String,
        /// The reference local that may dangle
        victim: String,
        /// Path of the location it refers to
        victim_path: String,
        /// Where the reference was bound
        binding_span: FileSpan,
    },

    /// Two by-reference arguments of a call may alias resizable storage.
    #[error("arguments may alias dynamically sized storage")]
    AliasedArguments {
        /// The call
        call_span: FileSpan,
        /// Called method
        method: String,
        /// Path of the first argument
        first: String,
        /// Path of the second argument
        second: String,
        /// Location of the second argument
        second_span: FileSpan,
    },

    /// A by-reference argument cannot be traced to a path.
    #[error("reference cannot be verified")]
    Unverifiable {
        /// The argument
        span: FileSpan,
        /// Why the path could not be built
        reason: String,
    },

    /// A reference obtained from a local access scope is returned.
    #[error("reference escapes its access scope")]
    EscapesLocalScope {
        /// The return statement
        return_span: FileSpan,
        /// Path of the returned reference
        path: String,
    },
}

impl RefSafetyError {
    /// Returns the primary source location for this finding.
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::InvalidatedReference { call_span, .. }
            | Self::AliasedArguments { call_span, .. } => *call_span,
            Self::Unverifiable { span, .. } => *span,
            Self::EscapesLocalScope { return_span, .. } => *return_span,
        }
    }

    /// Returns a detailed message explaining the finding.
    #[must_use]
    pub fn detailed_message(&self) -> String {
        match self {
            Self::InvalidatedReference {
                method,
                mutator,
                victim,
                victim_path,
                ..
            } => format!(
                "Calling `{method}` with `{mutator}` may resize it while `{victim}` still refers to `{victim_path}`"
            ),
            Self::AliasedArguments {
                method,
                first,
                second,
                ..
            } => format!(
                "Arguments `{first}` and `{second}` of `{method}` may refer to the same dynamically sized storage"
            ),
            Self::Unverifiable { reason, .. } => {
                format!("Cannot trace this reference to its origin: {reason}")
            }
            Self::EscapesLocalScope { path, .. } => {
                format!("Returning `{path}` lets a reference outlive the access scope it came from")
            }
        }
    }
}
