//! Declared path templates.
//!
//! A method returning a reference can declare how that reference is derived
//! from one of its parameters, as an ordered token list:
//!
//! | token    | meaning                                              |
//! |----------|------------------------------------------------------|
//! | `list`   | first token: the parameter the path is rooted at     |
//! | `items`  | a field / name segment                               |
//! | `[]`     | an element access                                    |
//! | `View()` | an opaque helper call                                |
//! | `!`      | the resizable anchor is the segment right before it  |
//!
//! `["self", "items", "!", "[]"]` reads "an element of the resizable
//! `items` field of the receiver".

use rp_intern::{Interner, Symbol};
use thiserror::Error;

use crate::path::Segment;

/// Token marking the resizable anchor.
pub const BOUNDARY_TOKEN: &str = "!";
/// Token for an element access.
pub const INDEX_TOKEN: &str = "[]";

/// Errors that reject a declared template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// No tokens at all
    #[error("path template is empty")]
    Empty,

    /// A token that is neither an identifier, `[]`, `name()` nor `!`
    #[error("invalid path template token `{token}`")]
    InvalidToken {
        /// The offending token
        token: String,
    },

    /// The root token is not a plain identifier
    #[error("path template must start with a parameter name, found `{token}`")]
    InvalidRoot {
        /// The offending token
        token: String,
    },

    /// The root names no parameter of the declaring method
    #[error("path template root `{root}` is not a parameter of the method")]
    UnknownRoot {
        /// The root token
        root: String,
    },

    /// More than one `!` marker
    #[error("path template declares more than one dynamic boundary")]
    DuplicateBoundary,
}

/// A validated template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    root: Symbol,
    root_index: usize,
    segments: Vec<Segment>,
    boundary: Option<usize>,
}

impl PathTemplate {
    /// Parses and validates `tokens` for a method with the given parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] describing the first problem found.
    pub fn parse<S: AsRef<str>>(
        tokens: &[S],
        params: &[Symbol],
        interner: &Interner,
    ) -> Result<Self, TemplateError> {
        let (root_token, rest) = tokens.split_first().ok_or(TemplateError::Empty)?;
        let root_token = root_token.as_ref();
        if !is_identifier(root_token) {
            return Err(TemplateError::InvalidRoot {
                token: root_token.to_string(),
            });
        }

        let root = interner
            .get(root_token)
            .and_then(|root| params.iter().position(|param| *param == root).map(|idx| (root, idx)));
        let Some((root, root_index)) = root else {
            return Err(TemplateError::UnknownRoot {
                root: root_token.to_string(),
            });
        };

        let mut segments = Vec::with_capacity(rest.len());
        let mut boundary = None;
        for token in rest {
            let token = token.as_ref();
            if token == BOUNDARY_TOKEN {
                if boundary.replace(segments.len()).is_some() {
                    return Err(TemplateError::DuplicateBoundary);
                }
            } else if token == INDEX_TOKEN {
                segments.push(Segment::Index);
            } else if let Some(call) = token.strip_suffix("()").filter(|call| is_identifier(call)) {
                segments.push(Segment::Call(interner.intern(call)));
            } else if is_identifier(token) {
                segments.push(Segment::Name(interner.intern(token)));
            } else {
                return Err(TemplateError::InvalidToken {
                    token: token.to_string(),
                });
            }
        }

        Ok(Self {
            root,
            root_index,
            segments,
            boundary,
        })
    }

    /// The parameter the template is rooted at.
    #[must_use]
    pub fn root(&self) -> Symbol {
        self.root
    }

    /// Argument position supplying the root.
    #[must_use]
    pub fn root_index(&self) -> usize {
        self.root_index
    }

    /// Segments after the placeholder root.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments (after the root) up to and including the resizable
    /// anchor, when the template declares one. `Some(0)` means the root
    /// itself is the anchor.
    #[must_use]
    pub fn boundary(&self) -> Option<usize> {
        self.boundary
    }

    /// Number of trailing segments that are fixed accesses on top of the
    /// anchor, or `None` when the template declares no anchor.
    #[must_use]
    pub fn fixed_suffix(&self) -> Option<usize> {
        self.boundary.map(|boundary| self.segments.len() - boundary)
    }
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}
