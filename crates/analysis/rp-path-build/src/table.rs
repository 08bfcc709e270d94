//! Declared path templates, keyed by method.

use rp_hir::{MethodId, ProgramDb};
use rp_path::{PathTemplate, TemplateError};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Errors raised while registering a template from outside the program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateTableError {
    /// No method has the given signature or name
    #[error("no method matches `{signature}`")]
    UnknownMethod {
        /// The requested signature
        signature: String,
    },

    /// The template itself is malformed
    #[error("invalid path template for `{signature}`: {source}")]
    Invalid {
        /// The method signature
        signature: String,
        /// Why the template was rejected
        #[source]
        source: TemplateError,
    },
}

/// Parsed path templates for the methods of a program.
///
/// A method maps to `Err` when its template was rejected; any path that
/// would splice through it then fails to build.
#[derive(Debug, Clone, Default)]
pub struct TemplateTable {
    entries: FxHashMap<MethodId, Result<PathTemplate, TemplateError>>,
}

impl TemplateTable {
    /// Parses the declared template of every method in `program`.
    #[must_use]
    pub fn build(program: &ProgramDb) -> Self {
        let mut table = Self::default();
        for (id, method) in program.methods.iter() {
            if let Some(tokens) = &method.declared_path {
                table.insert(program, id, tokens);
            }
        }
        table
    }

    /// Registers `tokens` as the template of the method with `signature`,
    /// replacing any declared template.
    ///
    /// # Errors
    ///
    /// Fails if no method matches `signature` or the template is malformed.
    /// A malformed template is still recorded as rejected.
    pub fn declare(
        &mut self,
        program: &ProgramDb,
        signature: &str,
        tokens: &[String],
    ) -> Result<MethodId, TemplateTableError> {
        let method = program
            .method_by_signature(signature)
            .ok_or_else(|| TemplateTableError::UnknownMethod {
                signature: signature.to_string(),
            })?;

        self.insert(program, method, tokens);
        match &self.entries[&method] {
            Ok(_) => Ok(method),
            Err(source) => Err(TemplateTableError::Invalid {
                signature: signature.to_string(),
                source: source.clone(),
            }),
        }
    }

    /// The template registered for `method`, if any.
    #[must_use]
    pub fn get(&self, method: MethodId) -> Option<&Result<PathTemplate, TemplateError>> {
        self.entries.get(&method)
    }

    /// Number of registered methods, rejected templates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no template is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses and records the template of `method`, logging a rejection.
    fn insert(
        &mut self,
        program: &ProgramDb,
        method: MethodId,
        tokens: &[String],
    ) {
        let def = &program.methods[method];
        let parsed = PathTemplate::parse(tokens, &def.params, &program.interner);
        if let Err(err) = &parsed {
            tracing::warn!(method = %def.signature, %err, "rejected path template");
        }
        self.entries.insert(method, parsed);
    }
}
