//! The backward path walk.
//!
//! Starting from a reference-valued expression the builder repeatedly looks
//! at the current node, prepends whatever segment it contributes and moves on
//! to the node the reference was derived from, until it reaches a root (a
//! parameter, a value local or a static field). Segments are discovered leaf
//! first, which is also the order the dynamic-boundary bookkeeping needs.

use rp_hir::{Body, Expr, ExprId, LocalId, LocalKind, MethodId, MethodKind, ProgramDb, TypeId};
use rp_path::{PathTemplate, ReferencePath, Segment};
use rp_resolve::{BindingIndex, BindingKind, ReferenceVariableBinding, Resolver};
use thiserror::Error;

use crate::table::TemplateTable;

/// Default bound on the number of nodes a single walk may visit.
pub const DEFAULT_MAX_WALK_STEPS: usize = 256;

/// Why an expression could not be turned into a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildFailure {
    /// A reference local has no binding before the use
    #[error("reference local is not bound before this use")]
    Unresolved {
        /// The local
        local: LocalId,
    },

    /// A reference local was assigned through an out-argument
    #[error("reference local was bound by an out-argument")]
    OpaqueBinding {
        /// The local
        local: LocalId,
    },

    /// An expression shape no reference can be traced through
    #[error("expression cannot be traced")]
    UnsupportedExpr {
        /// The expression
        expr: ExprId,
    },

    /// A call to a method with no recognized kind and no template
    #[error("call to `{method}` is not modelled")]
    UnmodeledCall {
        /// Method signature
        method: String,
    },

    /// A call to a method whose template was rejected
    #[error("path template of `{method}` was rejected")]
    RejectedTemplate {
        /// Method signature
        method: String,
    },

    /// A call without the argument a helper or template is rooted at
    #[error("call to `{method}` has no argument {index}")]
    MissingArgument {
        /// Method signature
        method: String,
        /// Expected argument position
        index: usize,
    },

    /// The walk did not reach a root within the configured bound
    #[error("path walk exceeded {limit} steps")]
    StepLimit {
        /// The configured bound
        limit: usize,
    },
}

/// Builds reference paths for expressions of one body.
#[derive(Debug, Clone, Copy)]
pub struct PathBuilder<'a> {
    program: &'a ProgramDb,
    body: &'a Body,
    resolver: Resolver<'a>,
    templates: &'a TemplateTable,
    max_walk_steps: usize,
}

impl<'a> PathBuilder<'a> {
    /// Creates a builder over a body and its prebuilt binding index.
    #[must_use]
    pub fn new(
        program: &'a ProgramDb,
        body: &'a Body,
        index: &'a BindingIndex,
        templates: &'a TemplateTable,
    ) -> Self {
        Self {
            program,
            body,
            resolver: Resolver::new(body, index),
            templates,
            max_walk_steps: DEFAULT_MAX_WALK_STEPS,
        }
    }

    /// Overrides the walk bound.
    #[must_use]
    pub fn with_max_walk_steps(mut self, max_walk_steps: usize) -> Self {
        self.max_walk_steps = max_walk_steps;
        self
    }

    /// The program being analysed.
    #[must_use]
    pub fn program(&self) -> &'a ProgramDb {
        self.program
    }

    /// The body being analysed.
    #[must_use]
    pub fn body(&self) -> &'a Body {
        self.body
    }

    /// The template table calls are resolved against.
    #[must_use]
    pub fn templates(&self) -> &'a TemplateTable {
        self.templates
    }

    /// The resolver used for reference locals.
    #[must_use]
    pub fn resolver(&self) -> Resolver<'a> {
        self.resolver
    }

    /// Builds the path of `expr`, or the not-representable sentinel.
    ///
    /// With `implicit_index_type` the path describes an element of `expr`
    /// (of that type) rather than `expr` itself.
    #[must_use]
    pub fn build(&self, expr: ExprId, implicit_index_type: Option<TypeId>) -> ReferencePath {
        match self.try_build(expr, implicit_index_type) {
            Ok(path) => path,
            Err(failure) => {
                tracing::debug!(?expr, %failure, "reference path is not representable");
                ReferencePath::not_representable()
            }
        }
    }

    /// Like [`PathBuilder::build`], reporting why a path could not be built.
    ///
    /// # Errors
    ///
    /// Returns the [`BuildFailure`] that stopped the walk.
    pub fn try_build(
        &self,
        expr: ExprId,
        implicit_index_type: Option<TypeId>,
    ) -> Result<ReferencePath, BuildFailure> {
        let mut walk = Walk::default();
        if let Some(ty) = implicit_index_type {
            walk.push(Segment::Index, self.program.is_dyn_sized(ty));
        }

        let mut current = expr;
        let mut steps = 0;
        loop {
            steps += 1;
            if steps > self.max_walk_steps {
                return Err(BuildFailure::StepLimit {
                    limit: self.max_walk_steps,
                });
            }

            tracing::trace!(expr = ?current, segments = walk.len(), "path walk step");
            match self.step(current, &mut walk)? {
                Step::Continue(next) => current = next,
                Step::Root => return Ok(walk.finish()),
            }
        }
    }

    /// Builds the path of the location a binding refers to, or the
    /// not-representable sentinel.
    #[must_use]
    pub fn build_binding(&self, binding: &ReferenceVariableBinding) -> ReferencePath {
        match self.try_build_binding(binding) {
            Ok(path) => path,
            Err(failure) => {
                tracing::debug!(local = ?binding.local, %failure, "binding path is not representable");
                ReferencePath::not_representable()
            }
        }
    }

    /// Like [`PathBuilder::build_binding`], reporting why a path could not be
    /// built.
    ///
    /// # Errors
    ///
    /// Returns the [`BuildFailure`] that stopped the walk.
    pub fn try_build_binding(
        &self,
        binding: &ReferenceVariableBinding,
    ) -> Result<ReferencePath, BuildFailure> {
        match binding.kind {
            BindingKind::OpaqueExternal => Err(BuildFailure::OpaqueBinding {
                local: binding.local,
            }),
            BindingKind::LoopItem { .. } => {
                let item_ty = self.body.locals[binding.local].ty;
                self.try_build(binding.producer, Some(item_ty))
            }
            BindingKind::Ordinary => self.try_build(binding.producer, None),
        }
    }

    fn step(&self, expr: ExprId, walk: &mut Walk) -> Result<Step, BuildFailure> {
        match &self.body.exprs[expr] {
            Expr::Local { local, .. } => self.step_local(expr, *local, walk),
            Expr::Param { param, .. } => {
                let decl = &self.body.params[*param];
                walk.push(Segment::Name(decl.name), self.program.is_dyn_sized(decl.ty));
                Ok(Step::Root)
            }
            Expr::Field {
                receiver, name, ty, ..
            } => {
                walk.push(Segment::Name(*name), self.program.is_dyn_sized(*ty));
                Ok(receiver.map_or(Step::Root, Step::Continue))
            }
            Expr::Index { receiver, ty, .. } => {
                walk.push(Segment::Index, self.program.is_dyn_sized(*ty));
                Ok(Step::Continue(*receiver))
            }
            Expr::Slice { receiver, .. } => Ok(Step::Continue(*receiver)),
            Expr::ScopeValue { scope, .. } => Ok(Step::Continue(*scope)),
            Expr::Call {
                method, args, ty, ..
            } => self.step_call(*method, args, *ty, walk),
            Expr::Literal { .. } | Expr::Opaque { .. } => {
                Err(BuildFailure::UnsupportedExpr { expr })
            }
        }
    }

    fn step_local(&self, expr: ExprId, local: LocalId, walk: &mut Walk) -> Result<Step, BuildFailure> {
        let decl = &self.body.locals[local];
        match decl.kind {
            LocalKind::Value => {
                walk.push(Segment::Name(decl.name), self.program.is_dyn_sized(decl.ty));
                Ok(Step::Root)
            }
            LocalKind::ScopeHandle => {
                walk.push(Segment::Name(decl.name), self.program.is_dyn_sized(decl.ty));
                walk.derived_from_local_scope = true;
                Ok(Step::Root)
            }
            LocalKind::Ref => {
                let binding = self
                    .resolver
                    .resolve(expr)
                    .ok_or(BuildFailure::Unresolved { local })?;
                match binding.kind {
                    BindingKind::OpaqueExternal => Err(BuildFailure::OpaqueBinding { local }),
                    BindingKind::LoopItem { .. } => {
                        walk.push(Segment::Index, self.program.is_dyn_sized(decl.ty));
                        Ok(Step::Continue(binding.producer))
                    }
                    BindingKind::Ordinary => Ok(Step::Continue(binding.producer)),
                }
            }
        }
    }

    fn step_call(
        &self,
        method: MethodId,
        args: &[rp_hir::Arg],
        ty: TypeId,
        walk: &mut Walk,
    ) -> Result<Step, BuildFailure> {
        let def = &self.program.methods[method];
        let argument = |index: usize| {
            args.get(index)
                .map(|arg| Step::Continue(arg.expr))
                .ok_or_else(|| BuildFailure::MissingArgument {
                    method: def.signature.clone(),
                    index,
                })
        };

        match def.kind {
            MethodKind::ElementAccessor => {
                walk.push(Segment::Index, self.program.is_dyn_sized(ty));
                return argument(0);
            }
            MethodKind::ViewConversion => {
                walk.push(Segment::Call(def.name), self.program.is_dyn_sized(ty));
                return argument(0);
            }
            MethodKind::Slice | MethodKind::Opaque => {}
        }

        match self.templates.get(method) {
            Some(Ok(template)) => {
                // Check the argument before splicing so a failure leaves the
                // walk untouched.
                let next = argument(template.root_index())?;
                walk.splice(template);
                Ok(next)
            }
            Some(Err(_)) => Err(BuildFailure::RejectedTemplate {
                method: def.signature.clone(),
            }),
            None if def.kind == MethodKind::Slice => argument(0),
            None => Err(BuildFailure::UnmodeledCall {
                method: def.signature.clone(),
            }),
        }
    }
}

enum Step {
    Continue(ExprId),
    Root,
}

/// Segments discovered so far (leaf first) and the boundary bookkeeping.
#[derive(Default)]
struct Walk {
    reversed: Vec<Segment>,
    fixed_suffix: usize,
    closed: bool,
    derived_from_local_scope: bool,
}

impl Walk {
    fn len(&self) -> usize {
        self.reversed.len()
    }

    fn push(&mut self, segment: Segment, dyn_sized: bool) {
        self.reversed.push(segment);
        if !self.closed {
            if dyn_sized {
                self.closed = true;
            } else {
                self.fixed_suffix += 1;
            }
        }
    }

    fn splice(&mut self, template: &PathTemplate) {
        self.reversed.extend(template.segments().iter().rev().copied());
        if !self.closed {
            match template.fixed_suffix() {
                Some(fixed) => {
                    self.fixed_suffix += fixed;
                    self.closed = true;
                }
                None => self.fixed_suffix += template.segments().len(),
            }
        }
    }

    fn finish(mut self) -> ReferencePath {
        self.reversed.reverse();
        let boundary = self.reversed.len() - self.fixed_suffix;
        ReferencePath::new(self.reversed, boundary, self.derived_from_local_scope)
    }
}
