//! Resolution of local reference uses to their binding.

use rp_hir::{Body, Expr, ExprId, LocalId};

use crate::binding::{BindingIndex, ReferenceVariableBinding};

/// Looks up the binding a local reference use observes.
///
/// Resolution is purely positional: the binding that takes effect last
/// before the use wins, regardless of which branch of a conditional it sits
/// in.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    body: &'a Body,
    index: &'a BindingIndex,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over a prebuilt index of `body`.
    #[must_use]
    pub fn new(body: &'a Body, index: &'a BindingIndex) -> Self {
        Self { body, index }
    }

    /// The body being resolved against.
    #[must_use]
    pub fn body(&self) -> &'a Body {
        self.body
    }

    /// The binding index being resolved against.
    #[must_use]
    pub fn index(&self) -> &'a BindingIndex {
        self.index
    }

    /// Resolves a local-variable expression to the binding it reads.
    ///
    /// Returns `None` if `expr` does not name a local, or if no binding of it
    /// completes before the expression starts.
    #[must_use]
    pub fn resolve(&self, expr: ExprId) -> Option<&'a ReferenceVariableBinding> {
        let Expr::Local { local, span } = &self.body.exprs[expr] else {
            return None;
        };
        let binding = self.resolve_at(*local, span.start());
        if binding.is_none() {
            tracing::debug!(?local, at = span.start(), "no binding reaches local use");
        }
        binding
    }

    /// The last binding of `local` in effect at offset `at`.
    #[must_use]
    pub fn resolve_at(&self, local: LocalId, at: u32) -> Option<&'a ReferenceVariableBinding> {
        self.index
            .bindings_of(local)
            .rev()
            .find(|binding| binding.position <= at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BindingKind;
    use rp_hir::surface::{ArgDoc, ExprDoc, LocalDoc, MethodDoc, ProgramDoc, StmtDoc, TypeDoc};
    use rp_hir::{LocalKind, ProgramDb, lower_program};

    fn lower(locals: Vec<LocalDoc>, body: Vec<StmtDoc>) -> ProgramDb {
        let doc = ProgramDoc {
            types: vec![TypeDoc::new("List", true)],
            methods: vec![
                MethodDoc {
                    name: "Fill".to_string(),
                    ..MethodDoc::default()
                },
                MethodDoc {
                    name: "run".to_string(),
                    locals,
                    body: Some(body),
                    ..MethodDoc::default()
                },
            ],
            ..ProgramDoc::default()
        };
        lower_program(&doc).expect("lowering succeeds")
    }

    fn local(program: &ProgramDb, body: &Body, name: &str) -> LocalId {
        body.local_named(program.interner.intern(name))
            .expect("local exists")
    }

    #[test]
    fn test_last_binding_before_use_wins() {
        let program = lower(
            vec![
                LocalDoc::new("c", None, LocalKind::Value),
                LocalDoc::new("r", None, LocalKind::Ref),
            ],
            vec![
                StmtDoc::let_("r", ExprDoc::name("c").field("a")),
                StmtDoc::ref_assign("r", ExprDoc::name("r").field("b")),
                StmtDoc::expr(ExprDoc::name("r")),
            ],
        );
        let body = program.body_named("run").expect("body");
        let index = BindingIndex::build(body);
        let resolver = Resolver::new(body, &index);
        let r = local(&program, body, "r");

        let uses: Vec<ExprId> = index.uses_of(r).collect();
        assert_eq!(uses.len(), 2);

        // `r` on the right of `r = ref r.b` still sees the declaration.
        let inner = resolver.resolve(uses[0]).expect("resolves");
        assert!(matches!(
            body.exprs[inner.producer],
            Expr::Field { receiver: Some(receiver), .. } if body.as_local(receiver).is_some()
        ));
        let first_binding = index.bindings_of(r).next().expect("binding");
        assert_eq!(inner, first_binding);

        let last = resolver.resolve(uses[1]).expect("resolves");
        let last_binding = index.bindings_of(r).next_back().expect("binding");
        assert_eq!(last, last_binding);
        assert_ne!(inner, last);
    }

    #[test]
    fn test_use_before_binding_is_unresolved() {
        let program = lower(
            vec![LocalDoc::new("r", None, LocalKind::Ref)],
            vec![
                StmtDoc::expr(ExprDoc::name("r")),
                StmtDoc::let_("r", ExprDoc::Literal),
            ],
        );
        let body = program.body_named("run").expect("body");
        let index = BindingIndex::build(body);
        let resolver = Resolver::new(body, &index);
        let r = local(&program, body, "r");

        let first_use = index.uses_of(r).next().expect("use");
        assert!(resolver.resolve(first_use).is_none());
    }

    #[test]
    fn test_out_argument_binding_is_opaque() {
        let program = lower(
            vec![LocalDoc::new("r", None, LocalKind::Ref)],
            vec![
                StmtDoc::expr(ExprDoc::call("Fill", vec![ArgDoc::out("r")], None)),
                StmtDoc::expr(ExprDoc::name("r")),
            ],
        );
        let body = program.body_named("run").expect("body");
        let index = BindingIndex::build(body);
        let resolver = Resolver::new(body, &index);
        let r = local(&program, body, "r");

        let read = index.uses_of(r).next().expect("use");
        let binding = resolver.resolve(read).expect("resolves");
        assert_eq!(binding.kind, BindingKind::OpaqueExternal);
        assert_eq!(body.as_local(binding.producer), Some(r));
    }

    #[test]
    fn test_non_local_expression_is_unresolved() {
        let program = lower(
            vec![LocalDoc::new("c", None, LocalKind::Value)],
            vec![StmtDoc::expr(ExprDoc::name("c").field("a"))],
        );
        let body = program.body_named("run").expect("body");
        let index = BindingIndex::build(body);
        let resolver = Resolver::new(body, &index);

        let field = body
            .exprs
            .iter()
            .find(|(_, expr)| matches!(expr, Expr::Field { .. }))
            .map(|(id, _)| id)
            .expect("field expression");
        assert!(resolver.resolve(field).is_none());
    }
}
