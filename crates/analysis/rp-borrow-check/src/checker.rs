//! Main reference safety checking implementation.

use rp_hir::visitor::{BodyVisitor, walk_body, walk_expr, walk_stmt};
use rp_hir::{ArgMode, Body, Expr, ExprId, MethodId, MethodKind, ProgramDb, Stmt, StmtId};
use rp_lifetime::LifetimeScanner;
use rp_path::{ReferencePath, can_alias, can_invalidate};
use rp_path_build::{PathBuilder, TemplateTable};
use rp_resolve::BindingIndex;

use crate::error::{CheckResult, RefSafetyError};

/// Reference safety checker for one method body.
///
/// The checker never mutates the program; every query builds the paths it
/// needs on demand from the shared binding index.
#[derive(Debug, Clone, Copy)]
pub struct RefSafetyChecker<'a> {
    builder: PathBuilder<'a>,
    scanner: LifetimeScanner<'a>,
}

impl<'a> RefSafetyChecker<'a> {
    /// Creates a checker over the body `builder` works on.
    #[must_use]
    pub fn new(builder: PathBuilder<'a>) -> Self {
        Self {
            builder,
            scanner: LifetimeScanner::new(builder),
        }
    }

    /// Runs every check over a body with default settings.
    ///
    /// # Errors
    ///
    /// Returns all findings of the body, in source order.
    pub fn check(program: &ProgramDb, templates: &TemplateTable, body: &Body) -> CheckResult<()> {
        let index = BindingIndex::build(body);
        let checker = RefSafetyChecker::new(PathBuilder::new(program, body, &index, templates));
        let findings = checker.check_body();

        if findings.is_empty() {
            Ok(())
        } else {
            Err(findings)
        }
    }

    /// The path builder used by the checks.
    #[must_use]
    pub fn builder(&self) -> PathBuilder<'a> {
        self.builder
    }

    /// Checks every call and return of the body, in source order.
    #[must_use]
    pub fn check_body(&self) -> Vec<RefSafetyError> {
        let body = self.builder.body();
        let mut sites = SiteCollector::default();
        walk_body(&mut sites, body);

        let mut findings = Vec::new();
        for site in sites.sites {
            match site {
                Site::Call(call) => findings.extend(self.check_call(call)),
                Site::Return(stmt) => findings.extend(self.check_return(stmt)),
            }
        }

        tracing::debug!(
            method = %self.builder.program().methods[body.method].signature,
            findings = findings.len(),
            "checked body"
        );
        findings
    }

    /// Checks one call expression.
    ///
    /// Every by-reference argument is traced to a path. An argument pointing
    /// directly at a resizable anchor may resize it, so it is checked against
    /// every reference live at the call. Every pair of by-reference arguments
    /// is checked for aliasing.
    #[must_use]
    pub fn check_call(&self, call: ExprId) -> Vec<RefSafetyError> {
        let body = self.builder.body();
        let program = self.builder.program();
        let Expr::Call {
            method, args, span, ..
        } = &body.exprs[call]
        else {
            return Vec::new();
        };
        let signature = &program.methods[*method].signature;

        let mut findings = Vec::new();
        let mut paths: Vec<(ExprId, ReferencePath)> = Vec::new();
        for arg in args.iter().filter(|arg| arg.mode == ArgMode::Ref) {
            match self.builder.try_build(arg.expr, None) {
                Ok(path) => paths.push((arg.expr, path)),
                Err(failure) => findings.push(RefSafetyError::Unverifiable {
                    span: body.exprs[arg.expr].span(),
                    reason: failure.to_string(),
                }),
            }
        }

        if !self.is_reference_helper(*method) {
            let mutators: Vec<&ReferencePath> = paths
                .iter()
                .map(|(_, path)| path)
                .filter(|path| path.points_to_dyn_sized())
                .collect();
            if !mutators.is_empty() {
                let live = self.scanner.live_at_expr(call);
                for mutator in mutators {
                    for binding in live.iter().filter(|binding| can_invalidate(mutator, &binding.path)) {
                        findings.push(RefSafetyError::InvalidatedReference {
                            call_span: *span,
                            method: signature.clone(),
                            mutator: self.render(mutator),
                            victim: program.name(binding.name).to_string(),
                            victim_path: self.render(&binding.path),
                            binding_span: binding.binding.span,
                        });
                    }
                }
            }
        }

        for (idx, (_, first)) in paths.iter().enumerate() {
            for (second_expr, second) in &paths[idx + 1..] {
                if can_alias(first, second) || can_alias(second, first) {
                    findings.push(RefSafetyError::AliasedArguments {
                        call_span: *span,
                        method: signature.clone(),
                        first: self.render(first),
                        second: self.render(second),
                        second_span: body.exprs[*second_expr].span(),
                    });
                }
            }
        }

        findings
    }

    /// Checks one return statement for a reference escaping its access
    /// scope.
    #[must_use]
    pub fn check_return(&self, stmt: StmtId) -> Option<RefSafetyError> {
        let body = self.builder.body();
        let Stmt::Return {
            value: Some(value),
            span,
        } = &body.stmts[stmt]
        else {
            return None;
        };
        if !self.builder.program().methods[body.method].returns_ref {
            return None;
        }

        let path = self.builder.build(*value, None);
        path.derived_from_local_scope()
            .then(|| RefSafetyError::EscapesLocalScope {
                return_span: *span,
                path: self.render(&path),
            })
    }

    /// Whether `expr` is dynamically sized itself, or is reached through a
    /// resizable anchor.
    #[must_use]
    pub fn references_dyn_sized(&self, expr: ExprId) -> bool {
        let program = self.builder.program();
        let own_type = self
            .builder
            .body()
            .expr_ty(expr)
            .is_some_and(|ty| program.is_dyn_sized(ty));
        own_type || self.builder.build(expr, None).crosses_dyn_sized()
    }

    /// Whether `expr` can be traced to a reference path at all.
    #[must_use]
    pub fn is_traceable(&self, expr: ExprId) -> bool {
        self.builder.try_build(expr, None).is_ok()
    }

    /// Helpers that hand out references into their arguments never resize
    /// them.
    fn is_reference_helper(&self, method: MethodId) -> bool {
        self.builder.program().methods[method].kind != MethodKind::Opaque
            || self.builder.templates().get(method).is_some()
    }

    fn render(&self, path: &ReferencePath) -> String {
        path.display(&self.builder.program().interner).to_string()
    }
}

enum Site {
    Call(ExprId),
    Return(StmtId),
}

#[derive(Default)]
struct SiteCollector {
    sites: Vec<Site>,
}

impl BodyVisitor for SiteCollector {
    fn visit_stmt(&mut self, body: &Body, stmt: StmtId) {
        if matches!(body.stmts[stmt], Stmt::Return { .. }) {
            self.sites.push(Site::Return(stmt));
        }
        walk_stmt(self, body, stmt);
    }

    fn visit_expr(&mut self, body: &Body, expr: ExprId) {
        if matches!(body.exprs[expr], Expr::Call { .. }) {
            self.sites.push(Site::Call(expr));
        }
        walk_expr(self, body, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rp_hir::surface::{
        ArgDoc, ExprDoc, LocalDoc, MethodDoc, ParamDoc, ProgramDoc, StmtDoc, TypeDoc,
    };
    use rp_hir::{LocalKind, lower_program};

    fn program(body: Vec<StmtDoc>, returns_ref: bool) -> ProgramDb {
        let doc = ProgramDoc {
            types: vec![
                TypeDoc::new("List", true),
                TypeDoc::new("Item", false),
                TypeDoc::new("Scope", false),
            ],
            methods: vec![
                MethodDoc {
                    name: "Get".to_string(),
                    params: vec![ParamDoc::new("list", Some("List"), true)],
                    kind: MethodKind::ElementAccessor,
                    returns_ref: true,
                    ..MethodDoc::default()
                },
                MethodDoc {
                    name: "Add".to_string(),
                    params: vec![ParamDoc::new("list", Some("List"), true)],
                    ..MethodDoc::default()
                },
                MethodDoc {
                    name: "Swap".to_string(),
                    params: vec![
                        ParamDoc::new("a", Some("List"), true),
                        ParamDoc::new("b", Some("List"), true),
                    ],
                    ..MethodDoc::default()
                },
                MethodDoc {
                    name: "Fill".to_string(),
                    ..MethodDoc::default()
                },
                MethodDoc {
                    name: "run".to_string(),
                    returns_ref,
                    locals: vec![
                        LocalDoc::new("list", Some("List"), LocalKind::Value),
                        LocalDoc::new("other", Some("List"), LocalKind::Value),
                        LocalDoc::new("r", Some("Item"), LocalKind::Ref),
                        LocalDoc::new("ext", Some("List"), LocalKind::Ref),
                        LocalDoc::new("scope", Some("Scope"), LocalKind::ScopeHandle),
                    ],
                    body: Some(body),
                    ..MethodDoc::default()
                },
            ],
            ..ProgramDoc::default()
        };
        lower_program(&doc).expect("lowering succeeds")
    }

    fn check(program: &ProgramDb) -> Vec<RefSafetyError> {
        let templates = TemplateTable::build(program);
        let body = program.body_named("run").expect("body");
        match RefSafetyChecker::check(program, &templates, body) {
            Ok(()) => Vec::new(),
            Err(findings) => findings,
        }
    }

    fn get() -> ExprDoc {
        ExprDoc::call("Get", vec![ArgDoc::by_ref(ExprDoc::name("list"))], Some("Item"))
    }

    fn call(method: &str, args: &[&str]) -> StmtDoc {
        StmtDoc::expr(ExprDoc::call(
            method,
            args.iter().map(|name| ArgDoc::by_ref(ExprDoc::name(name))).collect(),
            None,
        ))
    }

    #[test]
    fn test_resize_invalidates_live_reference() {
        let program = program(
            vec![
                StmtDoc::let_("r", get()),
                call("Add", &["list"]),
                StmtDoc::expr(ExprDoc::name("r").field("value")),
            ],
            false,
        );
        let findings = check(&program);
        assert_eq!(findings.len(), 1);
        let RefSafetyError::InvalidatedReference {
            method,
            mutator,
            victim,
            victim_path,
            ..
        } = &findings[0]
        else {
            panic!("expected an invalidation, got {findings:?}");
        };
        assert_eq!(method, "Add");
        assert_eq!(mutator, "list!");
        assert_eq!(victim, "r");
        assert_eq!(victim_path, "list![]");
    }

    #[test]
    fn test_unrelated_container_is_fine() {
        let program = program(
            vec![
                StmtDoc::let_("r", get()),
                call("Add", &["other"]),
                StmtDoc::expr(ExprDoc::name("r").field("value")),
            ],
            false,
        );
        assert!(check(&program).is_empty());
    }

    #[test]
    fn test_accessor_calls_do_not_resize() {
        let program = program(
            vec![
                StmtDoc::let_("r", get()),
                StmtDoc::expr(get()),
                StmtDoc::expr(ExprDoc::name("r").field("value")),
            ],
            false,
        );
        assert!(check(&program).is_empty());
    }

    #[test]
    fn test_aliased_arguments() {
        let program = program(
            vec![call("Swap", &["list", "list"]), call("Swap", &["list", "other"])],
            false,
        );
        let findings = check(&program);
        assert_eq!(findings.len(), 1);
        assert!(matches!(
            &findings[0],
            RefSafetyError::AliasedArguments { first, second, .. } if first == "list!" && second == "list!"
        ));
    }

    #[test]
    fn test_out_bound_argument_is_unverifiable() {
        let program = program(
            vec![
                StmtDoc::expr(ExprDoc::call("Fill", vec![ArgDoc::out("ext")], None)),
                call("Add", &["ext"]),
            ],
            false,
        );
        let findings = check(&program);
        assert_eq!(findings.len(), 1);
        assert!(matches!(findings[0], RefSafetyError::Unverifiable { .. }));
    }

    #[test]
    fn test_scoped_reference_escape() {
        let escaping = program(
            vec![StmtDoc::ret(
                ExprDoc::name("scope").scope_value(Some("Item")).field("value"),
            )],
            true,
        );
        let findings = check(&escaping);
        assert_eq!(
            findings.iter().map(RefSafetyError::detailed_message).collect::<Vec<_>>(),
            vec!["Returning `scope.value` lets a reference outlive the access scope it came from"]
        );

        let not_ref = program(
            vec![StmtDoc::ret(ExprDoc::name("scope").scope_value(Some("Item")))],
            false,
        );
        assert!(check(&not_ref).is_empty());
    }

    #[test]
    fn test_queries() {
        let program = program(
            vec![
                StmtDoc::let_("r", get()),
                StmtDoc::expr(ExprDoc::name("r").field("value")),
                StmtDoc::expr(ExprDoc::opaque(Vec::new())),
            ],
            false,
        );
        let body = program.body_named("run").expect("body");
        let index = BindingIndex::build(body);
        let templates = TemplateTable::build(&program);
        let checker = RefSafetyChecker::new(PathBuilder::new(&program, body, &index, &templates));

        let field = body
            .exprs
            .iter()
            .find(|(_, expr)| matches!(expr, Expr::Field { .. }))
            .map(|(id, _)| id)
            .expect("field");
        let opaque = body
            .exprs
            .iter()
            .find(|(_, expr)| matches!(expr, Expr::Opaque { .. }))
            .map(|(id, _)| id)
            .expect("opaque");

        assert!(checker.is_traceable(field));
        assert!(checker.references_dyn_sized(field));
        assert!(!checker.is_traceable(opaque));
        assert!(!checker.references_dyn_sized(opaque));
    }
}
