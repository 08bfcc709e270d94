//! The lifetime scanner.

use indexmap::IndexMap;
use rp_hir::{ExprId, LocalId};
use rp_intern::Symbol;
use rp_path::ReferencePath;
use rp_path_build::PathBuilder;
use rp_resolve::{BindingEvent, BindingKind, ReferenceVariableBinding};

use crate::window::LivenessWindow;

/// A reference binding whose window spans the query point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveBinding {
    /// The bound local
    pub local: LocalId,
    /// Name of the local
    pub name: Symbol,
    /// The binding
    pub binding: ReferenceVariableBinding,
    /// Its window when it was emitted
    pub window: LivenessWindow,
    /// Path of the referenced location; always representable
    pub path: ReferencePath,
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    binding: ReferenceVariableBinding,
    window: LivenessWindow,
}

/// Finds the reference locals live at a program point.
#[derive(Debug, Clone, Copy)]
pub struct LifetimeScanner<'a> {
    builder: PathBuilder<'a>,
}

impl<'a> LifetimeScanner<'a> {
    /// Creates a scanner over the body `builder` works on.
    #[must_use]
    pub fn new(builder: PathBuilder<'a>) -> Self {
        Self { builder }
    }

    /// Live reference bindings at the start of `expr`.
    #[must_use]
    pub fn live_at_expr(&self, expr: ExprId) -> Vec<LiveBinding> {
        let at = self.builder.body().exprs[expr].span().start();
        self.live_bindings_at(at)
    }

    /// Live reference bindings at source offset `at`, in the order they were
    /// found.
    ///
    /// Bindings whose path cannot be built are left out.
    #[must_use]
    pub fn live_bindings_at(&self, at: u32) -> Vec<LiveBinding> {
        let body = self.builder.body();
        let index = self.builder.resolver().index();

        let mut tracked: IndexMap<LocalId, Tracked> = IndexMap::new();
        let mut live = Vec::new();

        for event in index.events() {
            let local = event.local();
            if !body.locals[local].is_ref() {
                continue;
            }

            match event {
                BindingEvent::Bind(binding) => {
                    if let Some(mut old) = tracked.shift_remove(&local) {
                        if !old.binding.is_loop_item() {
                            let value_start = body.exprs[binding.producer].span().start();
                            old.window.close_at(value_start);
                        }
                        if old.window.straddles(at) {
                            self.emit(old, &mut live);
                        }
                    }

                    let window = match binding.kind {
                        BindingKind::LoopItem { body: loop_body } => {
                            LivenessWindow::covering(loop_body.start(), loop_body.end())
                        }
                        BindingKind::Ordinary | BindingKind::OpaqueExternal => {
                            LivenessWindow::open(binding.position)
                        }
                    };
                    tracked.insert(
                        local,
                        Tracked {
                            binding: *binding,
                            window,
                        },
                    );
                }
                BindingEvent::Use { at: used_at, .. } => {
                    let Some(entry) = tracked.get_mut(&local) else {
                        continue;
                    };
                    if entry.binding.is_loop_item() {
                        continue;
                    }
                    entry.window.extend_to(*used_at);
                    if entry.window.straddles(at)
                        && let Some(done) = tracked.shift_remove(&local)
                    {
                        self.emit(done, &mut live);
                    }
                }
            }
        }

        for (_, remaining) in tracked {
            if remaining.window.straddles(at) {
                self.emit(remaining, &mut live);
            }
        }

        live
    }

    fn emit(&self, tracked: Tracked, live: &mut Vec<LiveBinding>) {
        let path = self.builder.build_binding(&tracked.binding);
        let local = tracked.binding.local;
        if !path.is_representable() {
            tracing::trace!(?local, "dropping live binding without a path");
            return;
        }

        tracing::trace!(
            ?local,
            start = tracked.window.start,
            end = tracked.window.end,
            "binding is live"
        );
        live.push(LiveBinding {
            local,
            name: self.builder.body().locals[local].name,
            binding: tracked.binding,
            window: tracked.window,
            path,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rp_hir::surface::{
        ArgDoc, ExprDoc, LocalDoc, MethodDoc, ParamDoc, ProgramDoc, StmtDoc, TypeDoc,
    };
    use rp_hir::{Body, Expr, LocalKind, MethodKind, ProgramDb, lower_program};
    use rp_path_build::TemplateTable;
    use rp_resolve::BindingIndex;

    fn program(locals: Vec<LocalDoc>, body: Vec<StmtDoc>) -> ProgramDb {
        let doc = ProgramDoc {
            types: vec![TypeDoc::new("List", true), TypeDoc::new("Item", false)],
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

    fn locals() -> Vec<LocalDoc> {
        vec![
            LocalDoc::new("list", Some("List"), LocalKind::Value),
            LocalDoc::new("r", Some("Item"), LocalKind::Ref),
            LocalDoc::new("item", Some("Item"), LocalKind::Ref),
            LocalDoc::new("ext", Some("Item"), LocalKind::Ref),
        ]
    }

    fn get() -> ExprDoc {
        ExprDoc::call("Get", vec![ArgDoc::by_ref(ExprDoc::name("list"))], Some("Item"))
    }

    fn add() -> StmtDoc {
        StmtDoc::expr(ExprDoc::call(
            "Add",
            vec![ArgDoc::by_ref(ExprDoc::name("list"))],
            None,
        ))
    }

    fn use_of(name: &str) -> StmtDoc {
        StmtDoc::expr(ExprDoc::name(name).field("value"))
    }

    fn add_call(program: &ProgramDb, body: &Body) -> ExprId {
        body.exprs
            .iter()
            .find(|(_, expr)| {
                matches!(expr, Expr::Call { method, .. } if program.methods[*method].signature == "Add")
            })
            .map(|(id, _)| id)
            .expect("call to Add")
    }

    /// Names and rendered paths of the bindings live at the `Add` call.
    fn live_at_add(locals: Vec<LocalDoc>, stmts: Vec<StmtDoc>) -> Vec<(String, String)> {
        let program = program(locals, stmts);
        let body = program.body_named("run").expect("body");
        let index = BindingIndex::build(body);
        let templates = TemplateTable::build(&program);
        let builder = PathBuilder::new(&program, body, &index, &templates);
        let scanner = LifetimeScanner::new(builder);

        scanner
            .live_at_expr(add_call(&program, body))
            .into_iter()
            .map(|live| {
                (
                    program.name(live.name).to_string(),
                    live.path.display(&program.interner).to_string(),
                )
            })
            .collect()
    }

    fn live(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(name, path)| ((*name).to_string(), (*path).to_string()))
            .collect()
    }

    #[test]
    fn test_use_after_call_keeps_binding_live() {
        let found = live_at_add(locals(), vec![StmtDoc::let_("r", get()), add(), use_of("r")]);
        assert_eq!(found, live(&[("r", "list![]")]));
    }

    #[test]
    fn test_last_use_before_call_ends_window() {
        let found = live_at_add(locals(), vec![StmtDoc::let_("r", get()), use_of("r"), add()]);
        assert!(found.is_empty());
    }

    #[test]
    fn test_binding_after_call_is_not_live() {
        let found = live_at_add(locals(), vec![add(), StmtDoc::let_("r", get()), use_of("r")]);
        assert!(found.is_empty());
    }

    #[test]
    fn test_rebind_closes_window_at_new_value() {
        let found = live_at_add(
            locals(),
            vec![
                StmtDoc::let_("r", get()),
                add(),
                StmtDoc::ref_assign("r", get()),
                use_of("r"),
            ],
        );
        // Only the first binding spans the call; the second starts after it.
        assert_eq!(found, live(&[("r", "list![]")]));

        let program = program(
            locals(),
            vec![
                StmtDoc::let_("r", get()),
                add(),
                StmtDoc::ref_assign("r", get()),
                use_of("r"),
            ],
        );
        let body = program.body_named("run").expect("body");
        let index = BindingIndex::build(body);
        let templates = TemplateTable::build(&program);
        let scanner = LifetimeScanner::new(PathBuilder::new(&program, body, &index, &templates));
        let r = body.local_named(program.interner.intern("r")).expect("local");
        let first = index.bindings_of(r).next().expect("binding");

        let live = scanner.live_at_expr(add_call(&program, body));
        assert_eq!(live.len(), 1);
        assert_eq!(&live[0].binding, first);
    }

    #[test]
    fn test_loop_item_is_live_for_whole_body() {
        let found = live_at_add(
            locals(),
            vec![StmtDoc::for_each(
                "item",
                ExprDoc::name("list"),
                vec![add()],
            )],
        );
        assert_eq!(found, live(&[("item", "list![]")]));
    }

    #[test]
    fn test_unrepresentable_bindings_are_dropped() {
        let found = live_at_add(
            locals(),
            vec![
                StmtDoc::expr(ExprDoc::call("Fill", vec![ArgDoc::out("ext")], None)),
                add(),
                use_of("ext"),
            ],
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_value_locals_are_not_tracked() {
        let found = live_at_add(
            vec![
                LocalDoc::new("list", Some("List"), LocalKind::Value),
                LocalDoc::new("copy", Some("Item"), LocalKind::Value),
            ],
            vec![StmtDoc::let_("copy", get()), add(), use_of("copy")],
        );
        assert!(found.is_empty());
    }
}
