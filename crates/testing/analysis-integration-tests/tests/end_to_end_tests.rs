//! End-to-end tests: program documents through lowering, checks and lints

use rp_borrow_check::{RefSafetyChecker, RefSafetyError};
use rp_hir::surface::{
    ArgDoc, ExprDoc, LocalDoc, MethodDoc, ParamDoc, ProgramDoc, StmtDoc, TypeDoc,
};
use rp_hir::{Body, Expr, ExprId, LocalKind, MethodKind, ProgramDb, lower_program};
use rp_lifetime::LifetimeScanner;
use rp_lint::{Diagnostic, LintConfig, LintLevel, Linter};
use rp_path::can_invalidate;
use rp_path_build::{PathBuilder, TemplateTable};
use rp_resolve::BindingIndex;

fn load_fixture() -> ProgramDb {
    let source = include_str!("fixtures/invalidation.json");
    let doc: ProgramDoc = serde_json::from_str(source).expect("Failed to parse fixture");
    lower_program(&doc).expect("Failed to lower fixture")
}

fn helpers() -> Vec<MethodDoc> {
    vec![
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
                ParamDoc::new("left", None, true),
                ParamDoc::new("right", None, true),
            ],
            ..MethodDoc::default()
        },
        MethodDoc {
            name: "Fill".to_string(),
            ..MethodDoc::default()
        },
        MethodDoc {
            name: "Slot".to_string(),
            params: vec![
                ParamDoc::new("index", None, false),
                ParamDoc::new("arena", Some("Arena"), true),
            ],
            path: Some(
                ["arena", "blocks", "!", "[]"]
                    .iter()
                    .map(|token| (*token).to_string())
                    .collect(),
            ),
            returns_ref: true,
            ..MethodDoc::default()
        },
        MethodDoc {
            name: "Grow".to_string(),
            params: vec![ParamDoc::new("blocks", Some("List"), true)],
            ..MethodDoc::default()
        },
    ]
}

/// Lowers a program whose `run` method has the given locals and body.
fn program_with(locals: Vec<LocalDoc>, body: Vec<StmtDoc>, returns_ref: bool) -> ProgramDb {
    let mut methods = helpers();
    methods.push(MethodDoc {
        name: "run".to_string(),
        locals,
        returns_ref,
        body: Some(body),
        ..MethodDoc::default()
    });
    let doc = ProgramDoc {
        types: vec![
            TypeDoc::new("List", true),
            TypeDoc::new("Arena", false),
            TypeDoc::new("Item", false),
        ],
        methods,
        ..ProgramDoc::default()
    };
    lower_program(&doc).expect("Failed to lower")
}

fn lint_run(program: &ProgramDb, linter: &Linter) -> Vec<Diagnostic> {
    let templates = TemplateTable::build(program);
    let run = program.method_by_signature("run").expect("run exists");
    linter.lint_method(program, &templates, run)
}

fn rules(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics.iter().map(|d| d.rule.as_str()).collect()
}

fn call_to(program: &ProgramDb, body: &Body, signature: &str) -> ExprId {
    body.exprs
        .iter()
        .find(|(_, expr)| {
            matches!(expr, Expr::Call { method, .. } if program.methods[*method].signature == signature)
        })
        .map(|(id, _)| id)
        .expect("call exists")
}

fn list_locals() -> Vec<LocalDoc> {
    vec![
        LocalDoc::new("list", Some("List"), LocalKind::Value),
        LocalDoc::new("i", None, LocalKind::Value),
        LocalDoc::new("r", Some("Item"), LocalKind::Ref),
        LocalDoc::new("item", Some("Item"), LocalKind::Ref),
        LocalDoc::new("ext", Some("Item"), LocalKind::Ref),
    ]
}

fn add_list() -> StmtDoc {
    StmtDoc::expr(ExprDoc::call(
        "Add",
        vec![ArgDoc::by_ref(ExprDoc::name("list"))],
        None,
    ))
}

#[test]
fn test_fixture_reports_use_after_resize() {
    let program = load_fixture();
    let templates = TemplateTable::build(&program);
    let diagnostics = Linter::new().lint_program(&program, &templates);

    assert_eq!(diagnostics.len(), 1, "only `Process` uses `r` after `Add`");
    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.rule, "resize-invalidates-reference");
    assert_eq!(diagnostic.level, LintLevel::Error);
    assert_eq!(diagnostic.method, "Process");
    assert_eq!(
        diagnostic.message,
        "Calling `List.Add(Item)` with `list!` may resize it while `r` still refers to `list![]`"
    );
}

#[test]
fn test_fixture_checks_through_checker_api() {
    let program = load_fixture();
    let templates = TemplateTable::build(&program);

    let process = program.body_named("Process").expect("Process has a body");
    let errors = RefSafetyChecker::check(&program, &templates, process).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        RefSafetyError::InvalidatedReference { victim, .. } if victim == "r"
    ));

    let safe = program.body_named("Safe").expect("Safe has a body");
    assert!(RefSafetyChecker::check(&program, &templates, safe).is_ok());
}

#[test]
fn test_allowed_rule_is_silent() {
    let program = load_fixture();
    let templates = TemplateTable::build(&program);
    let linter = Linter::from_config(&LintConfig {
        allow: vec!["resize-invalidates-reference".to_string()],
        ..LintConfig::default()
    });

    assert!(linter.lint_program(&program, &templates).is_empty());
}

#[test]
fn test_loop_item_is_invalidated_by_resize_in_body() {
    let program = program_with(
        list_locals(),
        vec![StmtDoc::for_each(
            "item",
            ExprDoc::name("list"),
            vec![add_list()],
        )],
        false,
    );
    let body = program.body_named("run").expect("body");
    let index = BindingIndex::build(body);
    let templates = TemplateTable::build(&program);
    let builder = PathBuilder::new(&program, body, &index, &templates);

    let add = call_to(&program, body, "Add");
    let live = LifetimeScanner::new(builder).live_at_expr(add);
    assert_eq!(live.len(), 1);
    assert_eq!(program.name(live[0].name), "item");
    assert_eq!(live[0].path.display(&program.interner).to_string(), "list![]");

    let Expr::Call { args, .. } = &body.exprs[add] else {
        panic!("Add is a call");
    };
    let list = builder.build(args[0].expr, None);
    assert!(can_invalidate(&list, &live[0].path));

    let diagnostics = lint_run(&program, &Linter::new());
    assert_eq!(rules(&diagnostics), vec!["resize-invalidates-reference"]);
}

#[test]
fn test_aliased_arguments_are_reported() {
    let program = program_with(
        list_locals(),
        vec![StmtDoc::expr(ExprDoc::call(
            "Swap",
            vec![
                ArgDoc::by_ref(ExprDoc::name("list")),
                ArgDoc::by_ref(ExprDoc::name("list").index(ExprDoc::name("i"), Some("Item"))),
            ],
            None,
        ))],
        false,
    );

    let diagnostics = lint_run(&program, &Linter::new());
    assert_eq!(rules(&diagnostics), vec!["aliased-dynamic-arguments"]);
    assert_eq!(
        diagnostics[0].message,
        "Arguments `list!` and `list![]` of `Swap` may refer to the same dynamically sized storage"
    );
}

#[test]
fn test_template_path_is_invalidated_by_anchor_resize() {
    let program = program_with(
        vec![
            LocalDoc::new("arena", Some("Arena"), LocalKind::Value),
            LocalDoc::new("i", None, LocalKind::Value),
            LocalDoc::new("r", Some("Item"), LocalKind::Ref),
        ],
        vec![
            StmtDoc::let_(
                "r",
                ExprDoc::call(
                    "Slot",
                    vec![
                        ArgDoc::value(ExprDoc::name("i")),
                        ArgDoc::by_ref(ExprDoc::name("arena")),
                    ],
                    Some("Item"),
                ),
            ),
            StmtDoc::expr(ExprDoc::call(
                "Grow",
                vec![ArgDoc::by_ref(
                    ExprDoc::name("arena").field_of("blocks", Some("List")),
                )],
                None,
            )),
            StmtDoc::expr(ExprDoc::name("r").field("value")),
        ],
        false,
    );

    let diagnostics = lint_run(&program, &Linter::new());
    assert_eq!(rules(&diagnostics), vec!["resize-invalidates-reference"]);
    assert_eq!(
        diagnostics[0].message,
        "Calling `Grow` with `arena.blocks!` may resize it while `r` still refers to `arena.blocks![]`"
    );
}

#[test]
fn test_untraceable_argument_is_informational() {
    let program = program_with(
        list_locals(),
        vec![
            StmtDoc::expr(ExprDoc::call("Fill", vec![ArgDoc::out("ext")], None)),
            StmtDoc::expr(ExprDoc::call(
                "Swap",
                vec![
                    ArgDoc::by_ref(ExprDoc::name("ext")),
                    ArgDoc::by_ref(ExprDoc::name("list")),
                ],
                None,
            )),
        ],
        false,
    );

    assert!(lint_run(&program, &Linter::new()).is_empty());

    let linter = Linter::from_config(&LintConfig {
        unverifiable: true,
        ..LintConfig::default()
    });
    let diagnostics = lint_run(&program, &linter);
    assert_eq!(rules(&diagnostics), vec!["unverifiable-reference"]);
    assert_eq!(diagnostics[0].level, LintLevel::Info);
}

#[test]
fn test_scoped_reference_escape() {
    let program = program_with(
        vec![LocalDoc::new("scope", None, LocalKind::ScopeHandle)],
        vec![StmtDoc::ret(
            ExprDoc::name("scope")
                .scope_value(Some("Item"))
                .field("value"),
        )],
        true,
    );

    let diagnostics = lint_run(&program, &Linter::new());
    assert_eq!(rules(&diagnostics), vec!["scoped-reference-escape"]);
    assert_eq!(
        diagnostics[0].message,
        "Returning `scope.value` lets a reference outlive the access scope it came from"
    );
}

#[test]
fn test_diagnostics_serialize_as_json() {
    let program = load_fixture();
    let templates = TemplateTable::build(&program);
    let diagnostics = Linter::new().lint_program(&program, &templates);

    let json = serde_json::to_value(&diagnostics).expect("serializes");
    assert_eq!(json[0]["rule"], "resize-invalidates-reference");
    assert_eq!(json[0]["level"], "error");
}

#[test]
fn test_fixture_slice_of_view_is_invalidated() {
    let source = include_str!("fixtures/views.json");
    let doc: ProgramDoc = serde_json::from_str(source).expect("Failed to parse fixture");
    let program = lower_program(&doc).expect("Failed to lower fixture");
    let templates = TemplateTable::build(&program);

    let diagnostics = Linter::new().lint_program(&program, &templates);
    assert_eq!(rules(&diagnostics), vec!["resize-invalidates-reference"]);
    assert_eq!(diagnostics[0].method, "Window");
    assert_eq!(
        diagnostics[0].message,
        "Calling `Add` with `list!` may resize it while `r` still refers to `list!.AsSpan()[]`"
    );
}
