//! Paths command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use rp_hir::{ArgMode, Expr, ProgramDb};
use rp_path::ReferencePath;
use rp_path_build::{BuildFailure, PathBuilder};
use rp_resolve::{BindingEvent, BindingIndex, BindingKind};
use std::path::Path;

use crate::config::Config;

/// Print the path of every reference binding and by-reference argument of
/// `method`.
pub fn print_paths(path: &Path, config: &Config, method: &str) -> Result<()> {
    let program = crate::program::load_program(path)?;
    let templates = config.templates_for(&program);
    let body = program
        .body_named(method)
        .with_context(|| format!("No method with a body named `{method}`"))?;

    let index = BindingIndex::build(body);
    let builder = PathBuilder::new(&program, body, &index, &templates)
        .with_max_walk_steps(config.analysis.max_walk_steps);

    println!("{} `{method}`", "Paths in".green().bold());

    println!("\n{}", "Reference bindings:".bold());
    for event in index.events() {
        let BindingEvent::Bind(binding) = event else {
            continue;
        };
        let local = &body.locals[binding.local];
        if !local.is_ref() {
            continue;
        }
        let kind = match binding.kind {
            BindingKind::Ordinary => "",
            BindingKind::LoopItem { .. } => " (loop item)",
            BindingKind::OpaqueExternal => " (out argument)",
        };
        println!(
            "  {}{kind} @ {}: {}",
            program.name(local.name),
            binding.position,
            render(&program, builder.try_build_binding(binding))
        );
    }

    println!("\n{}", "By-reference arguments:".bold());
    for (_, expr) in body.exprs.iter() {
        let Expr::Call { method, args, .. } = expr else {
            continue;
        };
        for (position, arg) in args.iter().enumerate() {
            if arg.mode != ArgMode::Ref {
                continue;
            }
            println!(
                "  {} #{position} @ {}: {}",
                program.methods[*method].signature,
                body.exprs[arg.expr].span(),
                render(&program, builder.try_build(arg.expr, None))
            );
        }
    }

    Ok(())
}

fn render(program: &ProgramDb, built: Result<ReferencePath, BuildFailure>) -> String {
    match built {
        Ok(path) => format!(
            "{} boundary={} explicit={}{}",
            path.display(&program.interner),
            path.dynamic_boundary(),
            path.explicit_length(),
            if path.derived_from_local_scope() {
                " scoped"
            } else {
                ""
            }
        ),
        Err(failure) => format!("{} ({failure})", "not representable".yellow()),
    }
}
