//! Check command implementation

use anyhow::Result;
use colored::Colorize;
use rp_lint::LintLevel;
use std::path::Path;

use crate::config::Config;

/// Lint every method of the program at `path` and print the diagnostics.
///
/// Returns `true` if any error-level diagnostic was reported.
pub fn run_check(path: &Path, config: &Config, format: &str) -> Result<bool> {
    if format != "text" && format != "json" {
        anyhow::bail!("Unknown format: {format}");
    }

    let program = crate::program::load_program(path)?;
    let templates = config.templates_for(&program);
    let linter = config.linter();

    if format == "text" {
        println!("{} {}", "Checking".green().bold(), path.display());
        let rules: Vec<&str> = linter.rule_names().collect();
        println!("  {} {}", "Rules:".bold(), rules.join(", "));
    }

    let all_diagnostics = linter.lint_program(&program, &templates);
    let errors = all_diagnostics
        .iter()
        .filter(|d| d.level == LintLevel::Error)
        .count();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&all_diagnostics)?);
        return Ok(errors > 0);
    }

    if all_diagnostics.is_empty() {
        println!("\n{} No issues found", "Success:".green().bold());
        return Ok(false);
    }

    println!(
        "\n{} {} issues found:\n",
        "Found".yellow().bold(),
        all_diagnostics.len()
    );
    for diagnostic in &all_diagnostics {
        let level = match diagnostic.level {
            LintLevel::Error => "error".red().bold(),
            LintLevel::Warning => "warning".yellow().bold(),
            LintLevel::Info => "info".cyan().bold(),
        };

        println!("{level}: {} [{}]", diagnostic.message, diagnostic.rule);
        println!("  --> {} in `{}`", diagnostic.span, diagnostic.method);
        if let Some(suggestion) = &diagnostic.suggestion {
            println!("  {} {suggestion}", "help:".cyan().bold());
        }
        println!();
    }

    let warnings = all_diagnostics
        .iter()
        .filter(|d| d.level == LintLevel::Warning)
        .count();
    println!("{} {errors} errors, {warnings} warnings", "Summary:".bold());

    Ok(errors > 0)
}
