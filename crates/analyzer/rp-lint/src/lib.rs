//! Lint rules over the reference safety checks
//!
//! Turns the findings of `rp-borrow-check` into rule-tagged diagnostics with
//! configurable levels

use rp_borrow_check::{RefSafetyChecker, RefSafetyError};
use rp_hir::{MethodDef, MethodId, ProgramDb};
use rp_path_build::{DEFAULT_MAX_WALK_STEPS, PathBuilder, TemplateTable};
use rp_resolve::BindingIndex;
use rp_span::FileSpan;
use serde::{Deserialize, Serialize};

/// Lint severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintLevel {
    /// Informational message
    Info,
    /// Warning that should be addressed
    Warning,
    /// Error that must be fixed
    Error,
}

/// A lint diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Lint rule that triggered this diagnostic
    pub rule: String,
    /// Signature of the method the diagnostic was found in
    pub method: String,
    /// Severity level
    pub level: LintLevel,
    /// Human-readable message
    pub message: String,
    /// Source location
    pub span: FileSpan,
    /// Optional suggestion for fixing
    pub suggestion: Option<String>,
}

/// Rule settings, usually read from the `[lint]` table of a config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    /// Enables the informational `unverifiable-reference` rule
    pub unverifiable: bool,
    /// Rules raised to error level
    pub deny: Vec<String>,
    /// Rules turned off
    pub allow: Vec<String>,
}

/// Lint context for running rules over one method
pub struct LintContext<'a> {
    /// Method being linted
    pub method: &'a MethodDef,
    /// Findings of the reference safety checks for the method
    findings: Vec<RefSafetyError>,
    /// Collected diagnostics
    diagnostics: Vec<Diagnostic>,
}

impl<'a> LintContext<'a> {
    /// Create a new lint context
    #[must_use]
    pub fn new(method: &'a MethodDef, findings: Vec<RefSafetyError>) -> Self {
        Self {
            method,
            findings,
            diagnostics: Vec::new(),
        }
    }

    /// Findings the rules are derived from
    #[must_use]
    pub fn findings(&self) -> &[RefSafetyError] {
        &self.findings
    }

    /// Report a diagnostic
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Get all diagnostics
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Take all diagnostics
    #[must_use]
    pub fn take_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Reports every finding `select` accepts under `rule`
    fn report_findings(
        &mut self,
        rule: &dyn LintRule,
        suggestion: &str,
        select: impl Fn(&RefSafetyError) -> bool,
    ) {
        let reports: Vec<Diagnostic> = self
            .findings
            .iter()
            .filter(|finding| select(finding))
            .map(|finding| Diagnostic {
                rule: rule.name().to_string(),
                method: self.method.signature.clone(),
                level: rule.level(),
                message: finding.detailed_message(),
                span: finding.span(),
                suggestion: Some(suggestion.to_string()),
            })
            .collect();
        for diagnostic in reports {
            self.report(diagnostic);
        }
    }
}

/// Trait for lint rules
pub trait LintRule {
    /// Rule name
    fn name(&self) -> &'static str;

    /// Level reported diagnostics carry
    fn level(&self) -> LintLevel;

    /// Overrides the level
    fn set_level(&mut self, level: LintLevel);

    /// Check a method
    fn check_method(&self, ctx: &mut LintContext);
}

/// Rule: a call may resize storage a live reference points into
pub struct ResizeInvalidatesReferenceRule {
    /// Reported level
    pub level: LintLevel,
}

impl Default for ResizeInvalidatesReferenceRule {
    fn default() -> Self {
        Self {
            level: LintLevel::Error,
        }
    }
}

impl LintRule for ResizeInvalidatesReferenceRule {
    fn name(&self) -> &'static str {
        "resize-invalidates-reference"
    }

    fn level(&self) -> LintLevel {
        self.level
    }

    fn set_level(&mut self, level: LintLevel) {
        self.level = level;
    }

    fn check_method(&self, ctx: &mut LintContext) {
        ctx.report_findings(
            self,
            "Finish using the reference before the call, or obtain it again afterwards",
            |finding| matches!(finding, RefSafetyError::InvalidatedReference { .. }),
        );
    }
}

/// Rule: two by-reference arguments may alias resizable storage
pub struct AliasedDynamicArgumentsRule {
    /// Reported level
    pub level: LintLevel,
}

impl Default for AliasedDynamicArgumentsRule {
    fn default() -> Self {
        Self {
            level: LintLevel::Error,
        }
    }
}

impl LintRule for AliasedDynamicArgumentsRule {
    fn name(&self) -> &'static str {
        "aliased-dynamic-arguments"
    }

    fn level(&self) -> LintLevel {
        self.level
    }

    fn set_level(&mut self, level: LintLevel) {
        self.level = level;
    }

    fn check_method(&self, ctx: &mut LintContext) {
        ctx.report_findings(
            self,
            "Pass references into distinct containers",
            |finding| matches!(finding, RefSafetyError::AliasedArguments { .. }),
        );
    }
}

/// Rule: a by-reference argument cannot be traced, so it is not checked
pub struct UnverifiableReferenceRule {
    /// Reported level
    pub level: LintLevel,
}

impl Default for UnverifiableReferenceRule {
    fn default() -> Self {
        Self {
            level: LintLevel::Info,
        }
    }
}

impl LintRule for UnverifiableReferenceRule {
    fn name(&self) -> &'static str {
        "unverifiable-reference"
    }

    fn level(&self) -> LintLevel {
        self.level
    }

    fn set_level(&mut self, level: LintLevel) {
        self.level = level;
    }

    fn check_method(&self, ctx: &mut LintContext) {
        ctx.report_findings(
            self,
            "Declare a path template on the method that produced this reference",
            |finding| matches!(finding, RefSafetyError::Unverifiable { .. }),
        );
    }
}

/// Rule: a reference obtained from a local access scope is returned
pub struct ScopedReferenceEscapeRule {
    /// Reported level
    pub level: LintLevel,
}

impl Default for ScopedReferenceEscapeRule {
    fn default() -> Self {
        Self {
            level: LintLevel::Error,
        }
    }
}

impl LintRule for ScopedReferenceEscapeRule {
    fn name(&self) -> &'static str {
        "scoped-reference-escape"
    }

    fn level(&self) -> LintLevel {
        self.level
    }

    fn set_level(&mut self, level: LintLevel) {
        self.level = level;
    }

    fn check_method(&self, ctx: &mut LintContext) {
        ctx.report_findings(
            self,
            "Return a copy of the value instead of a reference into the scope",
            |finding| matches!(finding, RefSafetyError::EscapesLocalScope { .. }),
        );
    }
}

/// Linter with a collection of rules
pub struct Linter {
    rules: Vec<Box<dyn LintRule>>,
    max_walk_steps: usize,
}

impl Linter {
    /// Create a new linter with default rules
    #[must_use]
    pub fn new() -> Self {
        Self::with_rules(vec![
            Box::new(ResizeInvalidatesReferenceRule::default()),
            Box::new(AliasedDynamicArgumentsRule::default()),
            Box::new(ScopedReferenceEscapeRule::default()),
        ])
    }

    /// Create a linter with specific rules
    #[must_use]
    pub fn with_rules(rules: Vec<Box<dyn LintRule>>) -> Self {
        Self {
            rules,
            max_walk_steps: DEFAULT_MAX_WALK_STEPS,
        }
    }

    /// Create a linter from rule settings
    #[must_use]
    pub fn from_config(config: &LintConfig) -> Self {
        let mut candidates: Vec<Box<dyn LintRule>> = vec![
            Box::new(ResizeInvalidatesReferenceRule::default()),
            Box::new(AliasedDynamicArgumentsRule::default()),
            Box::new(ScopedReferenceEscapeRule::default()),
        ];
        if config.unverifiable {
            candidates.push(Box::new(UnverifiableReferenceRule::default()));
        }

        let known: Vec<String> = candidates
            .iter()
            .map(|rule| rule.name().to_string())
            .chain(std::iter::once(UnverifiableReferenceRule::default().name().to_string()))
            .collect();
        for name in config.deny.iter().chain(&config.allow) {
            if !known.contains(name) {
                tracing::warn!(rule = %name, "unknown lint rule in configuration");
            }
        }

        let mut rules = Vec::with_capacity(candidates.len());
        for mut rule in candidates {
            if config.allow.iter().any(|name| name == rule.name()) {
                continue;
            }
            if config.deny.iter().any(|name| name == rule.name()) {
                rule.set_level(LintLevel::Error);
            }
            rules.push(rule);
        }
        Self::with_rules(rules)
    }

    /// Bound the path walks of the underlying checks
    #[must_use]
    pub fn with_max_walk_steps(mut self, max_walk_steps: usize) -> Self {
        self.max_walk_steps = max_walk_steps;
        self
    }

    /// Names of the active rules
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name())
    }

    /// Lint one method; methods without a body produce nothing
    pub fn lint_method(
        &self,
        program: &ProgramDb,
        templates: &TemplateTable,
        method: MethodId,
    ) -> Vec<Diagnostic> {
        let Some(body) = program.body(method) else {
            return Vec::new();
        };
        let index = BindingIndex::build(body);
        let builder = PathBuilder::new(program, body, &index, templates)
            .with_max_walk_steps(self.max_walk_steps);
        let findings = RefSafetyChecker::new(builder).check_body();

        let mut ctx = LintContext::new(&program.methods[method], findings);
        for rule in &self.rules {
            rule.check_method(&mut ctx);
        }

        let mut diagnostics = ctx.take_diagnostics();
        diagnostics.sort_by_key(|diagnostic| diagnostic.span.start());
        diagnostics
    }

    /// Lint every method of a program that has a body
    pub fn lint_program(&self, program: &ProgramDb, templates: &TemplateTable) -> Vec<Diagnostic> {
        program
            .bodies()
            .flat_map(|(method, _)| self.lint_method(program, templates, method))
            .collect()
    }

    /// Add a rule
    pub fn add_rule(&mut self, rule: Box<dyn LintRule>) {
        self.rules.push(rule);
    }
}

impl Default for Linter {
    fn default() -> Self {
        Self::new()
    }
}
