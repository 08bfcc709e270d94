//! Configuration file parsing

use anyhow::{Context, Result};
use indexmap::IndexMap;
use rp_hir::ProgramDb;
use rp_lint::{LintConfig, Linter};
use rp_path_build::{DEFAULT_MAX_WALK_STEPS, TemplateTable};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of `refcheck.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path building settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Rule settings
    #[serde(default)]
    pub lint: LintConfig,

    /// Path templates keyed by method signature
    #[serde(default)]
    pub templates: IndexMap<String, Vec<String>>,
}

/// Path building settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Bound on the steps of a single backward walk
    #[serde(default = "default_max_walk_steps")]
    pub max_walk_steps: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_walk_steps: default_max_walk_steps(),
        }
    }
}

fn default_max_walk_steps() -> usize {
    DEFAULT_MAX_WALK_STEPS
}

impl Config {
    /// Parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Parse a configuration file, falling back to defaults when it is missing
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Template table for `program`: declared templates, then the configured
    /// ones on top. Entries that do not apply are logged and skipped.
    pub fn templates_for(&self, program: &ProgramDb) -> TemplateTable {
        let mut table = TemplateTable::build(program);
        for (signature, tokens) in &self.templates {
            if let Err(error) = table.declare(program, signature, tokens) {
                tracing::warn!(%signature, %error, "ignoring configured template");
            }
        }
        table
    }

    /// Linter for the configured rules
    pub fn linter(&self) -> Linter {
        Linter::from_config(&self.lint).with_max_walk_steps(self.analysis.max_walk_steps)
    }
}
