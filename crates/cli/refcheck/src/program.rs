//! Program loading for the CLI

use anyhow::{Context, Result};
use rp_hir::surface::ProgramDoc;
use rp_hir::{ProgramDb, lower_program};
use std::path::Path;

/// Read a program document and lower it
pub fn load_program(path: &Path) -> Result<ProgramDb> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read program {}", path.display()))?;
    let doc: ProgramDoc = serde_json::from_str(&source)
        .with_context(|| format!("Failed to parse program {}", path.display()))?;
    lower_program(&doc).with_context(|| format!("Failed to lower program {}", path.display()))
}
