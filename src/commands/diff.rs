// src/commands/diff.rs

//! Codebase comparison command

use super::open_project;
use anyhow::{Context, Result};
use migrant::{CommandRunner, LogUi, PatchRenderer, diff_codebases, parse_expression};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Evaluate two expressions and print their differences
pub fn cmd_diff_codebases(
    config: &Path,
    codebase1: &str,
    codebase2: &str,
    stat: bool,
    runner: Arc<dyn CommandRunner>,
) -> Result<()> {
    let context = open_project(config, runner, false)?;
    let ui = LogUi::new();

    let expression1 = parse_expression(codebase1).context("Error parsing codebase1")?;
    let expression2 = parse_expression(codebase2).context("Error parsing codebase2")?;

    let c1 = expression1.create_codebase(&context, &ui)?;
    let c2 = expression2.create_codebase(&context, &ui)?;

    let diff = diff_codebases(&c1, &c2)
        .with_context(|| format!("Failed to compare {} and {}", c1, c2))?;

    if !diff.are_different() {
        info!("No difference between {} and {}", c1, c2);
        return Ok(());
    }

    if stat {
        for file in diff.changed_files() {
            println!("{:<9} {}", file.status.as_str(), file.relative_path);
        }
    } else {
        print!("{}", PatchRenderer::new().render(&diff)?);
    }
    Ok(())
}
