// src/commands/mod.rs
//! Command handlers for the migrant CLI

mod change;
mod config;
mod diff;
mod equivalence;
mod migrate;

pub use change::cmd_change;
pub use config::cmd_check_config;
pub use diff::cmd_diff_codebases;
pub use equivalence::{cmd_find_equivalence, cmd_note_equivalence};
pub use migrate::{cmd_determine_migrations, cmd_migrate};

use anyhow::{Context, Result};
use migrant::{CommandRunner, ProjectConfig, ProjectContext, Scratch};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Load the project at `config_path` with fresh scratch storage. Commands
/// that leave drafts behind ask for `keep_scratch` so the working copies
/// outlive the process.
pub fn open_project(
    config_path: &Path,
    runner: Arc<dyn CommandRunner>,
    keep_scratch: bool,
) -> Result<ProjectContext> {
    debug!("Loading project config {}", config_path.display());
    let config = ProjectConfig::load(config_path)?;
    let scratch = if keep_scratch {
        Scratch::kept()
    } else {
        Scratch::new()
    }
    .context("Failed to create scratch storage")?;
    let scratch = Arc::new(scratch);
    let context = ProjectContext::from_config(&config, runner, scratch)?;
    Ok(context)
}
