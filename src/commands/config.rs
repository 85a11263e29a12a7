// src/commands/config.rs

//! Project configuration check command

use anyhow::{Context, Result, bail};
use migrant::{CommandRunner, ProjectConfig, ProjectContext, RepositoryConfig, Scratch};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Load the project at `config_path`, validate it and summarize it
pub fn cmd_check_config(config_path: &Path, runner: Arc<dyn CommandRunner>) -> Result<()> {
    let config = ProjectConfig::load(config_path)?;
    let scratch = Arc::new(Scratch::new().context("Failed to create scratch storage")?);
    let context = ProjectContext::from_config(&config, runner, scratch)?;

    println!("Project: {}", context.name());

    println!("Repositories:");
    for (name, repository) in &config.repositories {
        let location = match repository {
            RepositoryConfig::Git { url, branch, .. } => match branch {
                Some(branch) => format!("{} ({})", url, branch),
                None => url.clone(),
            },
            RepositoryConfig::Dummy { revisions, .. } => {
                format!("{} revision(s)", revisions.len())
            }
        };
        println!(
            "  {:<16} {:<6} space={:<12} {}",
            name,
            repository.kind(),
            repository.project_space(),
            location
        );
    }

    let editors: Vec<&str> = context.editor_names().collect();
    if !editors.is_empty() {
        println!("Editors:");
        for name in editors {
            if let Some(editor) = context.editor(name) {
                println!("  {:<16} {}", name, editor.describe());
            }
        }
    }

    if !context.translators().is_empty() {
        println!("Translators:");
        for translator in context.translators() {
            let steps: Vec<&str> = translator.steps().iter().map(|s| s.name.as_str()).collect();
            println!(
                "  {} -> {}: {}",
                translator.from_project_space(),
                translator.to_project_space(),
                if steps.is_empty() { "(no steps)".to_string() } else { steps.join(", ") }
            );
        }
    }

    if !context.migration_configs().is_empty() {
        println!("Migrations:");
        for (name, migration) in context.migration_configs() {
            println!(
                "  {:<16} {} -> {}",
                name, migration.from_repository, migration.to_repository
            );
        }
    }

    let uses_git = config
        .repositories
        .values()
        .any(|r| matches!(r, RepositoryConfig::Git { .. }));
    if uses_git {
        match which::which("git") {
            Ok(path) => info!("Using git at {}", path.display()),
            Err(e) => {
                warn!("git not found: {}", e);
                bail!("Project uses git repositories but no git executable is on PATH");
            }
        }
    }

    println!("Configuration OK");
    Ok(())
}
