// src/commands/change.rs

//! Draft creation command

use super::open_project;
use anyhow::{Context, Result};
use migrant::{CommandRunner, LogUi, Ui, create_draft, parse_expression, parse_repository_expression};
use std::path::Path;
use std::sync::Arc;

/// Put the codebase described by `codebase` into `destination` as a
/// pending change
pub fn cmd_change(
    config: &Path,
    codebase: &str,
    destination: &str,
    runner: Arc<dyn CommandRunner>,
) -> Result<()> {
    let context = open_project(config, runner, true)?;
    let ui = LogUi::new();
    let task = ui.push_task(
        "create_change",
        &format!(
            "Creating a change in \"{}\" with contents \"{}\"",
            destination, codebase
        ),
    );

    let codebase = parse_expression(codebase)
        .context("Error parsing codebase")?
        .create_codebase(&context, &ui)?;
    let mut writer = parse_repository_expression(destination)
        .context("Error parsing change destination")?
        .create_writer(&context, &ui)?;

    match create_draft(&codebase, writer.as_mut(), None, &ui)? {
        Some(draft) => {
            ui.pop_task_and_persist(task, &writer.root().display().to_string());
            println!("Created draft revision at {}", draft);
        }
        None => {
            ui.pop_task_and_persist(task, "no changes");
            println!(
                "No changes: {} already matches {}",
                writer.root().display(),
                codebase
            );
        }
    }
    Ok(())
}
