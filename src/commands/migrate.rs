// src/commands/migrate.rs

//! Migration discovery and execution commands

use super::open_project;
use anyhow::{Context, Result};
use migrant::{
    CommandRunner, Db, LogUi, Migrator, SubmittedMigration, Ui, create_draft,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Print the revisions of a migration's source not yet in its destination
pub fn cmd_determine_migrations(
    config: &Path,
    migration: &str,
    db_path: &Path,
    json: bool,
    runner: Arc<dyn CommandRunner>,
) -> Result<()> {
    let context = open_project(config, runner, false)?;
    let db = Db::load(db_path)?;

    let migrations = Migrator::new(&context).find_migrations(migration, &db)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&migrations)?);
        return Ok(());
    }

    if migrations.is_empty() {
        println!("No pending migrations for '{}'.", migration);
        return Ok(());
    }
    for pending in &migrations {
        println!("Pending migration: {}", pending);
    }
    Ok(())
}

/// Create a draft revision for every pending migration, oldest first, and
/// note each one in the database
pub fn cmd_migrate(
    config: &Path,
    migration: &str,
    db_path: &Path,
    runner: Arc<dyn CommandRunner>,
) -> Result<()> {
    let context = open_project(config, runner, true)?;
    let mut db = Db::load(db_path)?;
    let ui = LogUi::new();

    let migrations = Migrator::new(&context).find_migrations(migration, &db)?;
    if migrations.is_empty() {
        println!("No pending migrations for '{}'.", migration);
        return Ok(());
    }

    let mut created = 0;
    for pending in &migrations {
        if db.has_migration(&pending.from_revision, &pending.to_repository) {
            info!("Skipping {}: draft already submitted", pending.from_revision);
            continue;
        }

        let task = ui.push_task("perform_migration", &format!("Performing migration {}", pending));
        let source = context
            .repository(&pending.from_revision.repository)
            .with_context(|| format!("Unknown repository '{}'", pending.from_revision.repository))?;
        let metadata = source.revision_history().metadata(&pending.from_revision)?;

        let codebase = pending.codebase_expression().create_codebase(&context, &ui)?;
        let mut writer = pending.writer_expression().create_writer(&context, &ui)?;

        match create_draft(&codebase, writer.as_mut(), Some(&metadata), &ui)? {
            Some(draft) => {
                ui.pop_task_and_persist(task, &draft.location.display().to_string());
                println!("Created draft for {} at {}", pending.from_revision, draft);
                db.note_migration(SubmittedMigration::new(
                    pending.from_revision.clone(),
                    &pending.to_repository,
                    draft.location.display().to_string(),
                ));
                created += 1;
            }
            None => {
                ui.pop_task_and_persist(task, "no changes");
                println!("No changes for {}", pending.from_revision);
            }
        }
        // Saved per migration so a failure later keeps the earlier records
        db.save()?;
    }

    println!("{} draft(s) created for '{}'.", created, migration);
    Ok(())
}
