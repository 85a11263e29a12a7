// src/commands/equivalence.rs

//! Equivalence database commands

use anyhow::{Result, anyhow};
use migrant::{Db, Equivalence, Revision};
use std::path::Path;

fn parse_revision(arg: &str, value: &str) -> Result<Revision> {
    Revision::parse(value)
        .ok_or_else(|| anyhow!("Invalid {} '{}': expected NAME{{REVISION}}", arg, value))
}

/// Record that two revisions hold the same state and save the database
pub fn cmd_note_equivalence(db_path: &Path, repo1: &str, repo2: &str) -> Result<()> {
    let revision1 = parse_revision("repo1", repo1)?;
    let revision2 = parse_revision("repo2", repo2)?;
    if revision1 == revision2 {
        return Err(anyhow!("A revision is trivially equivalent to itself: {}", revision1));
    }

    let mut db = Db::load(db_path)?;
    let equivalence = Equivalence::new(revision1, revision2);
    if db.add_equivalence(equivalence.clone()) {
        db.save()?;
        println!("Noted equivalence: {}", equivalence);
    } else {
        println!("Equivalence already recorded: {}", equivalence);
    }
    Ok(())
}

/// Print the equivalences recorded for `repository{revision}`
pub fn cmd_find_equivalence(
    db_path: &Path,
    repository: &str,
    revision: &str,
    in_repository: Option<&str>,
    json: bool,
) -> Result<()> {
    let db = Db::load(db_path)?;
    let target = Revision::new(repository, revision);

    if let Some(other) = in_repository {
        let found = db.find_equivalent_revisions(&target, other);
        if json {
            println!("{}", serde_json::to_string_pretty(&found)?);
        } else if found.is_empty() {
            println!("No equivalences for {} in '{}'.", target, other);
        } else {
            for equivalent in &found {
                println!("{} == {}", target, equivalent);
            }
        }
        return Ok(());
    }

    let found = db.find_equivalences(repository, revision);
    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
    } else if found.is_empty() {
        println!("No equivalences for {}.", target);
    } else {
        for equivalence in &found {
            println!("{}", equivalence);
        }
    }
    Ok(())
}
