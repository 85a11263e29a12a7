// src/migration/migrator.rs

//! Pending-migration discovery
//!
//! Walks the source history backwards from its head. A revision with a
//! recorded equivalence to the destination repository is a baseline: it
//! and its ancestors are already reflected in the destination. Every other
//! revision reached is pending.
//!
//! Histories may branch and merge. Parents are followed in the order the
//! backend lists them (first parent first), each revision is visited once,
//! and pending revisions come out parents-before-children, so replaying
//! them in order never applies a change before one it depends on.
//!
//! A revision can reach a baseline's ancestors through another parent of a
//! merge, so the walk runs in two passes: the first collects pending
//! candidates and the baselines met, the second drops every candidate that
//! is an ancestor of some baseline.

use super::{Migration, MigrationConfig, MigrationError};
use crate::db::{Db, Equivalence};
use crate::project::ProjectContext;
use crate::repository::{RepositoryType, Revision, RevisionHistory};
use std::collections::HashSet;
use tracing::{debug, info};

pub struct Migrator<'a> {
    context: &'a ProjectContext,
}

/// Explicit DFS frame: a revision and the parents still to visit
struct Frame {
    revision: Revision,
    parents: std::vec::IntoIter<Revision>,
}

impl<'a> Migrator<'a> {
    pub fn new(context: &'a ProjectContext) -> Self {
        Self { context }
    }

    /// Pending migrations for the named migration config
    pub fn find_migrations(&self, name: &str, db: &Db) -> Result<Vec<Migration>, MigrationError> {
        let config = self
            .context
            .migration_config(name)
            .ok_or_else(|| MigrationError::UnknownMigration(name.to_string()))?;
        let from = self
            .context
            .repository(&config.from_repository)
            .ok_or_else(|| MigrationError::UnknownSource {
                migration: config.name.clone(),
                repository: config.from_repository.clone(),
            })?;
        self.find_migrations_from_equivalency(from, config, db)
    }

    /// Source revisions of `from` not yet reflected in the destination of
    /// `config`, oldest first
    pub fn find_migrations_from_equivalency(
        &self,
        from: &RepositoryType,
        config: &MigrationConfig,
        db: &Db,
    ) -> Result<Vec<Migration>, MigrationError> {
        let destination = self.context.repository(&config.to_repository).ok_or_else(|| {
            MigrationError::UnknownDestination {
                migration: config.name.clone(),
                repository: config.to_repository.clone(),
            }
        })?;

        let history = from.revision_history();
        let Some(head) = history.find_head_revision(None)? else {
            info!("Repository '{}' has no revisions", from.name());
            return Ok(Vec::new());
        };

        let (mut pending, baselines) = walk(history, head, &config.to_repository, db)?;
        if !baselines.is_empty() {
            let covered = ancestors(history, baselines.iter().map(|(revision, _)| revision))?;
            pending.retain(|revision| !covered.contains(revision));
        }
        let baseline = baselines.into_iter().next().map(|(_, equivalence)| equivalence);

        info!(
            "{} pending migration(s) from '{}' to '{}'{}",
            pending.len(),
            from.name(),
            config.to_repository,
            baseline
                .as_ref()
                .map(|b| format!(" since {}", b))
                .unwrap_or_default()
        );

        Ok(pending
            .into_iter()
            .map(|revision| Migration {
                from_revision: revision,
                config_name: config.name.clone(),
                to_repository: config.to_repository.clone(),
                to_project_space: destination.project_space().to_string(),
                baseline: baseline.clone(),
            })
            .collect())
    }
}

/// Most recently recorded equivalence linking `revision` to `to_repository`
fn baseline_for(revision: &Revision, to_repository: &str, db: &Db) -> Option<Equivalence> {
    db.find_equivalences(&revision.repository, &revision.id)
        .into_iter()
        .filter(|e| {
            e.other_revision(revision)
                .is_some_and(|other| other.repository == to_repository)
        })
        .next_back()
}

/// Post-order walk from `head`. Returns pending candidates (parents first)
/// and the baselines met with their equivalences, in the order they were met.
fn walk(
    history: &dyn RevisionHistory,
    head: Revision,
    to_repository: &str,
    db: &Db,
) -> Result<(Vec<Revision>, Vec<(Revision, Equivalence)>), MigrationError> {
    let mut pending = Vec::new();
    let mut baselines = Vec::new();
    let mut visited = HashSet::new();
    let mut stack: Vec<Frame> = Vec::new();

    let mut enter = |revision: Revision,
                     stack: &mut Vec<Frame>,
                     baselines: &mut Vec<(Revision, Equivalence)>|
     -> Result<(), MigrationError> {
        if !visited.insert(revision.clone()) {
            return Ok(());
        }
        if let Some(equivalence) = baseline_for(&revision, to_repository, db) {
            debug!("Baseline {} found at {}", equivalence, revision);
            baselines.push((revision, equivalence));
            return Ok(());
        }
        let parents = history.metadata(&revision)?.parents;
        stack.push(Frame {
            revision,
            parents: parents.into_iter(),
        });
        Ok(())
    };

    enter(head, &mut stack, &mut baselines)?;
    while let Some(frame) = stack.last_mut() {
        match frame.parents.next() {
            Some(parent) => enter(parent, &mut stack, &mut baselines)?,
            None => {
                if let Some(done) = stack.pop() {
                    pending.push(done.revision);
                }
            }
        }
    }

    Ok((pending, baselines))
}

/// Every proper ancestor of `roots`
fn ancestors<'r>(
    history: &dyn RevisionHistory,
    roots: impl Iterator<Item = &'r Revision>,
) -> Result<HashSet<Revision>, MigrationError> {
    let mut seen = HashSet::new();
    let mut queue: Vec<Revision> = Vec::new();
    for root in roots {
        queue.extend(history.metadata(root)?.parents);
    }
    while let Some(revision) = queue.pop() {
        if !seen.insert(revision.clone()) {
            continue;
        }
        queue.extend(history.metadata(&revision)?.parents);
    }
    Ok(seen)
}
