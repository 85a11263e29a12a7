// src/db/mod.rs

//! Equivalence database
//!
//! A SQLite file recording which revisions of different repositories hold
//! the same state, plus which source revisions already had a draft produced.
//! Facts are append-only. New facts are held in memory (and are immediately
//! visible to queries) until [`Db::save`] writes them in one transaction.

pub mod models;
pub mod schema;

pub use models::{Equivalence, SubmittedMigration};

use crate::repository::Revision;
use chrono::Utc;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised by the equivalence database
#[derive(Debug, Error)]
pub enum DbError {
    #[error("equivalence database at {path} is corrupt or unreadable: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error(
        "equivalence database at {path} has schema version {found}, newer than supported version {supported}"
    )]
    UnsupportedVersion {
        path: PathBuf,
        found: i32,
        supported: i32,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// An open equivalence database
pub struct Db {
    location: PathBuf,
    conn: Connection,
    /// Every known fact, stored ones first, in recorded order
    equivalences: Vec<Equivalence>,
    unsaved_equivalences: Vec<Equivalence>,
    migrations: Vec<SubmittedMigration>,
    unsaved_migrations: Vec<SubmittedMigration>,
}

impl Db {
    /// Open the database at `location`, creating it if it does not exist
    pub fn load(location: impl AsRef<Path>) -> Result<Self> {
        let location = location.as_ref().to_path_buf();
        let existed = location.exists();

        if existed && !location.is_file() {
            return Err(DbError::Corrupt {
                path: location,
                message: "not a regular file".to_string(),
            });
        }

        if !existed
            && let Some(parent) = location.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        debug!("Opening equivalence database {}", location.display());
        let corrupt = |e: DbError| match e {
            DbError::Sqlite(inner) if existed => DbError::Corrupt {
                path: location.clone(),
                message: inner.to_string(),
            },
            other => other,
        };

        let mut conn = Connection::open(&location).map_err(|e| corrupt(e.into()))?;
        schema::migrate(&mut conn, &location).map_err(corrupt)?;
        let equivalences = Equivalence::list_all(&conn).map_err(corrupt)?;
        let migrations = SubmittedMigration::list_all(&conn).map_err(corrupt)?;

        info!(
            "Loaded {} equivalence(s) and {} submitted migration(s) from {}",
            equivalences.len(),
            migrations.len(),
            location.display()
        );

        Ok(Self {
            location,
            conn,
            equivalences,
            unsaved_equivalences: Vec::new(),
            migrations,
            unsaved_migrations: Vec::new(),
        })
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// All facts in recorded order
    pub fn equivalences(&self) -> &[Equivalence] {
        &self.equivalences
    }

    /// Facts where `repository{revision}` appears on either side
    pub fn find_equivalences(&self, repository: &str, revision: &str) -> Vec<Equivalence> {
        let target = Revision::new(repository, revision);
        self.equivalences
            .iter()
            .filter(|e| e.involves(&target))
            .cloned()
            .collect()
    }

    /// Revisions of `other_repository` recorded as equivalent to `revision`
    pub fn find_equivalent_revisions(
        &self,
        revision: &Revision,
        other_repository: &str,
    ) -> Vec<Revision> {
        self.equivalences
            .iter()
            .filter_map(|e| e.other_revision(revision))
            .filter(|other| other.repository == other_repository)
            .cloned()
            .collect()
    }

    /// Record a fact. Returns false when it was already known.
    pub fn add_equivalence(&mut self, mut equivalence: Equivalence) -> bool {
        if self.equivalences.contains(&equivalence) {
            debug!("Equivalence {} already recorded", equivalence);
            return false;
        }
        equivalence.recorded_at.get_or_insert_with(Utc::now);
        debug!("Recording equivalence {}", equivalence);
        self.equivalences.push(equivalence.clone());
        self.unsaved_equivalences.push(equivalence);
        true
    }

    pub fn submitted_migrations(&self) -> &[SubmittedMigration] {
        &self.migrations
    }

    /// Record that a draft was produced for a source revision. Returns false
    /// when one was already recorded for the same revision and destination.
    pub fn note_migration(&mut self, mut migration: SubmittedMigration) -> bool {
        if self.migrations.iter().any(|m| m.same_target(&migration)) {
            return false;
        }
        migration.recorded_at.get_or_insert_with(Utc::now);
        self.migrations.push(migration.clone());
        self.unsaved_migrations.push(migration);
        true
    }

    pub fn has_migration(&self, from_revision: &Revision, to_repository: &str) -> bool {
        self.migrations
            .iter()
            .any(|m| m.from_revision == *from_revision && m.to_repository == to_repository)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.unsaved_equivalences.is_empty() || !self.unsaved_migrations.is_empty()
    }

    /// Write every fact recorded since load (or the last save) atomically
    pub fn save(&mut self) -> Result<()> {
        if !self.has_unsaved_changes() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        for equivalence in &self.unsaved_equivalences {
            equivalence.insert_or_ignore(&tx)?;
        }
        for migration in &self.unsaved_migrations {
            migration.insert_or_ignore(&tx)?;
        }
        tx.commit()?;

        info!(
            "Saved {} equivalence(s) and {} submitted migration(s) to {}",
            self.unsaved_equivalences.len(),
            self.unsaved_migrations.len(),
            self.location.display()
        );
        self.unsaved_equivalences.clear();
        self.unsaved_migrations.clear();
        Ok(())
    }
}
