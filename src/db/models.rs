// src/db/models.rs

//! Records stored in the equivalence database

use super::Result;
use crate::repository::Revision;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Two revisions, in different repositories, known to hold the same state
///
/// Equivalence is symmetric: `a ≡ b` equals `b ≡ a`. The timestamp is an
/// ordering marker only and takes no part in equality.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Equivalence {
    pub revision1: Revision,
    pub revision2: Revision,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl Equivalence {
    pub fn new(revision1: Revision, revision2: Revision) -> Self {
        Self {
            revision1,
            revision2,
            recorded_at: None,
        }
    }

    /// Sides in canonical order, used for equality, hashing and storage
    fn canonical(&self) -> (&Revision, &Revision) {
        if self.revision1 <= self.revision2 {
            (&self.revision1, &self.revision2)
        } else {
            (&self.revision2, &self.revision1)
        }
    }

    pub fn involves(&self, revision: &Revision) -> bool {
        self.revision1 == *revision || self.revision2 == *revision
    }

    /// The side opposite `revision`, if `revision` is one of the sides
    pub fn other_revision(&self, revision: &Revision) -> Option<&Revision> {
        if self.revision1 == *revision {
            Some(&self.revision2)
        } else if self.revision2 == *revision {
            Some(&self.revision1)
        } else {
            None
        }
    }

    /// Insert this equivalence, ignoring it if already stored
    pub fn insert_or_ignore(&self, conn: &Connection) -> Result<bool> {
        let (a, b) = self.canonical();
        let recorded_at = self.recorded_at.unwrap_or_else(Utc::now);
        let changed = conn.execute(
            "INSERT OR IGNORE INTO equivalences
             (repository1, revision1, repository2, revision2, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &a.repository,
                &a.id,
                &b.repository,
                &b.id,
                recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    /// All stored equivalences in the order they were recorded
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT repository1, revision1, repository2, revision2, recorded_at
             FROM equivalences ORDER BY id",
        )?;

        let equivalences = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(equivalences)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let recorded_at: String = row.get(4)?;
        Ok(Self {
            revision1: Revision::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
            revision2: Revision::new(row.get::<_, String>(2)?, row.get::<_, String>(3)?),
            recorded_at: parse_timestamp(&recorded_at),
        })
    }
}

impl PartialEq for Equivalence {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Hash for Equivalence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for Equivalence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} == {}", self.revision1, self.revision2)
    }
}

/// A source revision a draft has been produced for
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct SubmittedMigration {
    pub from_revision: Revision,
    pub to_repository: String,
    /// Where the draft was written, or another short description of it
    pub draft: String,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl SubmittedMigration {
    pub fn new(from_revision: Revision, to_repository: impl Into<String>, draft: impl Into<String>) -> Self {
        Self {
            from_revision,
            to_repository: to_repository.into(),
            draft: draft.into(),
            recorded_at: None,
        }
    }

    /// Same source revision and destination
    pub fn same_target(&self, other: &Self) -> bool {
        self.from_revision == other.from_revision && self.to_repository == other.to_repository
    }

    pub fn insert_or_ignore(&self, conn: &Connection) -> Result<bool> {
        let recorded_at = self.recorded_at.unwrap_or_else(Utc::now);
        let changed = conn.execute(
            "INSERT OR IGNORE INTO submitted_migrations
             (from_repository, from_revision, to_repository, draft, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &self.from_revision.repository,
                &self.from_revision.id,
                &self.to_repository,
                &self.draft,
                recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT from_repository, from_revision, to_repository, draft, recorded_at
             FROM submitted_migrations ORDER BY id",
        )?;

        let migrations = stmt
            .query_map([], |row| {
                let recorded_at: String = row.get(4)?;
                Ok(Self {
                    from_revision: Revision::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                    to_repository: row.get(2)?,
                    draft: row.get(3)?,
                    recorded_at: parse_timestamp(&recorded_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(migrations)
    }
}

impl PartialEq for SubmittedMigration {
    fn eq(&self, other: &Self) -> bool {
        self.same_target(other) && self.draft == other.draft
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
