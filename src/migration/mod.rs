// src/migration/mod.rs

//! Migrations: units of work moving source revisions into a destination
//!
//! A [`MigrationConfig`] names a source and a destination repository. The
//! [`Migrator`] compares the source history with the equivalence database
//! and lists the revisions not yet reflected in the destination, each as a
//! [`Migration`].

mod migrator;

pub use migrator::Migrator;

use crate::db::Equivalence;
use crate::expression::{Expression, RepositoryExpression};
use crate::repository::{HistoryError, Revision};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while finding migrations
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("no migration named '{0}' in this project")]
    UnknownMigration(String),

    #[error("migration '{migration}': source repository '{repository}' is not in this project")]
    UnknownSource { migration: String, repository: String },

    #[error("migration '{migration}': destination repository '{repository}' is not in this project")]
    UnknownDestination { migration: String, repository: String },

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Direction of a migration pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    pub name: String,
    pub from_repository: String,
    pub to_repository: String,
}

impl MigrationConfig {
    pub fn new(
        name: impl Into<String>,
        from_repository: impl Into<String>,
        to_repository: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_repository: from_repository.into(),
            to_repository: to_repository.into(),
        }
    }
}

/// One source revision still to be reflected in the destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Migration {
    pub from_revision: Revision,
    pub config_name: String,
    pub to_repository: String,
    /// Project space of the destination repository
    pub to_project_space: String,
    /// Most recent recorded equivalence the walk stopped at, if any
    pub baseline: Option<Equivalence>,
}

impl Migration {
    /// `from(revision=r)>space`: the source revision translated into the
    /// destination's project space
    pub fn codebase_expression(&self) -> Expression {
        Expression::from(
            RepositoryExpression::named(&self.from_revision.repository)
                .at_revision(&self.from_revision.id),
        )
        .translate_to(&self.to_project_space)
    }

    /// The destination repository as a writer expression
    pub fn writer_expression(&self) -> RepositoryExpression {
        RepositoryExpression::named(&self.to_repository)
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from_revision, self.to_repository)?;
        if let Some(baseline) = &self.baseline {
            write!(f, " (since {})", baseline)?;
        }
        Ok(())
    }
}
