// src/repository/mod.rs

//! Repository backends
//!
//! A backend is described by three capabilities: its revision history, a
//! codebase creator (read a revision into a codebase) and a writer creator
//! (check out a working copy that can accept new content). A
//! [`RepositoryType`] bundles one implementation of each under the name the
//! project configuration gives the repository.
//!
//! Backends:
//! - `git`: shells out to the `git` binary
//! - `dummy`: static history, serves a fixed directory; for dry runs and tests

pub mod dummy;
pub mod git;

pub use dummy::DummyRepository;
pub use git::GitRepository;

use crate::codebase::{Codebase, CodebaseCreationError};
use crate::command::CommandError;
use crate::expression::Options;
use crate::writer::{Writer, WritingError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A revision of a named repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Revision {
    pub repository: String,
    pub id: String,
}

impl Revision {
    pub fn new(repository: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            id: id.into(),
        }
    }

    /// Parse `name{rev}`, the form used on the command line
    pub fn parse(s: &str) -> Option<Self> {
        let (repository, rest) = s.split_once('{')?;
        let id = rest.strip_suffix('}')?;
        if repository.is_empty() || id.is_empty() || id.contains(['{', '}']) {
            return None;
        }
        Some(Self::new(repository, id))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}}}", self.repository, self.id)
    }
}

/// Descriptive data about a revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMetadata {
    pub id: String,
    pub author: String,
    pub date: String,
    pub description: String,
    /// Parent revisions, first parent first
    pub parents: Vec<Revision>,
}

/// Errors raised while reading repository history
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("unknown revision '{revision}' in repository '{repository}'")]
    UnknownRevision { repository: String, revision: String },

    #[error("cannot parse history output of '{repository}': {message}")]
    Malformed { repository: String, message: String },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("I/O error reading history: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to a repository's revision graph
pub trait RevisionHistory: Send + Sync {
    /// The revision named `id`, or the head of the tracked branch when `id`
    /// is `None`. Returns `Ok(None)` for a repository with no revisions.
    fn find_head_revision(&self, id: Option<&str>) -> Result<Option<Revision>, HistoryError>;

    fn metadata(&self, revision: &Revision) -> Result<RevisionMetadata, HistoryError>;
}

/// Realizes repository checkouts as codebases
pub trait CodebaseCreator: Send + Sync {
    fn create(&self, options: &Options) -> Result<Codebase, CodebaseCreationError>;
}

/// Realizes repository checkouts as writers
pub trait WriterCreator: Send + Sync {
    fn create(&self, options: &Options) -> Result<Box<dyn Writer>, WritingError>;
}

/// A configured repository: name, project space and backend capabilities
#[derive(Clone)]
pub struct RepositoryType {
    name: String,
    project_space: String,
    history: Arc<dyn RevisionHistory>,
    codebase_creator: Arc<dyn CodebaseCreator>,
    writer_creator: Arc<dyn WriterCreator>,
}

impl RepositoryType {
    pub fn new(
        name: impl Into<String>,
        project_space: impl Into<String>,
        history: Arc<dyn RevisionHistory>,
        codebase_creator: Arc<dyn CodebaseCreator>,
        writer_creator: Arc<dyn WriterCreator>,
    ) -> Self {
        Self {
            name: name.into(),
            project_space: project_space.into(),
            history,
            codebase_creator,
            writer_creator,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_space(&self) -> &str {
        &self.project_space
    }

    pub fn revision_history(&self) -> &dyn RevisionHistory {
        self.history.as_ref()
    }

    pub fn codebase_creator(&self) -> &dyn CodebaseCreator {
        self.codebase_creator.as_ref()
    }

    pub fn writer_creator(&self) -> &dyn WriterCreator {
        self.writer_creator.as_ref()
    }
}

impl fmt::Debug for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryType")
            .field("name", &self.name)
            .field("project_space", &self.project_space)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_parse() {
        let rev = Revision::parse("internal{a983ef}").unwrap();
        assert_eq!(rev.repository, "internal");
        assert_eq!(rev.id, "a983ef");
        assert_eq!(rev.to_string(), "internal{a983ef}");
    }

    #[test]
    fn test_revision_parse_errors() {
        assert!(Revision::parse("internal").is_none());
        assert!(Revision::parse("{a}").is_none());
        assert!(Revision::parse("internal{}").is_none());
        assert!(Revision::parse("internal{a").is_none());
        assert!(Revision::parse("internal{a}}").is_none());
    }
}
