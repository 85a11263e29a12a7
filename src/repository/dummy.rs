// src/repository/dummy.rs

//! The `dummy` backend
//!
//! A repository whose history is a fixed list of revisions and whose content
//! is an optional fixed directory. Useful for checking a project
//! configuration without touching a real VCS, and as a test double.

use super::{
    CodebaseCreator, HistoryError, RepositoryType, Revision, RevisionHistory, RevisionMetadata,
    WriterCreator,
};
use crate::codebase::{Codebase, CodebaseCreationError, copy_tree};
use crate::expression::{Options, REVISION_OPTION, RepositoryExpression, Term};
use crate::scratch::Scratch;
use crate::writer::{DirectoryWriter, Writer, WritingError};
use std::path::PathBuf;
use std::sync::Arc;

/// One revision of a dummy history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyRevision {
    pub id: String,
    /// Parent ids, first parent first
    pub parents: Vec<String>,
    pub author: String,
    pub description: String,
}

impl DummyRevision {
    pub fn new(id: impl Into<String>, parents: &[&str]) -> Self {
        let id = id.into();
        Self {
            description: format!("Revision {}", id),
            id,
            parents: parents.iter().map(|p| p.to_string()).collect(),
            author: "dummy".to_string(),
        }
    }
}

pub struct DummyRepository {
    name: String,
    project_space: String,
    /// Oldest first; the last entry is the head
    revisions: Vec<DummyRevision>,
    path: Option<PathBuf>,
    scratch: Arc<Scratch>,
}

impl DummyRepository {
    /// A repository with a linear history, `ids` oldest first
    pub fn linear(
        name: impl Into<String>,
        project_space: impl Into<String>,
        ids: &[&str],
        scratch: Arc<Scratch>,
    ) -> Self {
        let revisions = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let parents: &[&str] = if i == 0 { &[] } else { &ids[i - 1..i] };
                DummyRevision::new(*id, parents)
            })
            .collect();
        Self::with_history(name, project_space, revisions, scratch)
    }

    /// A repository with an arbitrary history; the last revision is the head
    pub fn with_history(
        name: impl Into<String>,
        project_space: impl Into<String>,
        revisions: Vec<DummyRevision>,
        scratch: Arc<Scratch>,
    ) -> Self {
        Self {
            name: name.into(),
            project_space: project_space.into(),
            revisions,
            path: None,
            scratch,
        }
    }

    /// Serve the directory at `path` as the content of every revision
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn into_repository_type(self) -> RepositoryType {
        let name = self.name.clone();
        let project_space = self.project_space.clone();
        let repo = Arc::new(self);
        RepositoryType::new(name, project_space, repo.clone(), repo.clone(), repo)
    }

    fn find(&self, id: &str) -> Option<&DummyRevision> {
        self.revisions.iter().find(|r| r.id == id)
    }

    fn unknown(&self, id: &str) -> HistoryError {
        HistoryError::UnknownRevision {
            repository: self.name.clone(),
            revision: id.to_string(),
        }
    }
}

impl RevisionHistory for DummyRepository {
    fn find_head_revision(&self, id: Option<&str>) -> Result<Option<Revision>, HistoryError> {
        match id {
            None => Ok(self
                .revisions
                .last()
                .map(|r| Revision::new(&self.name, &r.id))),
            Some(id) => self
                .find(id)
                .map(|r| Some(Revision::new(&self.name, &r.id)))
                .ok_or_else(|| self.unknown(id)),
        }
    }

    fn metadata(&self, revision: &Revision) -> Result<RevisionMetadata, HistoryError> {
        let found = self.find(&revision.id).ok_or_else(|| self.unknown(&revision.id))?;
        Ok(RevisionMetadata {
            id: found.id.clone(),
            author: found.author.clone(),
            date: String::new(),
            description: found.description.clone(),
            parents: found
                .parents
                .iter()
                .map(|p| Revision::new(&self.name, p))
                .collect(),
        })
    }
}

impl CodebaseCreator for DummyRepository {
    fn create(&self, options: &Options) -> Result<Codebase, CodebaseCreationError> {
        let revision = self
            .find_head_revision(options.get(REVISION_OPTION))?
            .map(|r| r.id);

        let path = match &self.path {
            Some(path) if !path.is_dir() => {
                return Err(CodebaseCreationError::NotFound(path.clone()));
            }
            Some(path) => path.clone(),
            None => self.scratch.dir(&format!("dummy_{}", self.name))?,
        };

        let mut term = Term::new(&self.name, options.clone());
        if let Some(revision) = revision {
            term = term.with_option(REVISION_OPTION, revision);
        }
        Ok(Codebase::new(
            path,
            &self.project_space,
            RepositoryExpression::new(term).into(),
        ))
    }
}

impl WriterCreator for DummyRepository {
    fn create(&self, _options: &Options) -> Result<Box<dyn Writer>, WritingError> {
        let root = self.scratch.dir(&format!("dummy_writer_{}", self.name))?;
        if let Some(path) = &self.path {
            copy_tree(path, &root)?;
        }
        Ok(Box::new(DirectoryWriter::new(root)))
    }
}
