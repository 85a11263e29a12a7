// src/writer/mod.rs

//! Writers and draft revisions
//!
//! A [`Writer`] owns a working copy of a destination repository. Putting a
//! codebase into it makes the working copy's files match the codebase
//! exactly and leaves the result as a pending (uncommitted) change, the
//! [`DraftRevision`].

use crate::codebase::{Codebase, copy_entry, list_files_ignoring};
use crate::command::CommandError;
use crate::diff::{FileStatus, diff_file_sets};
use crate::repository::{HistoryError, RevisionMetadata};
use crate::ui::Ui;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Entries at the top of a working copy that belong to the VCS, not the tree
pub const VCS_METADATA: &[&str] = &[".git", ".hg", ".svn"];

/// Errors raised while creating a writer or writing into it
#[derive(Debug, Error)]
pub enum WritingError {
    #[error("no repository named '{0}' in this project")]
    UnknownRepository(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("I/O error writing draft: {0}")]
    Io(#[from] io::Error),
}

/// A pending local change produced by a writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRevision {
    /// Root of the working copy holding the change
    pub location: PathBuf,
    /// Commit message for the change, when revision metadata was supplied
    pub description: Option<String>,
    /// Number of paths added, removed or modified
    pub changed_paths: usize,
}

impl fmt::Display for DraftRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} changed path(s))",
            self.location.display(),
            self.changed_paths
        )
    }
}

/// A destination working copy that can accept a codebase as a pending change
pub trait Writer: Send {
    fn root(&self) -> &Path;

    /// Make the working copy match `codebase`. Returns `Ok(None)` when it
    /// already did.
    fn put_codebase(
        &mut self,
        codebase: &Codebase,
        metadata: Option<&RevisionMetadata>,
    ) -> Result<Option<DraftRevision>, WritingError>;
}

/// Apply `codebase` onto `writer`, reporting progress to `ui`
pub fn create_draft(
    codebase: &Codebase,
    writer: &mut dyn Writer,
    metadata: Option<&RevisionMetadata>,
    ui: &dyn Ui,
) -> Result<Option<DraftRevision>, WritingError> {
    let task = ui.push_task(
        "create_draft",
        &format!(
            "Putting '{}' into {}",
            codebase,
            writer.root().display()
        ),
    );
    match writer.put_codebase(codebase, metadata) {
        Ok(Some(draft)) => {
            ui.pop_task_and_persist(task, &draft.location.display().to_string());
            Ok(Some(draft))
        }
        Ok(None) => {
            ui.pop_task_and_persist(task, "no changes");
            Ok(None)
        }
        Err(e) => {
            ui.error(&e, "Error writing draft revision");
            ui.pop_task_and_persist(task, "failed");
            Err(e)
        }
    }
}

/// Commit message for a draft built from `metadata`
pub fn draft_description(metadata: &RevisionMetadata) -> String {
    let mut description = metadata.description.trim_end().to_string();
    if !description.is_empty() {
        description.push_str("\n\n");
    }
    description.push_str(&format!("Migrated revision {}", metadata.id));
    if !metadata.author.is_empty() {
        description.push_str(&format!("\nOriginal author: {}", metadata.author));
    }
    if !metadata.date.is_empty() {
        description.push_str(&format!("\nOriginal date: {}", metadata.date));
    }
    description
}

/// Make the tree at `root` match `codebase`, leaving top-level entries named
/// in `ignore` alone. Returns the number of paths changed.
pub(crate) fn sync_tree(codebase: &Codebase, root: &Path, ignore: &[&str]) -> io::Result<usize> {
    let source = codebase.relative_files()?;
    let current = list_files_ignoring(root, ignore)?;
    let differences = diff_file_sets(codebase.path(), &source, root, &current)?;

    // Removals first so a file replaced by a directory (or the reverse) has
    // room to land
    let mut changed = 0;
    for file in differences.iter().filter(|f| f.status == FileStatus::Added) {
        // Added relative to the codebase means present only in the working copy
        let path = root.join(&file.relative_path);
        debug!("Removing {}", path.display());
        fs::remove_file(&path)?;
        prune_empty_parents(&path, root)?;
        changed += 1;
    }

    for file in &differences {
        match file.status {
            FileStatus::Removed | FileStatus::Modified => {
                debug!("Writing {}", file.relative_path);
                copy_entry(
                    &codebase.file(&file.relative_path),
                    &root.join(&file.relative_path),
                )?;
                changed += 1;
            }
            FileStatus::Added | FileStatus::Unchanged => {}
        }
    }
    Ok(changed)
}

fn prune_empty_parents(path: &Path, root: &Path) -> io::Result<()> {
    let mut dir = path.parent();
    while let Some(current) = dir {
        if current == root || !current.starts_with(root) {
            break;
        }
        if fs::read_dir(current)?.next().is_some() {
            break;
        }
        fs::remove_dir(current)?;
        dir = current.parent();
    }
    Ok(())
}

/// A writer over a plain directory with no VCS behind it
pub struct DirectoryWriter {
    root: PathBuf,
}

impl DirectoryWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Writer for DirectoryWriter {
    fn root(&self) -> &Path {
        &self.root
    }

    fn put_codebase(
        &mut self,
        codebase: &Codebase,
        metadata: Option<&RevisionMetadata>,
    ) -> Result<Option<DraftRevision>, WritingError> {
        let changed_paths = sync_tree(codebase, &self.root, VCS_METADATA)?;
        if changed_paths == 0 {
            return Ok(None);
        }
        Ok(Some(DraftRevision {
            location: self.root.clone(),
            description: metadata.map(draft_description),
            changed_paths,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::RepositoryExpression;
    use crate::ui::SilentUi;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        dir
    }

    fn codebase(dir: &TempDir) -> Codebase {
        Codebase::new(dir.path(), "public", RepositoryExpression::named("src").into())
    }

    #[test]
    fn test_put_codebase_syncs_tree() {
        let source = tree(&[("keep", "1"), ("changed", "new"), ("dir/added", "a")]);
        let dest = tree(&[("keep", "1"), ("changed", "old"), ("old/removed", "r"), (".git/HEAD", "ref")]);

        let mut writer = DirectoryWriter::new(dest.path());
        let draft = writer.put_codebase(&codebase(&source), None).unwrap().unwrap();

        assert_eq!(draft.location, dest.path());
        assert_eq!(draft.changed_paths, 3);
        assert_eq!(fs::read_to_string(dest.path().join("changed")).unwrap(), "new");
        assert_eq!(fs::read_to_string(dest.path().join("dir/added")).unwrap(), "a");
        assert!(!dest.path().join("old").exists());
        assert!(dest.path().join(".git/HEAD").exists());
    }

    #[test]
    fn test_identical_tree_is_noop() {
        let source = tree(&[("a", "1"), ("b/c", "2")]);
        let dest = tree(&[("a", "1"), ("b/c", "2")]);

        let mut writer = DirectoryWriter::new(dest.path());
        let draft = create_draft(&codebase(&source), &mut writer, None, &SilentUi::new()).unwrap();
        assert!(draft.is_none());
    }

    #[test]
    fn test_executable_bit_is_synced() {
        let source = tree(&[("run.sh", "#!/bin/sh\n")]);
        let dest = tree(&[("run.sh", "#!/bin/sh\n")]);
        fs::set_permissions(source.path().join("run.sh"), fs::Permissions::from_mode(0o755)).unwrap();

        let mut writer = DirectoryWriter::new(dest.path());
        assert!(writer.put_codebase(&codebase(&source), None).unwrap().is_some());

        let mode = fs::metadata(dest.path().join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_file_replaced_by_directory() {
        let source = tree(&[("thing/inner", "x")]);
        let dest = tree(&[("thing", "was a file")]);

        let mut writer = DirectoryWriter::new(dest.path());
        writer.put_codebase(&codebase(&source), None).unwrap().unwrap();
        assert_eq!(fs::read_to_string(dest.path().join("thing/inner")).unwrap(), "x");
    }

    #[test]
    fn test_description_from_metadata() {
        let metadata = RevisionMetadata {
            id: "a983ef".to_string(),
            author: "dev@example.com".to_string(),
            date: "2024-01-01".to_string(),
            description: "Fix the frobnicator\n".to_string(),
            parents: Vec::new(),
        };
        let description = draft_description(&metadata);
        assert!(description.starts_with("Fix the frobnicator\n\nMigrated revision a983ef"));
        assert!(description.contains("Original author: dev@example.com"));
    }
}
