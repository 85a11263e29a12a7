// src/codebase/mod.rs

//! Materialized codebases
//!
//! A [`Codebase`] is a read-only view of a file tree on disk, tagged with the
//! project space it belongs to and the expression that produced it. Trees
//! live in scratch storage and are never modified in place; editors and
//! translators always write a new tree.

mod file;

pub use file::FileCodebaseCreator;

use crate::command::CommandError;
use crate::expression::Expression;
use crate::repository::HistoryError;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Project space given to codebases that do not declare one
pub const DEFAULT_PROJECT_SPACE: &str = "public";

/// Errors that can occur while evaluating an expression into a codebase
#[derive(Debug, Error)]
pub enum CodebaseCreationError {
    #[error("no repository named '{0}' in this project")]
    UnknownRepository(String),

    #[error("no editor named '{0}' in this project")]
    UnknownEditor(String),

    #[error("no translator from project space '{from}' to '{to}'")]
    NoTranslator { from: String, to: String },

    #[error("{creator}: missing required option '{option}'")]
    MissingOption { creator: String, option: String },

    #[error("{creator}: invalid value '{value}' for option '{option}': {reason}")]
    InvalidOption {
        creator: String,
        option: String,
        value: String,
        reason: String,
    },

    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("not a directory or supported archive (.tar, .tar.gz, .tgz): {0}")]
    UnsupportedArchive(PathBuf),

    #[error("editor '{editor}' failed: {message}")]
    Edit { editor: String, message: String },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A materialized, read-only file tree
#[derive(Debug, Clone)]
pub struct Codebase {
    path: PathBuf,
    project_space: String,
    expression: Expression,
}

impl Codebase {
    pub fn new(
        path: impl Into<PathBuf>,
        project_space: impl Into<String>,
        expression: Expression,
    ) -> Self {
        Self {
            path: path.into(),
            project_space: project_space.into(),
            expression,
        }
    }

    /// Root directory of the tree
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn project_space(&self) -> &str {
        &self.project_space
    }

    /// The expression this codebase was created from
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Absolute location of a file given its relative path
    pub fn file(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    /// All non-directory entries, as `/`-separated paths relative to the root
    pub fn relative_files(&self) -> io::Result<BTreeSet<String>> {
        list_files(&self.path)
    }
}

impl fmt::Display for Codebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

/// List files and symlinks under `root` relative to it, skipping any
/// top-level entry named in `ignore`
pub(crate) fn list_files_ignoring(root: &Path, ignore: &[&str]) -> io::Result<BTreeSet<String>> {
    let mut files = BTreeSet::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() != 1
                || !ignore
                    .iter()
                    .any(|name| entry.file_name().to_str() == Some(*name))
        });

    for entry in walker {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(io::Error::other)?;
        files.insert(relative_string(relative));
    }
    Ok(files)
}

pub(crate) fn list_files(root: &Path) -> io::Result<BTreeSet<String>> {
    list_files_ignoring(root, &[])
}

fn relative_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Copy one file or symlink, creating parent directories as needed.
/// Regular files keep their permission bits.
pub(crate) fn copy_entry(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    let meta = fs::symlink_metadata(src)?;
    if meta.file_type().is_symlink() {
        if fs::symlink_metadata(dst).is_ok() {
            fs::remove_file(dst)?;
        }
        let target = fs::read_link(src)?;
        std::os::unix::fs::symlink(target, dst)?;
    } else {
        if fs::symlink_metadata(dst).is_ok_and(|m| m.file_type().is_symlink()) {
            fs::remove_file(dst)?;
        }
        fs::copy(src, dst)?;
    }
    Ok(())
}

/// Copy every file of `src` into `dst`
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for relative in list_files(src)? {
        copy_entry(&src.join(&relative), &dst.join(&relative))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::RepositoryExpression;

    fn codebase_at(path: &Path) -> Codebase {
        Codebase::new(
            path,
            DEFAULT_PROJECT_SPACE,
            RepositoryExpression::named("test").into(),
        )
    }

    #[test]
    fn test_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("README"), "readme").unwrap();
        fs::write(dir.path().join("src/nested/lib.rs"), "fn main() {}").unwrap();

        let files = codebase_at(dir.path()).relative_files().unwrap();
        let files: Vec<_> = files.into_iter().collect();
        assert_eq!(files, vec!["README", "src/nested/lib.rs"]);
    }

    #[test]
    fn test_list_files_ignoring_top_level_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join("sub/.git")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        fs::write(dir.path().join("sub/.git/keep"), "kept").unwrap();

        let files = list_files_ignoring(dir.path(), &[".git"]).unwrap();
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["sub/.git/keep"]);
    }

    #[test]
    fn test_copy_tree_preserves_mode() {
        use std::os::unix::fs::PermissionsExt;

        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("bin")).unwrap();
        let script = src.path().join("bin/run.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        copy_tree(src.path(), dst.path()).unwrap();

        let copied = fs::metadata(dst.path().join("bin/run.sh")).unwrap();
        assert_eq!(copied.permissions().mode() & 0o111, 0o111);
    }
}
