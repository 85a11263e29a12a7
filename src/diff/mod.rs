// src/diff/mod.rs

//! Differences between two codebases
//!
//! Comparison is by exact relative path and byte-exact content; no line
//! ending or encoding normalization happens. The executable bit is
//! compared as well, so a file that only changed mode is `Modified`.

mod render;

pub use render::PatchRenderer;

use crate::codebase::{Codebase, list_files};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Status of one path across the two codebases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    /// Only in the second codebase
    Added,
    /// Only in the first codebase
    Removed,
    /// In both, with different content or executable bit
    Modified,
    Unchanged,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Removed => "removed",
            FileStatus::Modified => "modified",
            FileStatus::Unchanged => "unchanged",
        }
    }
}

/// Per-path comparison result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDifference {
    pub relative_path: String,
    pub status: FileStatus,
    /// Executable bit in (first, second); `None` on the side without the file
    pub executable: (Option<bool>, Option<bool>),
    pub content_differs: bool,
}

impl FileDifference {
    pub fn is_different(&self) -> bool {
        self.status != FileStatus::Unchanged
    }

    pub fn executable_changed(&self) -> bool {
        matches!(self.executable, (Some(a), Some(b)) if a != b)
    }
}

/// The structured result of comparing two codebases
#[derive(Debug, Clone)]
pub struct CodebaseDifference {
    pub codebase1: Codebase,
    pub codebase2: Codebase,
    /// Every path found in either codebase, sorted
    pub files: Vec<FileDifference>,
}

impl CodebaseDifference {
    pub fn are_different(&self) -> bool {
        self.files.iter().any(FileDifference::is_different)
    }

    /// Paths that differ, each exactly once, in sorted order
    pub fn changed_files(&self) -> impl Iterator<Item = &FileDifference> {
        self.files.iter().filter(|f| f.is_different())
    }

    pub fn status_of(&self, relative_path: &str) -> Option<FileStatus> {
        self.files
            .iter()
            .find(|f| f.relative_path == relative_path)
            .map(|f| f.status)
    }
}

/// Compare two codebases file by file
pub fn diff_codebases(codebase1: &Codebase, codebase2: &Codebase) -> io::Result<CodebaseDifference> {
    let files = diff_trees(codebase1.path(), codebase2.path())?;
    Ok(CodebaseDifference {
        codebase1: codebase1.clone(),
        codebase2: codebase2.clone(),
        files,
    })
}

/// Compare two directory trees; shared with the writers, which compare a
/// codebase against a working copy
pub(crate) fn diff_trees(root1: &Path, root2: &Path) -> io::Result<Vec<FileDifference>> {
    diff_file_sets(root1, &list_files(root1)?, root2, &list_files(root2)?)
}

pub(crate) fn diff_file_sets(
    root1: &Path,
    files1: &BTreeSet<String>,
    root2: &Path,
    files2: &BTreeSet<String>,
) -> io::Result<Vec<FileDifference>> {
    let mut differences = Vec::with_capacity(files1.len().max(files2.len()));
    for relative in files1.union(files2) {
        differences.push(diff_file(
            relative,
            files1.contains(relative).then(|| root1.join(relative)).as_deref(),
            files2.contains(relative).then(|| root2.join(relative)).as_deref(),
        )?);
    }
    Ok(differences)
}

fn diff_file(relative: &str, file1: Option<&Path>, file2: Option<&Path>) -> io::Result<FileDifference> {
    let exec1 = file1.map(is_executable).transpose()?;
    let exec2 = file2.map(is_executable).transpose()?;

    let (status, content_differs) = match (file1, file2) {
        (Some(a), Some(b)) => {
            let content_differs = read_entry(a)? != read_entry(b)?;
            let status = if content_differs || exec1 != exec2 {
                FileStatus::Modified
            } else {
                FileStatus::Unchanged
            };
            (status, content_differs)
        }
        (Some(_), None) => (FileStatus::Removed, true),
        (None, Some(_)) => (FileStatus::Added, true),
        (None, None) => (FileStatus::Unchanged, false),
    };

    Ok(FileDifference {
        relative_path: relative.to_string(),
        status,
        executable: (exec1, exec2),
        content_differs,
    })
}

/// Bytes of a file, or of a symlink's target path
pub(crate) fn read_entry(path: &Path) -> io::Result<Vec<u8>> {
    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() {
        Ok(fs::read_link(path)?.to_string_lossy().into_owned().into_bytes())
    } else {
        fs::read(path)
    }
}

fn is_executable(path: &Path) -> io::Result<bool> {
    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() {
        return Ok(false);
    }
    Ok(meta.permissions().mode() & 0o111 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::RepositoryExpression;
    use tempfile::TempDir;

    fn tree(files: &[(&str, &str)]) -> (TempDir, Codebase) {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let codebase = Codebase::new(
            dir.path(),
            "public",
            RepositoryExpression::named("file")
                .with_option("path", dir.path().to_str().unwrap())
                .into(),
        );
        (dir, codebase)
    }

    #[test]
    fn test_identical_codebase() {
        let (_dir, a) = tree(&[("foo.txt", "x"), ("dir/bar.txt", "y")]);
        let diff = diff_codebases(&a, &a).unwrap();
        assert!(!diff.are_different());
        assert_eq!(diff.files.len(), 2);
        assert_eq!(diff.changed_files().count(), 0);
    }

    #[test]
    fn test_statuses() {
        let (_d1, a) = tree(&[("same", "1"), ("gone", "2"), ("changed", "3")]);
        let (_d2, b) = tree(&[("same", "1"), ("changed", "4"), ("new", "5")]);

        let diff = diff_codebases(&a, &b).unwrap();
        assert!(diff.are_different());
        assert_eq!(diff.status_of("same"), Some(FileStatus::Unchanged));
        assert_eq!(diff.status_of("gone"), Some(FileStatus::Removed));
        assert_eq!(diff.status_of("changed"), Some(FileStatus::Modified));
        assert_eq!(diff.status_of("new"), Some(FileStatus::Added));

        let changed: Vec<_> = diff.changed_files().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(changed, vec!["changed", "gone", "new"]);
    }

    #[test]
    fn test_line_endings_are_not_normalized() {
        let (_d1, a) = tree(&[("file", "line\n")]);
        let (_d2, b) = tree(&[("file", "line\r\n")]);
        let diff = diff_codebases(&a, &b).unwrap();
        assert_eq!(diff.status_of("file"), Some(FileStatus::Modified));
    }

    #[test]
    fn test_executable_bit_only() {
        let (d1, a) = tree(&[("run.sh", "#!/bin/sh\n")]);
        let (_d2, b) = tree(&[("run.sh", "#!/bin/sh\n")]);
        fs::set_permissions(d1.path().join("run.sh"), fs::Permissions::from_mode(0o755)).unwrap();

        let diff = diff_codebases(&a, &b).unwrap();
        let file = &diff.files[0];
        assert_eq!(file.status, FileStatus::Modified);
        assert!(!file.content_differs);
        assert!(file.executable_changed());
    }
}
