// src/editor/renamer.rs

//! Path renaming editor
//!
//! Mappings are tried in order and the first match wins. In prefix mode a
//! mapping `from` matches a path equal to it or under it as a directory;
//! in regex mode `from` is a regular expression and `to` may use capture
//! groups (`$1`, `${name}`).

use super::Editor;
use crate::codebase::{Codebase, CodebaseCreationError, copy_entry};
use crate::expression::Options;
use crate::scratch::Scratch;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameMapping {
    pub from: String,
    pub to: String,
}

enum Matcher {
    Prefix(String),
    Regex(Regex),
}

pub struct RenamerEditor {
    name: String,
    mappings: Vec<(Matcher, String)>,
    keep_unmatched: bool,
    scratch: Arc<Scratch>,
}

impl RenamerEditor {
    /// Build a renamer; fails if a regex mapping does not compile
    pub fn new(
        name: impl Into<String>,
        mappings: &[RenameMapping],
        regex: bool,
        keep_unmatched: bool,
        scratch: Arc<Scratch>,
    ) -> Result<Self, regex::Error> {
        let mappings = mappings
            .iter()
            .map(|m| {
                let matcher = if regex {
                    Matcher::Regex(Regex::new(&m.from)?)
                } else {
                    Matcher::Prefix(m.from.trim_end_matches('/').to_string())
                };
                Ok((matcher, m.to.clone()))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            name: name.into(),
            mappings,
            keep_unmatched,
            scratch,
        })
    }

    /// New location of `path`, or `None` if it is dropped
    fn rename(&self, path: &str) -> Option<String> {
        for (matcher, to) in &self.mappings {
            let renamed = match matcher {
                Matcher::Prefix(from) => rename_prefix(path, from, to),
                Matcher::Regex(re) => re
                    .is_match(path)
                    .then(|| re.replace(path, to.as_str()).into_owned()),
            };
            if let Some(renamed) = renamed {
                return Some(renamed.trim_start_matches('/').to_string());
            }
        }
        self.keep_unmatched.then(|| path.to_string())
    }
}

fn rename_prefix(path: &str, from: &str, to: &str) -> Option<String> {
    if from.is_empty() {
        return Some(join(to, path));
    }
    let rest = path.strip_prefix(from)?;
    if rest.is_empty() {
        Some(to.trim_end_matches('/').to_string())
    } else {
        rest.strip_prefix('/').map(|rest| join(to, rest))
    }
}

fn join(dir: &str, rest: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", dir, rest)
    }
}

impl Editor for RenamerEditor {
    fn describe(&self) -> String {
        format!("renamer({} mappings)", self.mappings.len())
    }

    fn edit(&self, input: &Codebase, _options: &Options) -> Result<PathBuf, CodebaseCreationError> {
        let mut moves = BTreeMap::new();
        for path in input.relative_files()? {
            let Some(target) = self.rename(&path) else {
                debug!("Renamer '{}' drops {}", self.name, path);
                continue;
            };
            if target.is_empty() {
                return Err(CodebaseCreationError::Edit {
                    editor: self.name.clone(),
                    message: format!("'{}' renamed to an empty path", path),
                });
            }
            if let Some(previous) = moves.insert(target.clone(), path.clone()) {
                return Err(CodebaseCreationError::Edit {
                    editor: self.name.clone(),
                    message: format!("'{}' and '{}' both rename to '{}'", previous, path, target),
                });
            }
        }

        let dest = self.scratch.dir("renamer")?;
        for (target, source) in &moves {
            copy_entry(&input.file(source), &dest.join(target))?;
        }
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::RepositoryExpression;
    use std::fs;
    use tempfile::TempDir;

    fn input(files: &[&str]) -> (TempDir, Codebase) {
        let dir = tempfile::tempdir().unwrap();
        for path in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, path).unwrap();
        }
        let codebase = Codebase::new(dir.path(), "internal", RepositoryExpression::named("x").into());
        (dir, codebase)
    }

    fn mapping(from: &str, to: &str) -> RenameMapping {
        RenameMapping {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    fn scratch() -> Arc<Scratch> {
        Arc::new(Scratch::new().unwrap())
    }

    #[test]
    fn test_prefix_rename() {
        let (_dir, codebase) = input(&["internal/lib.rs", "internal_notes.txt", "README"]);
        let renamer = RenamerEditor::new("r", &[mapping("internal/", "src")], false, true, scratch()).unwrap();

        let out = renamer.edit(&codebase, &Options::new()).unwrap();
        assert_eq!(fs::read_to_string(out.join("src/lib.rs")).unwrap(), "internal/lib.rs");
        // Prefix only matches whole directory names
        assert!(out.join("internal_notes.txt").exists());
        assert!(out.join("README").exists());
    }

    #[test]
    fn test_first_mapping_wins_and_unmatched_dropped() {
        let (_dir, codebase) = input(&["a/x", "a/b/y", "c"]);
        let renamer = RenamerEditor::new(
            "r",
            &[mapping("a/b", "deep"), mapping("a", "shallow")],
            false,
            false,
            scratch(),
        )
        .unwrap();

        let out = renamer.edit(&codebase, &Options::new()).unwrap();
        assert!(out.join("deep/y").exists());
        assert!(out.join("shallow/x").exists());
        assert!(!out.join("c").exists());
    }

    #[test]
    fn test_regex_rename() {
        let (_dir, codebase) = input(&["java/com/google/Foo.java"]);
        let renamer = RenamerEditor::new(
            "r",
            &[mapping(r"^java/com/google/(.*)$", "src/$1")],
            true,
            true,
            scratch(),
        )
        .unwrap();

        let out = renamer.edit(&codebase, &Options::new()).unwrap();
        assert!(out.join("src/Foo.java").exists());
    }

    #[test]
    fn test_collision_is_an_error() {
        let (_dir, codebase) = input(&["a/x", "b/x"]);
        let renamer = RenamerEditor::new(
            "r",
            &[mapping("a", "c"), mapping("b", "c")],
            false,
            true,
            scratch(),
        )
        .unwrap();

        let err = renamer.edit(&codebase, &Options::new()).unwrap_err();
        assert!(matches!(err, CodebaseCreationError::Edit { .. }));
    }

    #[test]
    fn test_bad_regex() {
        assert!(RenamerEditor::new("r", &[mapping("(", "x")], true, true, scratch()).is_err());
    }
}
