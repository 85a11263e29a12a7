// src/editor/filter.rs

//! Glob filter editor
//!
//! A file is kept when it matches at least one `include` pattern (or there
//! are none) and no `exclude` pattern. `*` does not cross `/`; use `**` for
//! any depth.

use super::Editor;
use crate::codebase::{Codebase, CodebaseCreationError, copy_entry};
use crate::expression::Options;
use crate::scratch::Scratch;
use glob::{MatchOptions, Pattern, PatternError};
use std::path::PathBuf;
use std::sync::Arc;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

pub struct FilterEditor {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    scratch: Arc<Scratch>,
}

impl FilterEditor {
    pub fn new(
        include: &[String],
        exclude: &[String],
        scratch: Arc<Scratch>,
    ) -> Result<Self, PatternError> {
        let compile = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| Pattern::new(p))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
            scratch,
        })
    }

    pub fn keeps(&self, path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| p.matches_with(path, MATCH_OPTIONS));
        included && !self.exclude.iter().any(|p| p.matches_with(path, MATCH_OPTIONS))
    }
}

impl Editor for FilterEditor {
    fn describe(&self) -> String {
        format!(
            "filter({} include, {} exclude)",
            self.include.len(),
            self.exclude.len()
        )
    }

    fn edit(&self, input: &Codebase, _options: &Options) -> Result<PathBuf, CodebaseCreationError> {
        let dest = self.scratch.dir("filter")?;
        for path in input.relative_files()? {
            if self.keeps(&path) {
                copy_entry(&input.file(&path), &dest.join(&path))?;
            }
        }
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::RepositoryExpression;
    use std::fs;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn filter(include: &[&str], exclude: &[&str]) -> FilterEditor {
        FilterEditor::new(
            &strings(include),
            &strings(exclude),
            Arc::new(Scratch::new().unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_keeps() {
        let f = filter(&["src/**", "README*"], &["**/*_internal.rs"]);
        assert!(f.keeps("src/lib.rs"));
        assert!(f.keeps("src/deep/mod.rs"));
        assert!(f.keeps("README.md"));
        assert!(!f.keeps("src/secret_internal.rs"));
        assert!(!f.keeps("docs/guide.md"));
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let f = filter(&["*.txt"], &[]);
        assert!(f.keeps("top.txt"));
        assert!(!f.keeps("nested/deep.txt"));
    }

    #[test]
    fn test_no_include_keeps_everything_not_excluded() {
        let f = filter(&[], &["*.log"]);
        assert!(f.keeps("anything/at/all"));
        assert!(!f.keeps("build.log"));
    }

    #[test]
    fn test_edit_writes_filtered_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "lib").unwrap();
        fs::write(dir.path().join("notes.txt"), "notes").unwrap();
        let input = Codebase::new(dir.path(), "public", RepositoryExpression::named("x").into());

        let filter = filter(&["src/**"], &[]);
        let out = filter.edit(&input, &Options::new()).unwrap();
        assert!(out.join("src/lib.rs").exists());
        assert!(!out.join("notes.txt").exists());
    }

    #[test]
    fn test_bad_pattern() {
        assert!(FilterEditor::new(&strings(&["[unclosed"]), &[], Arc::new(Scratch::new().unwrap())).is_err());
    }
}
