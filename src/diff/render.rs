// src/diff/render.rs

//! Unified-diff rendering of a [`CodebaseDifference`]

use super::{CodebaseDifference, FileDifference, FileStatus, read_entry};
use std::fmt::Write;
use std::io;

/// Renders differences as patch text, one section per changed path
#[derive(Debug, Default, Clone, Copy)]
pub struct PatchRenderer;

impl PatchRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, diff: &CodebaseDifference) -> io::Result<String> {
        let mut out = String::new();
        for file in diff.changed_files() {
            self.render_file(diff, file, &mut out)?;
        }
        Ok(out)
    }

    fn render_file(
        &self,
        diff: &CodebaseDifference,
        file: &FileDifference,
        out: &mut String,
    ) -> io::Result<()> {
        let path = &file.relative_path;
        // Writing to a String cannot fail
        let _ = writeln!(out, "diff --migrant a/{} b/{}", path, path);

        match file.executable {
            (Some(false), Some(true)) => {
                let _ = writeln!(out, "<<< a/{}: not executable", path);
                let _ = writeln!(out, ">>> b/{}: executable", path);
            }
            (Some(true), Some(false)) => {
                let _ = writeln!(out, "<<< a/{}: executable", path);
                let _ = writeln!(out, ">>> b/{}: not executable", path);
            }
            _ => {}
        }

        if !file.content_differs {
            return Ok(());
        }

        let before = match file.status {
            FileStatus::Added => Vec::new(),
            _ => read_entry(&diff.codebase1.file(path))?,
        };
        let after = match file.status {
            FileStatus::Removed => Vec::new(),
            _ => read_entry(&diff.codebase2.file(path))?,
        };

        let old_name = if file.status == FileStatus::Added {
            "/dev/null".to_string()
        } else {
            format!("a/{}", path)
        };
        let new_name = if file.status == FileStatus::Removed {
            "/dev/null".to_string()
        } else {
            format!("b/{}", path)
        };

        match (std::str::from_utf8(&before), std::str::from_utf8(&after)) {
            (Ok(before), Ok(after)) => {
                let _ = writeln!(out, "--- {}", old_name);
                let _ = writeln!(out, "+++ {}", new_name);
                let patch = diffy::create_patch(before, after).to_string();
                // diffy emits its own ---/+++ header; keep only the hunks
                for line in patch.lines().skip_while(|l| !l.starts_with("@@")) {
                    let _ = writeln!(out, "{}", line);
                }
            }
            _ => {
                let _ = writeln!(out, "Binary files {} and {} differ", old_name, new_name);
            }
        }
        Ok(())
    }
}
