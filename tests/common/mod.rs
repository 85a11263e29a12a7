// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use migrant::{ProjectConfig, ProjectContext, Scratch, SystemCommandRunner};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Build a project context from TOML config text, with real commands and
/// fresh scratch storage
pub fn project(toml: &str) -> ProjectContext {
    let config = ProjectConfig::parse(toml).unwrap();
    ProjectContext::from_config(
        &config,
        Arc::new(SystemCommandRunner::new()),
        Arc::new(Scratch::new().unwrap()),
    )
    .unwrap()
}

/// Write `files` (relative path, content) under `root`
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

/// Whether a `git` binary is available; tests needing one skip otherwise
pub fn have_git() -> bool {
    which::which("git").is_ok()
}

/// Run git in `dir` with a fixed identity, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(["-c", "user.name=Test User", "-c", "user.email=test@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}
