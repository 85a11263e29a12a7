// src/editor/shell.rs

//! Shell command editor
//!
//! Copies the codebase into scratch storage, then runs `sh -c <command>`
//! inside the copy. Term options reach the script as positional arguments
//! `key=value`, in option order (`$1`, `$2`, ...).

use super::Editor;
use crate::codebase::{Codebase, CodebaseCreationError, copy_tree};
use crate::command::CommandRunner;
use crate::expression::Options;
use crate::scratch::Scratch;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// `$0` of the script
const SCRIPT_NAME: &str = "migrant-edit";

pub struct ShellEditor {
    name: String,
    command: String,
    runner: Arc<dyn CommandRunner>,
    scratch: Arc<Scratch>,
}

impl ShellEditor {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
        scratch: Arc<Scratch>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            runner,
            scratch,
        }
    }
}

impl Editor for ShellEditor {
    fn describe(&self) -> String {
        format!("shell({})", self.command)
    }

    fn edit(&self, input: &Codebase, options: &Options) -> Result<PathBuf, CodebaseCreationError> {
        let dest = self.scratch.dir(&format!("shell_{}", self.name))?;
        copy_tree(input.path(), &dest)?;

        let mut args = vec![
            "-c".to_string(),
            self.command.clone(),
            SCRIPT_NAME.to_string(),
        ];
        args.extend(options.iter().map(|(k, v)| format!("{}={}", k, v)));

        let output = self.runner.run("sh", &args, Some(&dest))?;
        if !output.stdout.is_empty() {
            debug!("{}: {}", self.name, output.stdout.trim_end());
        }
        Ok(dest)
    }
}
