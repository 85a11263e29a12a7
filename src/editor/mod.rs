// src/editor/mod.rs

//! Editors and translators
//!
//! An [`Editor`] turns one codebase into a new tree in scratch storage; the
//! input is never modified. A [`Translator`] moves a codebase from one
//! project space to another by running a fixed list of editors in order.
//!
//! Editor types:
//! - `identity`: plain copy
//! - `renamer`: moves files by path prefix or regular expression
//! - `filter`: keeps files matching include globs and not matching excludes
//! - `shell`: runs a shell command inside a copy of the codebase

pub mod filter;
pub mod renamer;
pub mod shell;

pub use filter::FilterEditor;
pub use renamer::{RenameMapping, RenamerEditor};
pub use shell::ShellEditor;

use crate::codebase::{Codebase, CodebaseCreationError, copy_tree};
use crate::expression::{Expression, Options};
use crate::scratch::Scratch;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Produces a new tree from a codebase
pub trait Editor: Send + Sync {
    /// Short description for logs, e.g. `renamer(3 mappings)`
    fn describe(&self) -> String;

    /// Write the edited tree to fresh scratch storage and return its root
    fn edit(&self, input: &Codebase, options: &Options) -> Result<PathBuf, CodebaseCreationError>;
}

/// Copies the codebase unchanged
pub struct IdentityEditor {
    scratch: Arc<Scratch>,
}

impl IdentityEditor {
    pub fn new(scratch: Arc<Scratch>) -> Self {
        Self { scratch }
    }
}

impl Editor for IdentityEditor {
    fn describe(&self) -> String {
        "identity".to_string()
    }

    fn edit(&self, input: &Codebase, _options: &Options) -> Result<PathBuf, CodebaseCreationError> {
        let dest = self.scratch.dir("identity")?;
        copy_tree(input.path(), &dest)?;
        Ok(dest)
    }
}

/// One named step of a translator
#[derive(Clone)]
pub struct TranslatorStep {
    pub name: String,
    pub editor: Arc<dyn Editor>,
}

/// Moves codebases from one project space to another
#[derive(Clone)]
pub struct Translator {
    from_project_space: String,
    to_project_space: String,
    steps: Vec<TranslatorStep>,
}

impl Translator {
    pub fn new(
        from_project_space: impl Into<String>,
        to_project_space: impl Into<String>,
        steps: Vec<TranslatorStep>,
    ) -> Self {
        Self {
            from_project_space: from_project_space.into(),
            to_project_space: to_project_space.into(),
            steps,
        }
    }

    pub fn from_project_space(&self) -> &str {
        &self.from_project_space
    }

    pub fn to_project_space(&self) -> &str {
        &self.to_project_space
    }

    pub fn steps(&self) -> &[TranslatorStep] {
        &self.steps
    }

    /// Run every step in order. `expression` is recorded as the origin of
    /// the resulting codebase.
    pub fn translate(
        &self,
        input: &Codebase,
        options: &Options,
        expression: &Expression,
    ) -> Result<Codebase, CodebaseCreationError> {
        let mut current = input.clone();
        for step in &self.steps {
            debug!(
                "Translation step '{}' ({}) on {}",
                step.name,
                step.editor.describe(),
                current.path().display()
            );
            let path = step.editor.edit(&current, options)?;
            current = Codebase::new(path, &self.from_project_space, expression.clone());
        }
        Ok(Codebase::new(
            current.path(),
            &self.to_project_space,
            expression.clone(),
        ))
    }
}
