// src/project/config.rs

//! Parser for project configuration TOML files.
//!
//! ```toml
//! name = "frobnicator"
//!
//! [repositories.internal]
//! type = "git"
//! url = "https://git.example.com/internal/frobnicator.git"
//! branch = "main"
//! project_space = "internal"
//!
//! [repositories.public]
//! type = "git"
//! url = "https://github.com/example/frobnicator.git"
//!
//! [editors.scrub]
//! type = "filter"
//! exclude = ["**/*_internal.rs"]
//!
//! [[translators]]
//! from_project_space = "internal"
//! to_project_space = "public"
//! steps = [{ name = "scrub", editor = "scrub" }]
//!
//! [migrations.export]
//! from_repository = "internal"
//! to_repository = "public"
//! ```

use crate::codebase::DEFAULT_PROJECT_SPACE;
use crate::editor::RenameMapping;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors in a project configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read project config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse project config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("repository name '{0}' is reserved")]
    ReservedName(String),

    #[error("editor '{editor}' is invalid: {message}")]
    InvalidEditor { editor: String, message: String },

    #[error("translator {from} -> {to}, step '{step}': no editor named '{editor}'")]
    UnknownEditor {
        from: String,
        to: String,
        step: String,
        editor: String,
    },

    #[error("more than one translator from project space '{from}' to '{to}'")]
    DuplicateTranslator { from: String, to: String },

    #[error("migration '{migration}' names unknown repository '{repository}'")]
    UnknownRepository { migration: String, repository: String },

    #[error("I/O error preparing project: {0}")]
    Io(#[from] std::io::Error),
}

/// A project configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,

    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryConfig>,

    #[serde(default)]
    pub editors: BTreeMap<String, EditorConfig>,

    #[serde(default)]
    pub translators: Vec<TranslatorConfig>,

    #[serde(default)]
    pub migrations: BTreeMap<String, MigrationSection>,

    /// Directory relative paths in the file are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// A repository and its backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RepositoryConfig {
    Git {
        url: String,
        #[serde(default)]
        branch: Option<String>,
        #[serde(default = "default_project_space")]
        project_space: String,
    },
    Dummy {
        /// Revision ids, oldest first
        #[serde(default)]
        revisions: Vec<String>,
        #[serde(default)]
        path: Option<PathBuf>,
        #[serde(default = "default_project_space")]
        project_space: String,
    },
}

impl RepositoryConfig {
    pub fn project_space(&self) -> &str {
        match self {
            RepositoryConfig::Git { project_space, .. }
            | RepositoryConfig::Dummy { project_space, .. } => project_space,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RepositoryConfig::Git { .. } => "git",
            RepositoryConfig::Dummy { .. } => "dummy",
        }
    }
}

fn default_project_space() -> String {
    DEFAULT_PROJECT_SPACE.to_string()
}

/// An editor and its settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EditorConfig {
    Identity,
    Renamer {
        mappings: Vec<RenameMapping>,
        #[serde(default)]
        regex: bool,
        #[serde(default = "default_keep_unmatched")]
        keep_unmatched: bool,
    },
    Filter {
        #[serde(default)]
        include: Vec<String>,
        #[serde(default)]
        exclude: Vec<String>,
    },
    Shell {
        command: String,
    },
}

fn default_keep_unmatched() -> bool {
    true
}

/// Editors that take a codebase from one project space to another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    pub from_project_space: String,
    pub to_project_space: String,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    pub name: String,
    /// Name of an entry in `[editors]`
    pub editor: String,
}

/// Direction of a migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSection {
    pub from_repository: String,
    pub to_repository: String,
}

impl ProjectConfig {
    /// Load and parse a project config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Parse config text; relative paths resolve against the working directory
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolve a path from the file against its directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}
