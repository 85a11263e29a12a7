// src/lib.rs

//! Migrant: code migration between version-control repositories
//!
//! Moves a project's code from one repository to another (possibly through
//! a chain of editors that rename, filter or scrub it) while recording
//! which revisions on each side hold the same state, so a later run picks
//! up exactly where the last one stopped.
//!
//! # Architecture
//!
//! - Expressions: `internal(revision=4)>public|scrub` describes a codebase
//! - Codebases: read-only trees in scratch storage, produced by evaluating
//!   an expression against a project context
//! - Equivalence database: SQLite record of revision pairs known to match
//! - Migrator: walks source history back to the last equivalence and lists
//!   the revisions still pending
//! - Writers: working copies that accept a codebase as a draft revision
//! - External tools are only ever reached through a command runner

pub mod codebase;
pub mod command;
pub mod db;
pub mod diff;
pub mod editor;
mod error;
pub mod expression;
pub mod migration;
pub mod project;
pub mod repository;
pub mod scratch;
pub mod ui;
pub mod writer;

pub use codebase::{Codebase, CodebaseCreationError, FileCodebaseCreator};
pub use command::{CommandError, CommandOutput, CommandRunner, SystemCommandRunner};
pub use db::{Db, DbError, Equivalence, SubmittedMigration};
pub use diff::{CodebaseDifference, FileDifference, FileStatus, PatchRenderer, diff_codebases};
pub use error::{Error, Result};
pub use expression::{
    Expression, ExpressionSyntaxError, Options, RepositoryExpression, Term, parse_expression,
    parse_repository_expression,
};
pub use migration::{Migration, MigrationConfig, MigrationError, Migrator};
pub use project::{ConfigError, EditorConfig, ProjectConfig, ProjectContext, RepositoryConfig};
pub use repository::{HistoryError, RepositoryType, Revision, RevisionHistory, RevisionMetadata};
pub use scratch::Scratch;
pub use ui::{LogUi, SilentUi, Task, Ui};
pub use writer::{DraftRevision, Writer, WritingError, create_draft};
