// src/error.rs
//! Crate-level error type

use thiserror::Error;

/// Result type for library callers
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure raised by a migrant component
#[derive(Error, Debug)]
pub enum Error {
    /// External command failed or could not be run
    #[error(transparent)]
    Command(#[from] crate::command::CommandError),

    /// Malformed expression text
    #[error(transparent)]
    Syntax(#[from] crate::expression::ExpressionSyntaxError),

    #[error(transparent)]
    CodebaseCreation(#[from] crate::codebase::CodebaseCreationError),

    #[error(transparent)]
    Writing(#[from] crate::writer::WritingError),

    /// Equivalence database failure
    #[error(transparent)]
    Db(#[from] crate::db::DbError),

    #[error(transparent)]
    History(#[from] crate::repository::HistoryError),

    #[error(transparent)]
    Migration(#[from] crate::migration::MigrationError),

    /// Invalid project configuration
    #[error(transparent)]
    Config(#[from] crate::project::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Fatal errors abort the operation: a process that could not be
    /// launched or was interrupted, or a corrupt database
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Command(e) => e.is_fatal(),
            Error::CodebaseCreation(crate::codebase::CodebaseCreationError::Command(e))
            | Error::Writing(crate::writer::WritingError::Command(e)) => e.is_fatal(),
            Error::Db(crate::db::DbError::Corrupt { .. }) => true,
            _ => false,
        }
    }
}
