// src/cli/mod.rs
//! CLI definitions for migrant
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! Codebase commands:
//! - `diff-codebases` - Show differences between two codebase expressions
//! - `change` - Put a codebase into a destination repository as a draft
//!
//! Migration commands:
//! - `determine-migrations` - List revisions not yet migrated
//! - `migrate` - Create one draft per pending revision
//!
//! Equivalence database:
//! - `note-equivalence` - Record that two revisions hold the same state
//! - `find-equivalence` - Show recorded equivalences for a revision
//!
//! Project:
//! - `check-config` - Load and validate a project configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "migrant")]
#[command(version)]
#[command(about = "Migrates code between version-control repositories", long_about = None)]
pub struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    // =========================================================================
    // Codebase Commands
    // =========================================================================
    /// Show the differences between two codebases
    DiffCodebases {
        /// Project configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// First codebase expression, e.g. "internal(revision=4)>public"
        #[arg(long)]
        codebase1: String,

        /// Second codebase expression
        #[arg(long)]
        codebase2: String,

        /// Only list changed paths with their status
        #[arg(long)]
        stat: bool,
    },

    /// Create a pending change in a destination repository
    Change {
        /// Project configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Codebase expression to put into the destination
        #[arg(long)]
        codebase: String,

        /// Repository expression of the destination writer
        #[arg(long)]
        destination: String,
    },

    // =========================================================================
    // Migration Commands
    // =========================================================================
    /// Find and print the unmigrated revisions for a migration
    DetermineMigrations {
        /// Project configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Name of the migration, as found in the config file
        #[arg(short, long)]
        migration: String,

        /// Location of the equivalence database
        #[arg(long)]
        db: PathBuf,

        /// Print the migrations as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a draft revision for every pending migration, oldest first
    Migrate {
        /// Project configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Name of the migration, as found in the config file
        #[arg(short, long)]
        migration: String,

        /// Location of the equivalence database
        #[arg(long)]
        db: PathBuf,
    },

    // =========================================================================
    // Equivalence Database
    // =========================================================================
    /// Record that two revisions hold the same state
    NoteEquivalence {
        /// Location of the equivalence database
        #[arg(long)]
        db: PathBuf,

        /// First revision, as NAME{REVISION}
        #[arg(long)]
        repo1: String,

        /// Second revision, as NAME{REVISION}
        #[arg(long)]
        repo2: String,
    },

    /// Show the recorded equivalences of a revision
    FindEquivalence {
        /// Location of the equivalence database
        #[arg(long)]
        db: PathBuf,

        /// Repository name
        #[arg(long)]
        repository: String,

        /// Revision id
        #[arg(long)]
        revision: String,

        /// Only show equivalent revisions in this repository
        #[arg(long)]
        in_repository: Option<String>,

        /// Print the equivalences as JSON
        #[arg(long)]
        json: bool,
    },

    // =========================================================================
    // Project
    // =========================================================================
    /// Load a project configuration and report what it defines
    CheckConfig {
        /// Project configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_note_equivalence() {
        let cli = Cli::try_parse_from([
            "migrant",
            "note-equivalence",
            "--db",
            "/tmp/db",
            "--repo1",
            "internal{1}",
            "--repo2",
            "public{a}",
        ])
        .unwrap();

        match cli.command {
            Commands::NoteEquivalence { repo1, repo2, .. } => {
                assert_eq!(repo1, "internal{1}");
                assert_eq!(repo2, "public{a}");
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_missing_required_argument() {
        assert!(Cli::try_parse_from(["migrant", "determine-migrations", "--db", "x"]).is_err());
    }
}
