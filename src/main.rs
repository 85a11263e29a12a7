// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use migrant::{CommandRunner, SystemCommandRunner};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// Set by the first SIGINT; running commands poll it and kill their child
static INTERRUPTED: OnceLock<Arc<AtomicBool>> = OnceLock::new();

extern "C" fn on_sigint(_: nix::libc::c_int) {
    if let Some(flag) = INTERRUPTED.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Route SIGINT to the interrupt flag. The handler resets itself, so a
/// second Ctrl-C terminates the process the usual way.
fn install_interrupt_handler() -> Arc<AtomicBool> {
    let flag = INTERRUPTED
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone();
    let action = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::SA_RESETHAND,
        SigSet::empty(),
    );
    // SAFETY: the handler only performs an atomic store
    if let Err(e) = unsafe { sigaction(Signal::SIGINT, &action) } {
        warn!("Failed to install SIGINT handler: {}", e);
    }
    flag
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let interrupted = install_interrupt_handler();
    let runner: Arc<dyn CommandRunner> =
        Arc::new(SystemCommandRunner::new().with_interrupt(interrupted));

    match cli.command {
        // =====================================================================
        // Codebase Commands
        // =====================================================================
        Commands::DiffCodebases {
            config,
            codebase1,
            codebase2,
            stat,
        } => commands::cmd_diff_codebases(&config, &codebase1, &codebase2, stat, runner),

        Commands::Change {
            config,
            codebase,
            destination,
        } => commands::cmd_change(&config, &codebase, &destination, runner),

        // =====================================================================
        // Migration Commands
        // =====================================================================
        Commands::DetermineMigrations {
            config,
            migration,
            db,
            json,
        } => commands::cmd_determine_migrations(&config, &migration, &db, json, runner),

        Commands::Migrate { config, migration, db } => {
            commands::cmd_migrate(&config, &migration, &db, runner)
        }

        // =====================================================================
        // Equivalence Database
        // =====================================================================
        Commands::NoteEquivalence { db, repo1, repo2 } => {
            commands::cmd_note_equivalence(&db, &repo1, &repo2)
        }

        Commands::FindEquivalence {
            db,
            repository,
            revision,
            in_repository,
            json,
        } => commands::cmd_find_equivalence(
            &db,
            &repository,
            &revision,
            in_repository.as_deref(),
            json,
        ),

        // =====================================================================
        // Project
        // =====================================================================
        Commands::CheckConfig { config } => commands::cmd_check_config(&config, runner),
    }
}
