// src/db/schema.rs

//! Database schema definitions and migrations for the equivalence database
//!
//! Tables are created by numbered migrations, each applied in its own
//! transaction together with its version row. A database written by a newer
//! version of this tool (higher schema version) is refused rather than
//! guessed at, and so is an SQLite file that holds some other tool's tables.

use super::{DbError, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

fn has_table(conn: &Connection, name: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Names of the tables in the database, excluding SQLite's own
fn user_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

/// Get the current schema version from the database; 0 when untracked
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    if !has_table(conn, "schema_version")? {
        return Ok(0);
    }

    let version = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Apply all pending migrations to bring the database up to date
pub fn migrate(conn: &mut Connection, path: &Path) -> Result<()> {
    if !has_table(conn, "schema_version")? {
        let tables = user_tables(conn)?;
        if !tables.is_empty() {
            return Err(DbError::Corrupt {
                path: path.to_path_buf(),
                message: format!(
                    "not an equivalence database (found tables: {})",
                    tables.join(", ")
                ),
            });
        }
    }

    let current_version = get_schema_version(conn)?;
    debug!("Current schema version: {}", current_version);

    if current_version > SCHEMA_VERSION {
        return Err(DbError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: current_version,
            supported: SCHEMA_VERSION,
        });
    }

    if current_version == SCHEMA_VERSION {
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration to version {}", version);
        let tx = conn.transaction()?;
        init_schema_version(&tx)?;
        apply_migration(&tx, version)?;
        set_schema_version(&tx, version)?;
        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version
fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => unreachable!("no migration defined for version {}", version),
    }
}

/// Initial schema - Version 1
///
/// - equivalences: pairs of revisions known to hold the same state
/// - submitted_migrations: source revisions a draft has been produced for
///
/// Equivalence sides are stored in canonical (sorted) order so the pair
/// `(a, b)` and `(b, a)` collide on the unique index.
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        CREATE TABLE equivalences (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            repository1 TEXT NOT NULL,
            revision1 TEXT NOT NULL,
            repository2 TEXT NOT NULL,
            revision2 TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            UNIQUE(repository1, revision1, repository2, revision2)
        );

        CREATE INDEX idx_equivalences_side1 ON equivalences(repository1, revision1);
        CREATE INDEX idx_equivalences_side2 ON equivalences(repository2, revision2);

        CREATE TABLE submitted_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            from_repository TEXT NOT NULL,
            from_revision TEXT NOT NULL,
            to_repository TEXT NOT NULL,
            draft TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            UNIQUE(from_repository, from_revision, to_repository)
        );
        ",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    fn create_test_db() -> (NamedTempFile, Connection) {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = Connection::open(temp_file.path()).unwrap();
        (temp_file, conn)
    }

    #[test]
    fn test_schema_version_tracking() {
        let (_temp, conn) = create_test_db();
        assert_eq!(get_schema_version(&conn).unwrap(), 0);
        init_schema_version(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 0);
        set_schema_version(&conn, 1).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_migrate_creates_tables() {
        let (temp, mut conn) = create_test_db();
        migrate(&mut conn, temp.path()).unwrap();

        let tables = table_names(&conn);

        assert!(tables.contains(&"equivalences".to_string()));
        assert!(tables.contains(&"submitted_migrations".to_string()));
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let (temp, mut conn) = create_test_db();
        migrate(&mut conn, temp.path()).unwrap();
        migrate(&mut conn, temp.path()).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let (temp, mut conn) = create_test_db();
        migrate(&mut conn, temp.path()).unwrap();
        set_schema_version(&conn, SCHEMA_VERSION + 1).unwrap();

        let err = migrate(&mut conn, temp.path()).unwrap_err();
        assert!(matches!(err, DbError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_foreign_tables_are_refused_untouched() {
        let (temp, mut conn) = create_test_db();
        conn.execute("CREATE TABLE packages (name TEXT)", []).unwrap();

        let err = migrate(&mut conn, temp.path()).unwrap_err();
        assert!(matches!(err, DbError::Corrupt { .. }));
        assert_eq!(table_names(&conn), vec!["packages".to_string()]);
    }
}
