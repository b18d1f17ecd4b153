//! Schema migrations for the local store
//!
//! Each entry in [`MIGRATIONS`] is applied at most once, in version
//! order, with applied versions recorded in `schema_migrations`.

use rusqlite::{params, Connection};
use tracing::{info, instrument};

use super::error::StoreError;

/// One versioned schema change.
pub struct Migration {
    /// Sequential version, starting at 1
    pub version: u32,
    /// Short human-readable label, recorded alongside the version
    pub description: &'static str,
    /// Batch of SQL statements to apply
    pub sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Document table",
    sql: r#"
            -- One row per stored document, JSON payload in `data`
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );
        "#,
}];

fn ensure_version_table(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}

/// Highest version already applied, 0 for a fresh database
fn applied_version(conn: &Connection) -> Result<u32, StoreError> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn mark_applied(conn: &Connection, migration: &Migration) -> Result<(), StoreError> {
    let applied_at = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at)
         VALUES (?1, ?2, ?3)",
        params![migration.version, migration.description, applied_at],
    )?;
    Ok(())
}

/// Bring the database up to the latest schema version.
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    ensure_version_table(conn)?;
    let applied = applied_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        info!(
            version = migration.version,
            description = migration.description,
            "Applying schema migration"
        );
        conn.execute_batch(migration.sql)?;
        mark_applied(conn, migration)?;
    }

    Ok(())
}
