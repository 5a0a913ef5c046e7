// Storage layer: SQLite persistence for settings and the audit log.
//
// rusqlite with the "bundled" feature, so there's no system SQLite
// dependency. The database file lives wherever HATEBLOCK_DB_PATH points
// (defaults to ./hateblock.db).

pub mod memory;
pub mod models;
pub mod queries;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use memory::MemoryStorage;
pub use models::AuditEntry;
pub use sqlite::SqliteStorage;
pub use traits::Storage;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open (or create) the database and run migrations.
pub fn initialize(db_path: &str) -> Result<Connection> {
    // Create parent directories if needed
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    // WAL so a running scan and a `logs` invocation don't block each other
    conn.pragma_update(None, "journal_mode", "WAL")?;

    schema::create_tables(&conn)?;

    Ok(conn)
}

/// Open an existing database (fails if it doesn't exist yet).
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!(
            "Database not found at {}. Run `hateblock init` first.",
            db_path
        );
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Pick up migrations added since the database was created
    schema::create_tables(&conn)?;

    Ok(conn)
}

/// Open an existing SQLite database behind the Storage trait.
pub fn open_sqlite(db_path: &str) -> Result<std::sync::Arc<dyn Storage>> {
    let conn = open(db_path)?;
    Ok(std::sync::Arc::new(SqliteStorage::new(conn)))
}

/// Create (if needed) a SQLite database behind the Storage trait.
pub fn initialize_sqlite(db_path: &str) -> Result<std::sync::Arc<dyn Storage>> {
    let conn = initialize(db_path)?;
    Ok(std::sync::Arc::new(SqliteStorage::new(conn)))
}
