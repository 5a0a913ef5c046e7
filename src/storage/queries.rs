// Storage queries: every SQL statement lives here so the rest of the crate
// only sees plain Rust functions.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::models::AuditEntry;

// --- Settings ---

/// Get a setting value by key.
pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set a setting value (upsert).
pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

// --- Audit log ---

/// Append an audit entry and return its row id.
pub fn insert_audit_entry(conn: &Connection, entry: &AuditEntry) -> Result<i64> {
    conn.execute(
        "INSERT INTO audit_log (text, url, blocked_at) VALUES (?1, ?2, ?3)",
        params![entry.text, entry.url, entry.timestamp],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent entries first.
pub fn get_recent_audit_entries(conn: &Connection, limit: u32) -> Result<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT text, url, blocked_at FROM audit_log ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(AuditEntry {
            text: row.get(0)?,
            url: row.get(1)?,
            timestamp: row.get(2)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

pub fn count_audit_entries(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))?;
    Ok(count as u64)
}
