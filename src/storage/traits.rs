// Storage trait: backend-agnostic async interface for settings and the
// audit log.
//
// Implementors: SqliteStorage (wraps rusqlite), MemoryStorage (tests and
// embedding hosts that keep their own persistence). The engine only ever
// appends; reading is for the CLI.

use anyhow::Result;
use async_trait::async_trait;

use super::models::AuditEntry;

#[async_trait]
pub trait Storage: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the backing store.
    async fn table_count(&self) -> Result<i64>;

    // --- Settings ---

    async fn get_setting(&self, key: &str) -> Result<Option<String>>;

    /// Set a setting value (upsert).
    async fn set_setting(&self, key: &str, value: &str) -> Result<()>;

    // --- Audit log ---

    /// Append one entry. Entries are never rewritten or evicted.
    async fn append_audit_entry(&self, entry: &AuditEntry) -> Result<()>;

    /// Up to `limit` entries, most recent first.
    async fn recent_audit_entries(&self, limit: u32) -> Result<Vec<AuditEntry>>;

    async fn audit_entry_count(&self) -> Result<u64>;
}
