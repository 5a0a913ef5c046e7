// SqliteStorage: rusqlite backend implementing the Storage trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::AuditEntry;
use super::traits::Storage;

pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::get_setting(&conn, key)
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_setting(&conn, key, value)
    }

    async fn append_audit_entry(&self, entry: &AuditEntry) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::insert_audit_entry(&conn, entry)?;
        Ok(())
    }

    async fn recent_audit_entries(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        let conn = self.conn.lock().await;
        super::queries::get_recent_audit_entries(&conn, limit)
    }

    async fn audit_entry_count(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        super::queries::count_audit_entries(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::create_tables;

    async fn test_storage() -> SqliteStorage {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        SqliteStorage::new(conn)
    }

    #[tokio::test]
    async fn test_trait_setting_roundtrip() {
        let storage = test_storage().await;
        assert_eq!(storage.get_setting("enabled").await.unwrap(), None);
        storage.set_setting("enabled", "false").await.unwrap();
        assert_eq!(
            storage.get_setting("enabled").await.unwrap(),
            Some("false".to_string())
        );
    }

    #[tokio::test]
    async fn test_trait_audit_append_and_read() {
        let storage = test_storage().await;
        let entry = AuditEntry::now("You are an idiot", "https://forum.example/t/1");
        storage.append_audit_entry(&entry).await.unwrap();

        assert_eq!(storage.audit_entry_count().await.unwrap(), 1);
        let recent = storage.recent_audit_entries(10).await.unwrap();
        assert_eq!(recent, vec![entry]);
    }

    #[tokio::test]
    async fn test_trait_table_count() {
        let storage = test_storage().await;
        assert_eq!(storage.table_count().await.unwrap(), 3);
    }
}
