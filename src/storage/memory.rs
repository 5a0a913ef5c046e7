// In-memory Storage: same contract as SqliteStorage, nothing persisted.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::models::AuditEntry;
use super::traits::Storage;

#[derive(Default)]
pub struct MemoryStorage {
    settings: Mutex<HashMap<String, String>>,
    audit_log: Mutex<Vec<AuditEntry>>,
}

impl MemoryStorage {
    /// Every entry in append order.
    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit_log.lock().await.clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn table_count(&self) -> Result<i64> {
        Ok(3)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.settings.lock().await.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.settings
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn append_audit_entry(&self, entry: &AuditEntry) -> Result<()> {
        self.audit_log.lock().await.push(entry.clone());
        Ok(())
    }

    async fn recent_audit_entries(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        let log = self.audit_log.lock().await;
        Ok(log.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn audit_entry_count(&self) -> Result<u64> {
        Ok(self.audit_log.lock().await.len() as u64)
    }
}
