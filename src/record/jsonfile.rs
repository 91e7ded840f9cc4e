//! Flat-file record store.
//!
//! The whole message log lives in one pretty-printed JSON array which is
//! read, extended, and rewritten on every insert. O(total records) per
//! append. Safe for a single process only; there is no cross-process file
//! locking.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

use super::models::{ChatRecord, NewRecord};
use super::store::RecordStore;

/// Fallback message store backed by a flat JSON document.
#[derive(Debug)]
pub struct JsonRecordStore {
    path: PathBuf,
    /// Serializes the read-modify-rewrite cycle and carries the id
    /// high-water mark, so cleared ids are never handed out again.
    next_id: Mutex<i64>,
}

impl JsonRecordStore {
    /// Open the store, seeding the id counter from the highest stored id.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating message log directory: {}", parent.display()))?;
        }

        let records = read_all(path).await;
        let next_id = records.last().map(|r| r.id + 1).unwrap_or(1);

        Ok(Self {
            path: path.to_path_buf(),
            next_id: Mutex::new(next_id),
        })
    }

    /// Get the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_all(&self, records: &[ChatRecord]) -> Result<()> {
        let raw = serde_json::to_string_pretty(records).context("serializing message log")?;
        fs::write(&self.path, raw)
            .await
            .with_context(|| format!("writing message log: {}", self.path.display()))
    }
}

/// Read the full collection. A missing or unreadable file reads as empty.
async fn read_all(path: &Path) -> Vec<ChatRecord> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to read message log {}: {}", path.display(), err);
            }
            return Vec::new();
        }
    };

    if raw.trim().is_empty() {
        return Vec::new();
    }

    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!("unparseable message log {}: {}", path.display(), err);
        Vec::new()
    })
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn append(&self, new: NewRecord) -> Result<ChatRecord> {
        let mut next_id = self.next_id.lock().await;

        let mut records = read_all(&self.path).await;
        let record = new.into_record(*next_id);
        records.push(record.clone());
        self.write_all(&records).await?;

        *next_id += 1;
        Ok(record)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ChatRecord>> {
        let _guard = self.next_id.lock().await;

        let records = read_all(&self.path).await;
        let limit = usize::try_from(limit).unwrap_or(0);
        let skip = records.len().saturating_sub(limit);
        let mut rows: Vec<ChatRecord> = records.into_iter().skip(skip).collect();
        rows.reverse();
        Ok(rows)
    }

    async fn clear(&self) -> Result<u64> {
        // Keeps next_id where it is: cleared ids stay retired.
        let _guard = self.next_id.lock().await;

        let removed = read_all(&self.path).await.len() as u64;
        self.write_all(&[]).await?;
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, JsonRecordStore) {
        let temp = TempDir::new().unwrap();
        let store = JsonRecordStore::open(&temp.path().join("messages.json"))
            .await
            .unwrap();
        (temp, store)
    }

    #[tokio::test]
    async fn test_append_and_recent_order() {
        let (_temp, store) = setup().await;

        for i in 1..=4 {
            store
                .append(NewRecord::now(format!("msg {i}"), format!("reply {i}")))
                .await
                .unwrap();
        }

        let rows = store.recent(2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].incoming, "msg 4");
        assert_eq!(rows[1].incoming, "msg 3");

        let all = store.recent(100).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let (_temp, store) = setup().await;
        assert!(store.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_does_not_reuse_ids() {
        let (_temp, store) = setup().await;

        store.append(NewRecord::now("one", "")).await.unwrap();
        let second = store.append(NewRecord::now("two", "")).await.unwrap();

        let removed = store.clear().await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.recent(10).await.unwrap().is_empty());

        let after = store.append(NewRecord::now("three", "")).await.unwrap();
        assert!(after.id > second.id);
    }

    #[tokio::test]
    async fn test_reopen_continues_ids() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("messages.json");

        let store = JsonRecordStore::open(&path).await.unwrap();
        store.append(NewRecord::now("one", "")).await.unwrap();
        let last = store.append(NewRecord::now("two", "")).await.unwrap();
        drop(store);

        let reopened = JsonRecordStore::open(&path).await.unwrap();
        let rows = reopened.recent(10).await.unwrap();
        assert_eq!(rows.len(), 2);

        let next = reopened.append(NewRecord::now("three", "")).await.unwrap();
        assert_eq!(next.id, last.id + 1);
    }
}
