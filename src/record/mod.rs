//! Message logging subsystem.
//!
//! Every chat exchange becomes an append-only [`ChatRecord`], persisted by
//! one of two interchangeable backends:
//!
//! - `sqlite`: structured store in a SQLite database (preferred)
//! - `json`: whole-document rewrite of a flat `messages.json` file
//!
//! The backend is chosen once at startup and never switched at runtime.
//! [`RecordLog`] sits above the store and pairs persistence with the live
//! fan-out to stream listeners.

mod jsonfile;
mod models;
mod service;
mod sqlite;
mod store;

pub use jsonfile::JsonRecordStore;
pub use models::{ChatRecord, NewRecord};
pub use service::RecordLog;
pub use sqlite::SqliteRecordStore;
pub use store::RecordStore;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Database file name under the data directory.
const DB_FILE: &str = "messages.db";

/// Flat-file log name under the data directory.
const JSON_FILE: &str = "messages.json";

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Probe the SQLite store; fall back to the flat file if it won't open.
    #[default]
    Auto,
    Sqlite,
    Json,
}

/// Open the record store for this process.
///
/// A one-time decision: with `Auto`, a SQLite open failure demotes the
/// process to the flat-file backend for its whole lifetime.
pub async fn open_store(data_dir: &Path, choice: BackendChoice) -> Result<Arc<dyn RecordStore>> {
    let db_path = data_dir.join(DB_FILE);
    let json_path = data_dir.join(JSON_FILE);

    match choice {
        BackendChoice::Sqlite => Ok(Arc::new(SqliteRecordStore::open(&db_path).await?)),
        BackendChoice::Json => Ok(Arc::new(JsonRecordStore::open(&json_path).await?)),
        BackendChoice::Auto => match SqliteRecordStore::open(&db_path).await {
            Ok(store) => Ok(Arc::new(store)),
            Err(err) => {
                warn!(
                    "sqlite store unavailable ({err:?}), falling back to {}",
                    json_path.display()
                );
                Ok(Arc::new(JsonRecordStore::open(&json_path).await?))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_store_auto_prefers_sqlite() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path(), BackendChoice::Auto).await.unwrap();
        assert_eq!(store.backend_name(), "sqlite");
    }

    #[tokio::test]
    async fn test_open_store_explicit_json() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path(), BackendChoice::Json).await.unwrap();
        assert_eq!(store.backend_name(), "json");
    }

    #[tokio::test]
    async fn test_backends_share_contract() {
        let temp = TempDir::new().unwrap();

        for choice in [BackendChoice::Sqlite, BackendChoice::Json] {
            let dir = TempDir::new_in(temp.path()).unwrap();
            let store = open_store(dir.path(), choice).await.unwrap();

            for i in 0..3 {
                store
                    .append(NewRecord::now(format!("m{i}"), "r"))
                    .await
                    .unwrap();
            }

            let rows = store.recent(2).await.unwrap();
            assert_eq!(rows.len(), 2);
            assert!(rows[0].id > rows[1].id);

            store.clear().await.unwrap();
            assert!(store.recent(10).await.unwrap().is_empty());
        }
    }
}
