//! Record store contract shared by both backends.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{ChatRecord, NewRecord};

/// Durable append-only storage of chat exchanges.
///
/// Both backends satisfy the same contract; the choice between them is made
/// once at startup and never revisited.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Assign the next id and persist the record.
    async fn append(&self, new: NewRecord) -> Result<ChatRecord>;

    /// Up to `limit` most recently inserted records, newest first.
    async fn recent(&self, limit: i64) -> Result<Vec<ChatRecord>>;

    /// Delete every record. Irreversible. Returns the number removed.
    ///
    /// Ids handed out after a clear continue above the previous high-water
    /// mark; they are never reused.
    async fn clear(&self) -> Result<u64>;

    /// Short backend name for startup logging.
    fn backend_name(&self) -> &'static str;
}
