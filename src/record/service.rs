//! Exchange logging service.

use std::sync::Arc;

use tracing::warn;

use crate::stream::StreamHub;

use super::models::NewRecord;
use super::store::RecordStore;

/// Composes store append and live fan-out behind one call.
///
/// Logging is a side effect of answering a chat request and must never
/// block or fail the primary response, so every failure is absorbed here
/// and only logged server-side.
pub struct RecordLog {
    store: Arc<dyn RecordStore>,
    hub: Arc<StreamHub>,
}

impl RecordLog {
    pub fn new(store: Arc<dyn RecordStore>, hub: Arc<StreamHub>) -> Self {
        Self { store, hub }
    }

    /// Persist one exchange and push it to every live listener.
    ///
    /// The record is broadcast even when the store write fails; listeners
    /// then see id 0, marking an unpersisted record.
    pub async fn log(&self, new: NewRecord) {
        match self.store.append(new.clone()).await {
            Ok(record) => self.hub.broadcast(&record),
            Err(err) => {
                warn!("message log write failed: {err:?}");
                self.hub.broadcast(&new.into_record(0));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SqliteRecordStore;

    #[tokio::test]
    async fn test_log_appends_and_broadcasts() {
        let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::in_memory().await.unwrap());
        let hub = Arc::new(StreamHub::new());
        let log = RecordLog::new(store.clone(), hub.clone());

        let mut listener = hub.register();
        log.log(NewRecord::now("hi", "hello")).await;

        let stored = store.recent(10).await.unwrap();
        assert_eq!(stored.len(), 1);

        let pushed = listener.rx.try_recv().unwrap();
        assert_eq!(pushed, stored[0]);
    }
}
