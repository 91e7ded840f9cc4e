//! Application state shared across handlers.

use std::sync::Arc;

use crate::record::{RecordLog, RecordStore};
use crate::resolver::ReplyResolver;
use crate::secrets::ApiKeys;
use crate::stream::StreamHub;

use super::error::ApiError;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Exchange log: persistence plus live fan-out, best-effort.
    pub records: Arc<RecordLog>,
    /// Record store, for direct history and clear access.
    pub store: Arc<dyn RecordStore>,
    /// Live listener hub.
    pub hub: Arc<StreamHub>,
    /// Reply resolver.
    pub resolver: Arc<ReplyResolver>,
    /// Upstream key state.
    pub keys: Arc<ApiKeys>,
    /// Static admin token; `None` means admin endpoints are unconfigured.
    pub admin_token: Option<String>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        store: Arc<dyn RecordStore>,
        hub: Arc<StreamHub>,
        resolver: Arc<ReplyResolver>,
        keys: Arc<ApiKeys>,
        admin_token: Option<String>,
    ) -> Self {
        let records = Arc::new(RecordLog::new(store.clone(), hub.clone()));
        Self {
            records,
            store,
            hub,
            resolver,
            keys,
            admin_token,
        }
    }

    /// Check a presented admin token.
    ///
    /// No configured token means nobody can be authorized (400); a
    /// mismatch is 403. No state changes on either.
    pub fn require_admin(&self, presented: Option<&str>) -> Result<(), ApiError> {
        match self.admin_token.as_deref() {
            None => Err(ApiError::bad_request("admin token not configured")),
            Some(expected) if presented == Some(expected) => Ok(()),
            Some(_) => Err(ApiError::forbidden("invalid admin token")),
        }
    }
}
