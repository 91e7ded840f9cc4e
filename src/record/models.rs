//! Chat exchange record types.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One persisted chat exchange.
///
/// Records are immutable once stored. The only mutations a store supports
/// are insert and bulk clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatRecord {
    /// Store-assigned id, strictly increasing, never reused.
    pub id: i64,
    /// RFC 3339 timestamp, set when the record was constructed.
    pub ts: String,
    /// The user's original message text.
    pub incoming: String,
    /// The resolved reply text. May be empty, never absent.
    pub reply: String,
    /// Which resolution path produced the reply (upstream model id, or
    /// the fallback marker).
    pub model: Option<String>,
    /// Serialized raw upstream response body, upstream path only.
    pub raw_response: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub page: Option<String>,
}

/// A record as constructed by the chat handler, before the store assigns
/// an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub ts: String,
    pub incoming: String,
    pub reply: String,
    pub model: Option<String>,
    pub raw_response: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub page: Option<String>,
}

impl NewRecord {
    /// Start a record for the given exchange, stamped with the current time.
    pub fn now(incoming: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            ts: Utc::now().to_rfc3339(),
            incoming: incoming.into(),
            reply: reply.into(),
            model: None,
            raw_response: None,
            user_agent: None,
            ip: None,
            page: None,
        }
    }

    /// Attach the store-assigned id.
    pub fn into_record(self, id: i64) -> ChatRecord {
        ChatRecord {
            id,
            ts: self.ts,
            incoming: self.incoming,
            reply: self.reply,
            model: self.model,
            raw_response: self.raw_response,
            user_agent: self.user_agent,
            ip: self.ip,
            page: self.page,
        }
    }
}
