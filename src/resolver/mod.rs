//! Reply resolution: upstream generation API with offline fallback.
//!
//! With a key configured the resolver POSTs the message to the upstream
//! inference endpoint and normalizes whichever of its three response
//! shapes comes back. Without a key it answers from a small deterministic
//! table so the widget keeps working offline. Upstream failures are
//! returned to the caller untouched; there is no fallback-on-error.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::secrets::ApiKeys;

/// Marker stored in a record's `model` field for the offline path.
pub const FALLBACK_MODEL: &str = "fallback";

/// Why a reply could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Upstream answered with a non-success status.
    #[error("upstream returned {status}")]
    Upstream {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The upstream call never completed (connect failure, timeout).
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A resolved reply plus the audit metadata the record needs.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub reply: String,
    /// Which resolution path produced the reply.
    pub model: String,
    /// Serialized raw upstream body, upstream path only.
    pub raw_response: Option<String>,
}

/// Upstream endpoint configuration.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Full inference URL.
    pub url: String,
    /// Model identifier recorded with each upstream reply.
    pub model: String,
}

/// Resolves replies for incoming chat messages.
pub struct ReplyResolver {
    client: Client,
    upstream: UpstreamConfig,
    keys: Arc<ApiKeys>,
}

impl ReplyResolver {
    pub fn new(upstream: UpstreamConfig, keys: Arc<ApiKeys>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("building HTTP client");

        Self {
            client,
            upstream,
            keys,
        }
    }

    /// Resolve a reply for the incoming message.
    pub async fn resolve(&self, message: &str) -> Result<Resolved, ResolveError> {
        match self.keys.current() {
            Some(key) => self.generate(message, &key).await,
            None => Ok(fallback_reply(message)),
        }
    }

    async fn generate(&self, message: &str, key: &str) -> Result<Resolved, ResolveError> {
        let response = self
            .client
            .post(&self.upstream.url)
            .bearer_auth(key)
            .json(&serde_json::json!({ "inputs": message }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResolveError::Upstream { status, body });
        }

        let data: Value = response.json().await?;

        Ok(Resolved {
            reply: extract_text(&data),
            model: self.upstream.model.clone(),
            raw_response: Some(data.to_string()),
        })
    }
}

/// Pull the generated text out of any of the upstream response shapes:
/// an array of objects with `generated_text`, a single such object, or a
/// bare string. Anything else is passed through serialized.
fn extract_text(data: &Value) -> String {
    match data {
        Value::Array(items) => match items.first() {
            Some(Value::String(text)) => text.clone(),
            Some(item) => item
                .get("generated_text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| data.to_string()),
            None => data.to_string(),
        },
        Value::String(text) => text.clone(),
        _ => data
            .get("generated_text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string()),
    }
}

/// Deterministic offline reply used when no upstream key is configured.
pub fn fallback_reply(message: &str) -> Resolved {
    let lower = message.to_lowercase();
    let reply = if lower.contains("hello") || lower.contains("hi") {
        "Hello! I am Helodesk AI. How can I help?".to_string()
    } else if lower.contains("price") {
        "Pricing depends on your plan - please share which product or plan you mean.".to_string()
    } else {
        format!(
            "I'm running in offline mode. To enable AI replies, configure an upstream API key. \
             For now I can echo: {message}"
        )
    };

    Resolved {
        reply,
        model: FALLBACK_MODEL.to_string(),
        raw_response: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fallback_greeting() {
        let resolved = fallback_reply("Hello there");
        assert_eq!(resolved.reply, "Hello! I am Helodesk AI. How can I help?");
        assert_eq!(resolved.model, FALLBACK_MODEL);
        assert!(resolved.raw_response.is_none());
    }

    #[test]
    fn test_fallback_pricing() {
        let resolved = fallback_reply("what is the PRICE of the pro plan?");
        assert!(resolved.reply.starts_with("Pricing depends"));
    }

    #[test]
    fn test_fallback_echo() {
        let resolved = fallback_reply("reset my password");
        assert!(resolved.reply.contains("reset my password"));
        assert!(resolved.reply.contains("offline mode"));
    }

    #[test]
    fn test_extract_text_array_of_objects() {
        let data = json!([{ "generated_text": "first" }, { "generated_text": "second" }]);
        assert_eq!(extract_text(&data), "first");
    }

    #[test]
    fn test_extract_text_array_of_strings() {
        let data = json!(["plain"]);
        assert_eq!(extract_text(&data), "plain");
    }

    #[test]
    fn test_extract_text_object() {
        let data = json!({ "generated_text": "obj" });
        assert_eq!(extract_text(&data), "obj");
    }

    #[test]
    fn test_extract_text_bare_string() {
        let data = json!("bare");
        assert_eq!(extract_text(&data), "bare");
    }

    #[test]
    fn test_extract_text_unknown_shape_is_serialized() {
        let data = json!({ "unexpected": true });
        assert_eq!(extract_text(&data), data.to_string());
    }
}
