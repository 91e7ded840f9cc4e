//! API request handlers.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::record::{ChatRecord, NewRecord};

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Proxy one chat message and log the exchange.
///
/// The reply comes back synchronously; persistence and fan-out are side
/// effects that never fail the response.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("message required"));
    }

    let resolved = state.resolver.resolve(&request.message).await?;

    let page = request.page.or_else(|| header_value(&headers, "referer"));
    let record = NewRecord {
        ts: Utc::now().to_rfc3339(),
        incoming: request.message,
        reply: resolved.reply.clone(),
        model: Some(resolved.model),
        raw_response: resolved.raw_response,
        user_agent: header_value(&headers, "user-agent"),
        ip: client_ip(&headers),
        page,
    };
    state.records.log(record).await;

    Ok(Json(ChatResponse {
        reply: resolved.reply,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    200
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub ok: bool,
    pub rows: Vec<ChatRecord>,
}

/// Most recent exchanges, newest first.
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let rows = state.store.recent(query.limit.max(0)).await?;
    Ok(Json(HistoryResponse { ok: true, rows }))
}

/// Live feed of newly logged records.
///
/// One `data:` event per record, held open until the client disconnects.
/// Disconnection surfaces as a send failure inside the hub, which drops
/// the listener on the next broadcast.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let listener = state.hub.register();

    let connected = tokio_stream::once(Ok::<_, Infallible>(Event::default().comment("connected")));
    let records = ReceiverStream::new(listener.rx).map(|record| {
        let event = match Event::default().json_data(&record) {
            Ok(event) => event,
            Err(err) => {
                warn!("failed to serialize record {} for stream: {err:?}", record.id);
                Event::default().data("{}")
            }
        };
        Ok(event)
    });

    Sse::new(connected.chain(records)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearRequest {
    pub admin_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub ok: bool,
    pub removed: u64,
}

/// Delete every stored record. Destructive and irreversible.
///
/// Gated behind the admin token whenever one is configured; an instance
/// with no token leaves it open.
pub async fn clear(
    State(state): State<AppState>,
    body: Option<Json<ClearRequest>>,
) -> ApiResult<Json<ClearResponse>> {
    if state.admin_token.is_some() {
        let presented = body.as_ref().and_then(|b| b.admin_token.clone());
        state.require_admin(presented.as_deref())?;
    }

    let removed = state.store.clear().await?;
    info!("cleared {removed} stored messages");
    Ok(Json(ClearResponse { ok: true, removed }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetKeyRequest {
    #[serde(default)]
    pub key: String,
    pub admin_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetKeyResponse {
    pub ok: bool,
}

/// Rotate the upstream API key.
pub async fn set_key(
    State(state): State<AppState>,
    Json(request): Json<SetKeyRequest>,
) -> ApiResult<Json<SetKeyResponse>> {
    state.require_admin(request.admin_token.as_deref())?;

    let key = request.key.trim();
    if key.is_empty() {
        return Err(ApiError::bad_request("key required"));
    }

    state.keys.set(key)?;
    info!("upstream API key rotated");
    Ok(Json(SetKeyResponse { ok: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfoQuery {
    pub admin_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct KeyInfoResponse {
    pub ok: bool,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked: Option<String>,
}

/// Masked view of the configured upstream key.
pub async fn key_info(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<KeyInfoQuery>,
) -> ApiResult<Json<KeyInfoResponse>> {
    let presented = header_value(&headers, "x-admin-token").or(query.admin_token);
    state.require_admin(presented.as_deref())?;

    Ok(Json(KeyInfoResponse {
        ok: true,
        exists: state.keys.is_configured(),
        masked: state.keys.masked(),
    }))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Client address for the record: first X-Forwarded-For hop when present.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|raw| raw.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_client_ip_absent() {
        assert!(client_ip(&HeaderMap::new()).is_none());
    }
}
