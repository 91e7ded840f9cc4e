//! Test utilities and common setup.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::post;
use tempfile::TempDir;

use helodesk::api::{self, AppState};
use helodesk::record::{RecordStore, SqliteRecordStore};
use helodesk::resolver::{ReplyResolver, UpstreamConfig};
use helodesk::secrets::ApiKeys;
use helodesk::stream::StreamHub;

/// Knobs for building a test application.
#[derive(Default)]
pub struct TestOptions {
    pub admin_token: Option<String>,
    pub upstream_url: Option<String>,
    pub api_key: Option<String>,
}

/// A test application plus the state behind it.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    /// Keeps the secret-file directory alive for the test's duration.
    pub _data_dir: TempDir,
}

/// Create a test application with an in-memory store.
pub async fn test_app() -> TestApp {
    test_app_with(TestOptions::default()).await
}

/// Create a test application with explicit options.
pub async fn test_app_with(options: TestOptions) -> TestApp {
    let data_dir = TempDir::new().unwrap();

    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::in_memory().await.unwrap());
    let keys = Arc::new(ApiKeys::load(data_dir.path(), options.api_key));

    let upstream = UpstreamConfig {
        // Unroutable unless a test wires up a fake upstream.
        url: options
            .upstream_url
            .unwrap_or_else(|| "http://127.0.0.1:9/".to_string()),
        model: "test-model".to_string(),
    };
    let resolver = Arc::new(ReplyResolver::new(upstream, keys.clone()));
    let hub = Arc::new(StreamHub::new());

    let state = AppState::new(store, hub, resolver, keys, options.admin_token);
    TestApp {
        router: api::create_router(state.clone()),
        state,
        _data_dir: data_dir,
    }
}

/// Spawn a throwaway upstream that always answers with the given status
/// and body. Returns its URL.
pub async fn spawn_upstream(status: StatusCode, body: &'static str) -> String {
    let app = Router::new().route("/", post(move || async move { (status, body) }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}/")
}
