//! Test helpers for integration tests
//!
//! Provides a fake of the hosted backend, temporary cache paths, and
//! environment checks for the Redis-backed tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tour_common::{AppConfig, ConfigError};

use crate::fixtures::DocumentRow;

pub const TEST_API_KEY: &str = "test-anon-key";

#[derive(Clone, Default)]
struct BackendState {
    rows: Arc<Mutex<HashMap<String, DocumentRow>>>,
    fail_signing: Arc<AtomicBool>,
    lookups: Arc<AtomicUsize>,
}

/// In-process fake of the hosted backend
pub struct TestBackend {
    pub addr: SocketAddr,
    state: BackendState,
    handle: JoinHandle<()>,
}

impl TestBackend {
    /// Start the fake on a free local port
    pub async fn start() -> Result<Self> {
        let state = BackendState::default();
        let app = Router::new()
            .route("/rest/v1/:table", get(select_rows))
            .route("/storage/v1/object/sign/:bucket/*path", post(sign_object))
            .route("/auth/v1/health", get(health))
            .with_state(state.clone());

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn insert_row(&self, row: DocumentRow) {
        self.state.rows.lock().unwrap().insert(row.id.clone(), row);
    }

    pub fn set_fail_signing(&self, fail: bool) {
        self.state.fail_signing.store(fail, Ordering::SeqCst);
    }

    /// Number of row lookups served
    pub fn lookups(&self) -> usize {
        self.state.lookups.load(Ordering::SeqCst)
    }

    /// Configuration pointing at this backend, with `extra` overrides
    pub fn config(&self, extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let mut vars: HashMap<String, String> = extra
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        vars.insert("BACKEND_URL".to_string(), self.base_url());
        vars.insert("BACKEND_API_KEY".to_string(), TEST_API_KEY.to_string());
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("apikey")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == TEST_API_KEY)
}

async fn select_rows(
    State(state): State<BackendState>,
    Path(_table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.lookups.fetch_add(1, Ordering::SeqCst);

    let Some(id) = params.get("id").and_then(|f| f.strip_prefix("eq.")) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let rows: Vec<DocumentRow> = state.rows.lock().unwrap().get(id).cloned().into_iter().collect();
    Json(rows).into_response()
}

async fn sign_object(
    State(state): State<BackendState>,
    Path((bucket, path)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if state.fail_signing.load(Ordering::SeqCst) || body.get("expiresIn").is_none() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(serde_json::json!({
        "signedURL": format!("/object/sign/{bucket}/{path}?token=signed")
    }))
    .into_response()
}

async fn health() -> &'static str {
    "ok"
}

/// Fresh path for a file-backed cache
pub fn temp_cache_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("tour-it-{}", uuid::Uuid::new_v4()))
        .join("offline-documents.json")
}

/// Redis URL for presence tests, if the environment provides one
pub fn check_redis_env() -> Option<String> {
    dotenvy::dotenv().ok();
    match std::env::var("REDIS_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: REDIS_URL not set");
            None
        }
    }
}
