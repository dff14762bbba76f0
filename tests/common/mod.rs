#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use geode_index_client::cache::{CacheConfig, ServerCaches};
use geode_index_client::config::ClientConfig;
use geode_index_client::endpoints::ServerClient;
use geode_index_client::integration::index::{
    HttpTransport, IndexRequest, IndexResponse, RequestTarget, TransferProgress,
};
use geode_index_client::ServerError;

pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Answers requests from a fixed route table and records what it was sent.
/// A stalled transport holds every request until `release` is called.
pub struct FakeTransport {
    routes: Mutex<HashMap<String, (u16, Bytes)>>,
    requests: Mutex<Vec<IndexRequest>>,
    calls: AtomicUsize,
    gate: Semaphore,
}

impl FakeTransport {
    pub fn new() -> Arc<FakeTransport> {
        Arc::new(FakeTransport::with_permits(Semaphore::MAX_PERMITS))
    }

    pub fn stalled() -> Arc<FakeTransport> {
        Arc::new(FakeTransport::with_permits(0))
    }

    fn with_permits(permits: usize) -> FakeTransport {
        FakeTransport {
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(vec![]),
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(permits),
        }
    }

    pub fn route(&self, target: &str, status: u16, body: impl Into<Bytes>) {
        self.routes
            .lock()
            .insert(target.to_string(), (status, body.into()));
    }

    pub fn route_json(&self, target: &str, payload: Value) {
        let body = json!({ "error": "", "payload": payload }).to_string();
        self.route(target, 200, body);
    }

    pub fn release(&self) {
        self.gate.add_permits(1024);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<IndexRequest> {
        self.requests.lock().clone()
    }

    /// Yields to the runtime until `n` requests have reached the transport.
    pub async fn wait_for_calls(&self, n: usize) {
        for _ in 0..1000 {
            if self.calls() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {} calls, saw {}", n, self.calls());
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(
        &self,
        request: IndexRequest,
        on_progress: &(dyn Fn(TransferProgress) + Send + Sync),
    ) -> Result<IndexResponse, ServerError> {
        let target = match &request.target {
            RequestTarget::Path(path) => path.clone(),
            RequestTarget::Absolute(url) => url.to_string(),
        };
        self.requests.lock().push(request);
        self.calls.fetch_add(1, Ordering::SeqCst);

        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| ServerError::Transport("transport closed".into()))?;

        let Some((status, body)) = self.routes.lock().get(&target).cloned() else {
            return Ok(IndexResponse {
                status: 404,
                body: Bytes::from_static(br#"{"error":"Not found","payload":""}"#),
            });
        };
        let total = Some(body.len() as u64);
        on_progress(TransferProgress { downloaded: 0, total });
        on_progress(TransferProgress {
            downloaded: body.len() as u64 / 2,
            total,
        });
        on_progress(TransferProgress {
            downloaded: body.len() as u64,
            total,
        });
        Ok(IndexResponse { status, body })
    }
}

pub fn client(transport: Arc<FakeTransport>) -> ServerClient {
    let config = ClientConfig::new("https://index.test")
        .unwrap()
        .with_game_version(Some("2.2074".into()))
        .with_cache(CacheConfig {
            ttl: None,
            max_entries: 64,
        });
    let caches = Arc::new(ServerCaches::new(config.cache()));
    ServerClient::new(config, transport, caches)
}

pub fn version_json(id: &str, version: &str, hash: &str) -> Value {
    json!({
        "mod_id": id,
        "name": "Node IDs",
        "description": "Adds node IDs",
        "version": version,
        "geode": "4.0.0",
        "download_link": format!("https://index.test/v1/mods/{}/versions/{}/download", id, version),
        "hash": hash,
        "download_count": 12,
        "dependencies": []
    })
}

pub fn mod_json(id: &str) -> Value {
    json!({
        "id": id,
        "featured": false,
        "download_count": 1200,
        "developers": [{ "id": 1, "username": "geode", "display_name": "Geode Team", "is_owner": true }],
        "versions": [version_json(id, "1.3.0", EMPTY_SHA256), version_json(id, "1.2.0", EMPTY_SHA256)],
        "tags": ["Interface"],
        "about": null,
        "changelog": null,
        "repository": "https://github.com/geode-sdk/node-ids",
        "created_at": "2024-01-10T09:00:00Z",
        "updated_at": "2024-05-01T17:03:00Z"
    })
}
