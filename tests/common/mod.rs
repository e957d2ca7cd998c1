//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;

use counter_gate::config::BackendConfig;

/// One recorded RPC invocation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub rpc: String,
    pub body: Value,
    pub apikey: Option<String>,
    pub authorization: Option<String>,
}

/// A running mock PostgREST server.
pub struct MockBackend {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    hits: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.base_url(),
            anon_key: "anon-test-key".into(),
            request_timeout_secs: 5,
            ..BackendConfig::default()
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

/// Start a programmable PostgREST stand-in on an ephemeral port.
///
/// `respond` receives the procedure name and JSON body and returns the
/// status code and JSON body to send back.
pub async fn start_mock_postgrest<F>(respond: F) -> MockBackend
where
    F: Fn(&str, &Value) -> (u16, Value) + Send + Sync + 'static,
{
    let respond = Arc::new(respond);
    let calls = Arc::new(Mutex::new(Vec::new()));
    let hits = Arc::new(AtomicUsize::new(0));

    let handler = {
        let calls = calls.clone();
        let hits = hits.clone();
        move |Path(rpc): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
            let respond = respond.clone();
            let calls = calls.clone();
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                let header = |name: &str| {
                    headers
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string)
                };
                calls.lock().unwrap().push(RecordedCall {
                    rpc: rpc.clone(),
                    body: body.clone(),
                    apikey: header("apikey"),
                    authorization: header("authorization"),
                });
                let (status, reply) = respond(&rpc, &body);
                (
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    Json(reply),
                )
            }
        }
    };

    let app = Router::new().route("/rest/v1/rpc/{rpc}", post(handler));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, calls, hits }
}
