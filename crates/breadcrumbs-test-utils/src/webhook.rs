use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// One request received by [`ScriptedWebhook`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Lowercased header names.
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

#[derive(Default)]
struct Script {
    statuses: Mutex<VecDeque<u16>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Local HTTP endpoint answering with scripted statuses, then 204.
pub struct ScriptedWebhook {
    addr: SocketAddr,
    script: Arc<Script>,
    handle: JoinHandle<()>,
}

impl ScriptedWebhook {
    pub async fn start(statuses: Vec<u16>) -> Self {
        Self::start_inner(statuses, None).await
    }

    /// Every response is delayed, for exercising client timeouts.
    pub async fn start_slow(delay: Duration) -> Self {
        Self::start_inner(Vec::new(), Some(delay)).await
    }

    async fn start_inner(statuses: Vec<u16>, delay: Option<Duration>) -> Self {
        let script = Arc::new(Script {
            statuses: Mutex::new(statuses.into()),
            delay,
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/hook", post(handle))
            .with_state(script.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind webhook listener");
        let addr = listener.local_addr().expect("listener addr");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            addr,
            script,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/hook", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.requests.lock().clone()
    }

    /// `log_id` carried by each received body, in arrival order.
    pub fn log_ids(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| {
                request.body["log_id"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }
}

impl Drop for ScriptedWebhook {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle(State(script): State<Arc<Script>>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    script.requests.lock().push(RecordedRequest { headers, body });

    if let Some(delay) = script.delay {
        tokio::time::sleep(delay).await;
    }
    let status = script.statuses.lock().pop_front().unwrap_or(204);
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// An address nothing listens on, for connection-refused tests.
pub async fn refused_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let addr = listener.local_addr().expect("listener addr");
    drop(listener);
    addr
}
