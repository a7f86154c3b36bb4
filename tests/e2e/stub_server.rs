//! Scripted axum server standing in for store endpoints.
//!
//! Each path is bound to a canned response. Every request is recorded so
//! tests can assert on what the verifiers actually sent.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Canned response for one path.
#[derive(Debug, Clone)]
pub struct StubResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response body, sent as `application/json`.
    pub body: String,
    /// Delay before the response is written.
    pub delay: Option<Duration>,
}

impl StubResponse {
    /// JSON response with the given status.
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("valid status code"),
            body: body.to_string(),
            delay: None,
        }
    }

    /// Hold the response back for `delay`.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl IntoResponse for StubResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

/// A request as received by the stub.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request method.
    pub method: Method,
    /// Request path without query.
    pub path: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: String,
}

impl RecordedRequest {
    /// Header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body should be JSON")
    }

    /// Value of a field in a form-encoded body, still percent-encoded.
    pub fn form_field(&self, name: &str) -> Option<String> {
        self.body.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }
}

#[derive(Default)]
struct StubState {
    routes: HashMap<String, StubResponse>,
    requests: Vec<RecordedRequest>,
}

type SharedState = Arc<Mutex<StubState>>;

/// Scripted HTTP server bound to a local ephemeral port.
pub struct StubServer {
    addr: SocketAddr,
    state: SharedState,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Bind and start serving.
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let state = SharedState::default();

        let app = Router::new()
            .fallback(scripted)
            .with_state(Arc::clone(&state));
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server");
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Bind `response` to `path`, replacing any earlier binding.
    pub fn respond(&self, path: &str, response: StubResponse) {
        self.state.lock().routes.insert(path.to_string(), response);
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Requests received for `path`.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Record the request and answer with whatever is bound to its path.
async fn scripted(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StubResponse {
    let path = uri.path().to_string();
    let response = {
        let mut state = state.lock();
        state.requests.push(RecordedRequest {
            method,
            path: path.clone(),
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        });
        state.routes.get(&path).cloned()
    }
    .unwrap_or_else(|| StubResponse::json(404, serde_json::json!({"error": "no route"})));

    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }
    response
}
